//! File Receiver
//!
//! Accepts uploads over plain HTTP:
//!
//! - `POST /post` with a `multipart/form-data` body, one part per file. Each
//!   part is classified by its declared content type and persisted.
//! - `PUT /<filename>` with the raw bytes of one file. The body is streamed
//!   and counted, never buffered.
//!
//! # Modules
//!
//! - `persist`: content classification and filesystem persistence
//! - `routes`: HTTP handlers
//! - `stream`: incremental body consumption

pub mod config;
pub mod error;
pub mod persist;
pub mod routes;
pub mod server;
pub mod state;
pub mod stream;

pub use config::Config;
pub use state::AppState;
