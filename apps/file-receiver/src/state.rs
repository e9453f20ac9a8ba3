//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::persist::Persister;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    persister: Persister,
}

impl AppState {
    /// Create a new application state from a loaded configuration
    pub fn new(config: Config) -> Self {
        let persister = Persister::new(&config.storage);
        Self {
            inner: Arc::new(AppStateInner { persister }),
        }
    }

    /// Get the upload persister
    pub fn persister(&self) -> &Persister {
        &self.inner.persister
    }
}
