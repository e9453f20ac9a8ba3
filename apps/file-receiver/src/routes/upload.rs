//! Upload Routes
//!
//! Endpoints:
//! - POST /post - multipart/form-data, one part per file, buffered per part
//! - PUT /:filename - raw body of a single file, streamed and counted
//! - PUT /health - same as above for a file named `health`

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{post, put},
    Router,
};

use crate::error::Result;
use crate::persist::ReceivedPart;
use crate::state::AppState;
use crate::stream::{consume, ByteCounter};

/// Acknowledgement body for every successful upload
pub const ACK: &str = "OK";

/// Response header carrying the number of bytes a PUT delivered
pub const RECEIVED_BYTES_HEADER: &str = "x-received-bytes";

/// File name of a raw upload sent to the health route
const HEALTH_FILE_NAME: &str = "health";

/// Content type assumed for parts that do not declare one
const DEFAULT_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// Create the upload router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post", post(receive_multipart))
        .route("/:filename", put(receive_raw))
}

// ============================================================================
// POST
// ============================================================================

/// Fully parsed multipart body: field name to the files sent under it.
///
/// Fields keep the order in which they first appeared.
#[derive(Debug, Default)]
pub struct ReceivedForm {
    fields: Vec<(String, Vec<ReceivedPart>)>,
}

impl ReceivedForm {
    pub fn push(&mut self, part: ReceivedPart) {
        match self.fields.iter_mut().find(|(name, _)| *name == part.field_name) {
            Some((_, parts)) => parts.push(part),
            None => self.fields.push((part.field_name.clone(), vec![part])),
        }
    }

    pub fn get(&self, field_name: &str) -> Option<&[ReceivedPart]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field_name)
            .map(|(_, parts)| parts.as_slice())
    }

    pub fn parts(&self) -> impl Iterator<Item = &ReceivedPart> {
        self.fields.iter().flat_map(|(_, parts)| parts.iter())
    }

    pub fn len(&self) -> usize {
        self.fields.iter().map(|(_, parts)| parts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read every file part of a multipart body into memory.
///
/// Fields without a filename are plain form values and are skipped.
pub async fn read_form(multipart: &mut Multipart) -> Result<ReceivedForm> {
    let mut form = ReceivedForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        let Some(file_name) = field.file_name().map(str::to_string) else {
            tracing::debug!(field = %field_name, "Skipping non-file multipart field");
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_PART_CONTENT_TYPE)
            .to_string();
        let body = field.bytes().await?;

        form.push(ReceivedPart {
            field_name,
            file_name,
            content_type,
            body,
        });
    }

    Ok(form)
}

/// POST /post
///
/// Persist every uploaded part. The first failing part aborts the request;
/// parts already written stay on disk.
async fn receive_multipart(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<&'static str> {
    let form = read_form(&mut multipart).await?;

    for part in form.parts() {
        tracing::info!(
            file_name = %part.file_name,
            content_type = %part.content_type,
            bytes = part.body.len(),
            "POST part received"
        );
        state.persister().persist(part).await?;
    }

    tracing::debug!(parts = form.len(), "Multipart upload handled");
    Ok(ACK)
}

// ============================================================================
// PUT
// ============================================================================

/// PUT /:filename
///
/// The body is counted chunk by chunk as it arrives and never buffered.
async fn receive_raw(
    Path(filename): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse> {
    count_raw(filename, headers, body).await
}

/// PUT /health
///
/// The health route has no path parameter, so the name is fixed here.
pub(crate) async fn receive_raw_health(
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse> {
    count_raw(HEALTH_FILE_NAME.to_string(), headers, body).await
}

async fn count_raw(filename: String, headers: HeaderMap, body: Body) -> Result<impl IntoResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let total = consume(body.into_data_stream(), ByteCounter::default()).await?;

    tracing::info!(
        file_name = %filename,
        content_type = %content_type,
        bytes = total,
        "PUT received"
    );

    Ok(([(RECEIVED_BYTES_HEADER, total.to_string())], ACK))
}
