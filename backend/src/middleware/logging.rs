use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
    Error as AxumError,
};
use std::time::Instant;

use super::request_id::RequestId;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;
const MAX_LOGGED_BODY_BYTES: usize = 2048;

/// Records diagnostics whenever a handler answers with a 4xx or 5xx status.
/// The body is buffered so the same payload still reaches the caller. Error
/// bodies never carry credentials, so logging them is safe.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let event = ErrorEvent {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        request_id: req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default(),
        start: Instant::now(),
    };

    let response = next.run(req).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    match buffer_body(body).await {
        Ok((bytes, preview)) => {
            event.emit(status.as_u16(), &preview, None);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            parts.headers.remove(CONTENT_LENGTH);
            event.emit(status.as_u16(), "", Some(err));
            Response::from_parts(parts, Body::empty())
        }
    }
}

struct ErrorEvent {
    method: String,
    path: String,
    request_id: String,
    start: Instant,
}

impl ErrorEvent {
    fn emit(&self, status: u16, body_preview: &str, body_error: Option<AxumError>) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        let method = self.method.as_str();
        let path = self.path.as_str();
        let request_id = self.request_id.as_str();

        match (status >= 500, body_error) {
            (true, Some(err)) => tracing::error!(
                status, method, path, request_id, latency_ms, error = ?err,
                "Failed to read error response body"
            ),
            (false, Some(err)) => tracing::warn!(
                status, method, path, request_id, latency_ms, error = ?err,
                "Failed to read error response body"
            ),
            (true, None) => tracing::error!(
                status, method, path, request_id, latency_ms, body = body_preview,
                "Request completed with error status"
            ),
            (false, None) => tracing::warn!(
                status, method, path, request_id, latency_ms, body = body_preview,
                "Request completed with error status"
            ),
        }
    }
}

async fn buffer_body(body: Body) -> Result<(Bytes, String), AxumError> {
    let bytes = to_bytes(body, MAX_BUFFERED_BODY_BYTES).await?;
    Ok((bytes.clone(), preview(&bytes)))
}

fn preview(bytes: &[u8]) -> String {
    if bytes.len() > MAX_LOGGED_BODY_BYTES {
        format!(
            "{}... (truncated, {} bytes total)",
            String::from_utf8_lossy(&bytes[..MAX_LOGGED_BODY_BYTES]),
            bytes.len()
        )
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}
