use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::error::InternalErrorDetail;

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Development-only: copies the debug rendering of an internal failure into
/// `details.debug` of the JSON error body. Never installed in production.
pub async fn expose_internal_errors(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let Some(InternalErrorDetail(detail)) =
        response.extensions().get::<InternalErrorDetail>().cloned()
    else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = ?err, "Failed to buffer internal error body");
            parts.headers.remove(CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let Ok(mut json) = serde_json::from_slice::<Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    if let Value::Object(map) = &mut json {
        map.insert("details".into(), serde_json::json!({ "debug": detail }));
    }

    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(json.to_string()))
}
