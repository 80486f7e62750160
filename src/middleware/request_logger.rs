use axum::{
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logs each request and its outcome, tagging both with a request id that is echoed
/// back in the `x-request-id` response header. A caller supplied id is kept.
pub async fn request_logger_middleware<B>(mut req: Request<B>, next: Next<B>) -> Response {
    let request_id = match req.headers().get(REQUEST_ID_HEADER) {
        Some(value) => value.clone(),
        None => {
            let generated = HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
            req.headers_mut()
                .insert(REQUEST_ID_HEADER, generated.clone());
            generated
        }
    };
    let request_id_str = request_id.to_str().unwrap_or("invalid").to_string();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    tracing::info!(
        request_id = %request_id_str,
        method = %method,
        uri = %uri,
        "Incoming request"
    );

    let mut response = next.run(req).await;

    let latency = start.elapsed();
    let status = response.status();
    if status.is_server_error() {
        tracing::warn!(
            request_id = %request_id_str,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Outgoing response"
        );
    } else {
        tracing::info!(
            request_id = %request_id_str,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Outgoing response"
        );
    }

    response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
    response
}
