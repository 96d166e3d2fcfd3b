use axum::{
    body::{Body, Bytes},
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::collections::BTreeMap;
use std::time::Instant;

/// Largest error body kept in a breadcrumb
const BODY_PREVIEW_LIMIT: usize = 2 * 1024;

/// Access log plus Sentry breadcrumbs. Bodies are only captured for error
/// responses; generated videos (inline base64) never reach a breadcrumb.
pub async fn http_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let res = next.run(req).await;

    let status = res.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_client_error() || status.is_server_error() {
        let (res, body) = buffer_response_body(res).await;
        let preview = body.as_ref().map(body_preview);

        log::warn!(
            "{} {} -> {} ({}ms) {}",
            method,
            path,
            status.as_u16(),
            duration_ms,
            preview.as_deref().unwrap_or("")
        );
        add_breadcrumb(
            method.as_str(),
            &path,
            status.as_u16(),
            duration_ms,
            preview.as_deref(),
        );
        res
    } else {
        log::info!(
            "{} {} -> {} ({}ms)",
            method,
            path,
            status.as_u16(),
            duration_ms
        );
        add_breadcrumb(method.as_str(), &path, status.as_u16(), duration_ms, None);
        res
    }
}

async fn buffer_response_body(res: Response) -> (Response, Option<Bytes>) {
    let (parts, body) = res.into_parts();

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let kept = (!bytes.is_empty()).then(|| bytes.clone());
            (Response::from_parts(parts, Body::from(bytes)), kept)
        }
        Err(e) => {
            log::warn!("Failed to buffer response body: {}", e);
            (Response::from_parts(parts, Body::empty()), None)
        }
    }
}

fn body_preview(bytes: &Bytes) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) if text.len() > BODY_PREVIEW_LIMIT => {
            let cut: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();
            format!("{cut}... [{} bytes]", bytes.len())
        }
        Ok(text) => text.to_string(),
        Err(_) => format!("[Binary data, {} bytes]", bytes.len()),
    }
}

fn add_breadcrumb(
    method: &str,
    path: &str,
    status: u16,
    duration_ms: u64,
    body_preview: Option<&str>,
) {
    let mut data = BTreeMap::new();
    data.insert("method".to_string(), serde_json::json!(method));
    data.insert("url".to_string(), serde_json::json!(path));
    data.insert("status_code".to_string(), serde_json::json!(status));
    data.insert("duration_ms".to_string(), serde_json::json!(duration_ms));
    if let Some(body) = body_preview {
        data.insert("body".to_string(), serde_json::json!(body));
    }

    let level = if status >= 500 {
        sentry::Level::Error
    } else if status >= 400 {
        sentry::Level::Warning
    } else {
        sentry::Level::Info
    };

    sentry::add_breadcrumb(sentry::Breadcrumb {
        ty: "http".to_string(),
        category: Some("http.request".to_string()),
        message: Some(format!("{method} {path} {status} ({duration_ms}ms)")),
        data: data.into_iter().collect(),
        level,
        ..Default::default()
    });
}
