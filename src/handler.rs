use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::Response,
};
use std::collections::HashMap;
use tracing::{debug, error};

use crate::eligibility::resolve_content_type;
use crate::error::ServiceError;
use crate::query::parse_query;
use crate::response::{ImageResponse, error_response};
use crate::{AppState, FailurePolicy};

const FOLDER_ACCESS_MESSAGE: &str = "Not allowed to access folders";

/// True when the client's `Accept` header lists WebP.
pub fn supports_webp(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("image/webp"))
}

/// Storage key for a request path. Paths without a file extension look like
/// folder listings and are refused.
pub fn object_key(path: &str) -> Result<&str, ServiceError> {
    let key = path.strip_prefix('/').unwrap_or(path);

    let has_extension = std::path::Path::new(key)
        .extension()
        .is_some_and(|ext| !ext.is_empty());

    if key.is_empty() || !has_extension {
        return Err(ServiceError::Forbidden(FOLDER_ACCESS_MESSAGE.to_string()));
    }

    Ok(key)
}

/// Fetch the object behind `path` and, when it is a processable image, apply
/// the transformation described by `query`.
pub async fn process_image(
    state: &AppState,
    path: &str,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Result<ImageResponse, ServiceError> {
    let key = object_key(path)?;
    let mut spec = parse_query(query)?;

    if state.config.transform.force_webp {
        spec.webp = Some(supports_webp(headers));
    }

    let object = state.store.fetch(key).await?;
    let content_type = resolve_content_type(object.content_type.as_deref(), key);

    if !state
        .gate
        .can_process(&object.bytes, content_type.as_deref())
    {
        debug!("Passing {} through untouched ({:?})", key, content_type);
        return Ok(ImageResponse::original(object.bytes, content_type));
    }

    let engine = state.engine.clone();
    let bytes = object.bytes;
    let (result, bytes) = tokio::task::spawn_blocking(move || {
        let result = engine.transform(&bytes, &spec);
        (result, bytes)
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("Transform task failed: {}", e)))?;

    match result {
        Ok(output) => Ok(ImageResponse::transformed(
            output.bytes,
            output.info.format.mime_type(),
        )),
        Err(err) => {
            error!(
                path = %key,
                query = ?query,
                error = %err,
                "Image transformation failed"
            );
            match state.config.transform.on_failure {
                FailurePolicy::Passthrough => Ok(ImageResponse::original(bytes, content_type)),
                FailurePolicy::Error => Err(err.into()),
            }
        }
    }
}

pub async fn root_handler(State(state): State<AppState>) -> Response {
    let err = ServiceError::Forbidden(FOLDER_ACCESS_MESSAGE.to_string());
    error_response(&err, state.config.app.environment)
}

pub async fn image_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    match process_image(&state, &path, &query, &headers).await {
        Ok(image) => image.render(state.config.transform.cache_max_age_secs),
        Err(err) => {
            if err.status_code().is_server_error() {
                error!("Request for {} failed: {}", path, err);
            } else {
                debug!("Request for {} rejected: {}", path, err);
            }
            error_response(&err, state.config.app.environment)
        }
    }
}

pub async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("/image.jpg").unwrap(), "image.jpg");
        assert_eq!(object_key("path/to/image.png").unwrap(), "path/to/image.png");

        for path in ["/", "", "/folder/", "/path/to/folder", "/.hidden"] {
            assert!(
                matches!(object_key(path), Err(ServiceError::Forbidden(_))),
                "{}",
                path
            );
        }
    }

    #[test]
    fn test_supports_webp() {
        let mut headers = HeaderMap::new();
        assert!(!supports_webp(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("image/png,*/*"));
        assert!(!supports_webp(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("image/webp,image/apng,image/*,*/*;q=0.8"),
        );
        assert!(supports_webp(&headers));
    }
}
