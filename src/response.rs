use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::SystemTime;

use crate::Environment;
use crate::error::ServiceError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Bytes ready to be sent to the client, either the transformed variant or
/// the untouched original.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Set when the body depends on the request's `Accept` header
    pub vary_accept: bool,
}

impl ImageResponse {
    pub fn original(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            vary_accept: false,
        }
    }

    pub fn transformed(bytes: Vec<u8>, content_type: &str) -> Self {
        Self {
            bytes,
            content_type: content_type.to_string(),
            vary_accept: true,
        }
    }

    pub fn render(self, max_age_secs: u64) -> Response {
        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.content_type)
            .header(
                header::CACHE_CONTROL,
                format!("public, max-age={}", max_age_secs),
            )
            .header(
                header::LAST_MODIFIED,
                httpdate::fmt_http_date(SystemTime::now()),
            );

        if self.vary_accept {
            response = response.header(header::VARY, "Accept");
        }

        response
            .body(Body::from(self.bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Plain-text error body that is never cached.
pub fn error_response(err: &ServiceError, environment: Environment) -> Response {
    let message = err.public_message(environment.exposes_error_detail());

    (
        err.status_code(),
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (
                header::LAST_MODIFIED,
                httpdate::fmt_http_date(SystemTime::now()),
            ),
        ],
        message,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ValidationError;

    #[test]
    fn test_image_response_headers() {
        let response = ImageResponse::transformed(vec![1, 2, 3], "image/webp").render(60);
        let headers = response.headers();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/webp");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
        assert_eq!(headers[header::VARY], "Accept");
        assert!(headers.contains_key(header::LAST_MODIFIED));
    }

    #[test]
    fn test_original_response_has_no_vary() {
        let response = ImageResponse::original(vec![0], None).render(31536000);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            DEFAULT_CONTENT_TYPE
        );
        assert!(!response.headers().contains_key(header::VARY));
    }

    #[test]
    fn test_error_response_is_not_cached() {
        let err = ServiceError::from(ValidationError::new("w", "Not a number"));
        let response = error_response(&err, Environment::Production);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
    }
}
