use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod commands;
pub mod eligibility;
pub mod error;
pub mod handler;
pub mod query;
pub mod response;
pub mod startup_checks;
pub mod storage;
pub mod transform;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub storage: storage::StorageConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Henkan".to_string(),
            log_level: "info".to_string(),
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Whether internal error details may be shown to clients.
    pub fn exposes_error_detail(&self) -> bool {
        !matches!(self, Environment::Production)
    }
}

/// What to send when an eligible image fails to transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Serve the original bytes
    #[default]
    Passthrough,
    /// Answer with a 500
    Error,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    pub default_quality: u8,
    pub default_background: String,
    /// Pick WebP output from the `Accept` header instead of the `webp` parameter
    pub force_webp: bool,
    pub cache_max_age_secs: u64,
    /// Largest width or height a request may scale to
    pub max_dimension: u32,
    pub on_failure: FailurePolicy,
    pub smart_crop_min_scale: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            default_quality: 82,
            default_background: "black".to_string(),
            force_webp: false,
            cache_max_age_secs: 365 * 24 * 60 * 60,
            max_dimension: 8192,
            on_failure: FailurePolicy::Passthrough,
            smart_crop_min_scale: 1.0,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: storage::DynBlobStore,
    pub engine: Arc<transform::TransformEngine>,
    pub gate: Arc<eligibility::EligibilityGate>,
}

pub async fn create_app(config: Config) -> Result<Router, storage::StorageError> {
    let store = storage::create_store(&config.storage).await?;
    tracing::info!("Using {} storage backend", store.name());
    Ok(create_app_with_store(config, store))
}

pub fn create_app_with_store(config: Config, store: storage::DynBlobStore) -> Router {
    let engine = Arc::new(transform::TransformEngine::with_default_analyzer(
        config.transform.clone(),
    ));

    let app_state = AppState {
        config: Arc::new(config),
        store,
        engine,
        gate: Arc::new(eligibility::EligibilityGate::new()),
    };

    Router::new()
        .route("/", axum::routing::get(handler::root_handler))
        .route("/health", axum::routing::get(handler::health_handler))
        .route("/{*path}", axum::routing::get(handler::image_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let method = request.method();
                    let uri = request.uri();
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");
                    let referer = headers
                        .get("referer")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %method,
                        path = %uri.path(),
                        query = ?uri.query(),
                        user_agent = %user_agent,
                        referer = %referer,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %status,
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
