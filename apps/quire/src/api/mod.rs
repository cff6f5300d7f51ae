//! # Quire HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /stages` - Workflow stages in order
//! - `GET /dashboard` - Queue counters
//! - `GET /submissions` - Filtered, paged submission list
//! - `GET /submissions/{id}` - Submission detail
//! - `GET /submissions/{id}/workflow` - Workflow page for `?tab=&stage=`
//! - `POST /submissions/{id}/workflow` - Move stage / change status
//! - `POST /submissions/{id}/files/upload` - Multipart file upload
//! - `POST /submissions/{id}/files/copy` - Copy files into another stage
//! - `GET /submissions/{id}/files/{file_id}/download` - File content
//! - `GET|POST /submissions/{id}/queries` - Discussions
//! - `POST /submissions/{id}/queries/{query_id}/notes` - Reply
//! - `POST /submissions/{id}/queries/{query_id}/close` - Close
//! - `GET /journals/{id}/settings/{name}` - Localised setting
//! - `GET /journals/{id}/sections` - Journal sections
//! - `GET /journals/{id}/categories` - Journal categories
//! - `POST /export` - Snapshot of every row
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `QUIRE_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `QUIRE_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `QUIRE_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use handlers::{ApiError, error_status};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ActorRequest, CopyFilesRequest, CopyFilesResponse, CreateQueryRequest, ErrorResponse,
    ExportResponse, HealthResponse, ListParams, NoteRequest, SettingParams, SettingResponse,
    StageInfo, StagesResponse, UploadFields, UploadResponse, UserParams, ViewParams,
    WorkflowRequest, content_disposition,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use quire_core::{BlobStore, MemoryBlobStore, QuireError, Session, primitives::MAX_UPLOAD_BYTES};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart framing and text fields on top of the file itself.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Blob storage shared between requests.
pub type SharedBlobs = Arc<RwLock<Box<dyn BlobStore + Send + Sync>>>;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// Handlers that need both take the session lock before the blob lock.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub blobs: SharedBlobs,
}

impl AppState {
    /// State with in-memory blob storage.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self::with_blobs(session, MemoryBlobStore::new())
    }

    #[must_use]
    pub fn with_blobs(session: Session, blobs: impl BlobStore + Send + Sync + 'static) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            blobs: Arc::new(RwLock::new(Box::new(blobs))),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `QUIRE_CORS_ORIGINS`.
///
/// - `*`: allow every origin (development only)
/// - unset: localhost only
/// - otherwise: comma-separated list of origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("QUIRE_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (QUIRE_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in QUIRE_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No QUIRE_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit (upload size plus multipart slack)
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set QUIRE_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/stages", get(handlers::stages_handler))
        .route("/dashboard", get(handlers::dashboard_handler))
        .route("/submissions", get(handlers::list_handler))
        .route("/submissions/{id}", get(handlers::detail_handler))
        .route(
            "/submissions/{id}/workflow",
            get(handlers::workflow_view_handler).post(handlers::workflow_handler),
        )
        .route(
            "/submissions/{id}/files/upload",
            post(handlers::upload_handler),
        )
        .route(
            "/submissions/{id}/files/copy",
            post(handlers::copy_files_handler),
        )
        .route(
            "/submissions/{id}/files/{file_id}/download",
            get(handlers::download_handler),
        )
        .route(
            "/submissions/{id}/queries",
            get(handlers::queries_handler).post(handlers::create_query_handler),
        )
        .route(
            "/submissions/{id}/queries/{query_id}/notes",
            post(handlers::add_note_handler),
        )
        .route(
            "/submissions/{id}/queries/{query_id}/close",
            post(handlers::close_query_handler),
        )
        .route(
            "/journals/{id}/settings/{name}",
            get(handlers::setting_handler),
        )
        .route("/journals/{id}/sections", get(handlers::sections_handler))
        .route(
            "/journals/{id}/categories",
            get(handlers::categories_handler),
        )
        .route("/export", post(handlers::export_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + BODY_LIMIT_SLACK)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Resolves on Ctrl-C (and SIGTERM on unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Serve `state` on `addr` until a shutdown signal arrives.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), QuireError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| QuireError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Quire HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| QuireError::IoError(format!("Server error: {}", e)))
}
