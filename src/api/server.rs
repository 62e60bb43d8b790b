//! HTTP service: `GET /health` and `POST /scan`

use crate::api::request::{ScanRequest, ScanTarget};
use crate::api::response::{ErrorResponse, HealthResponse, ScanResponse};
use crate::api::run_batch;
use crate::crawler::{BatchCoalescer, Scanner};
use crate::output::DomainOutcome;
use crate::ConfigError;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<Scanner>,
    pub coalescer: BatchCoalescer<Scanner>,
}

impl AppState {
    /// Wires a coalescer in front of `scanner` using its batch settings
    pub fn new(scanner: Arc<Scanner>) -> Self {
        let coalescer = BatchCoalescer::new(Arc::clone(&scanner), &scanner.config().batch);
        Self { scanner, coalescer }
    }
}

/// A request rejected before any scanning
pub struct ApiError(ConfigError);

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!("Rejected scan request: {}", self.0);
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: "configuration_error",
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/scan", post(scan_handler))
        .layer(Extension(state))
}

/// Serves the API on an already bound listener until the process stops
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on {}", addr);
    }
    axum::serve(listener, build_router(state)).await
}

/// Read-only snapshot of profile, caches and permits
async fn health_handler(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        scanner: state.scanner.status(),
        coalescer: state.coalescer.stats(),
    })
}

/// Single domains go through the coalescer; lists run as an explicit batch.
/// Per-domain failures are part of a 200 response.
async fn scan_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let plan = request.validate(state.scanner.config().batch.max_batch_domains)?;

    let response = match plan.target {
        ScanTarget::Single(domain) => {
            let result = state.coalescer.submit(domain.clone(), plan.options).await;
            ScanResponse::Single {
                domain,
                resource_profile: *state.scanner.profile(),
                outcome: DomainOutcome::from(result),
            }
        }
        ScanTarget::Batch(domains) => {
            tracing::info!("Explicit batch of {} domains", domains.len());
            let report = run_batch(&state.scanner, &domains, &plan.options).await;
            ScanResponse::Batch(report)
        }
    };

    Ok(Json(response))
}
