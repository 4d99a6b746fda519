//! bb-convert library interface
//!
//! Exposes the conversion pipeline and HTTP router for integration testing

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod matcher;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{HeaderValue, Method};
use axum::Router;
use bb_common::events::EventBus;
use chrono::{DateTime, Utc};
use services::{ConversionService, JobManager};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// In-memory job registry
    pub jobs: JobManager,
    /// Submission entry point (validation + background execution)
    pub conversions: ConversionService,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(jobs: JobManager, conversions: ConversionService, event_bus: EventBus) -> Self {
        Self {
            jobs,
            conversions,
            event_bus,
            startup_time: Utc::now(),
            cors_origins: Arc::new(Vec::new()),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::new(origins);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .merge(api::convert_routes())
        .merge(api::platform_routes())
        .route("/api/events", get(api::conversion_event_stream))
        .merge(api::health_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    layer.allow_origin(allowed)
}
