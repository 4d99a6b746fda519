//! Supported platforms endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{models::Platform, AppState};

#[derive(Debug, Serialize)]
pub struct PlatformInfo {
    pub id: &'static str,
    pub name: &'static str,
    /// Server-side credentials are present
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct PlatformsResponse {
    pub platforms: Vec<PlatformInfo>,
}

/// GET /api/platforms
pub async fn list_platforms(State(state): State<AppState>) -> Json<PlatformsResponse> {
    let catalogs = state.conversions.catalogs();
    let platforms = Platform::ALL
        .into_iter()
        .map(|platform| PlatformInfo {
            id: platform.id(),
            name: platform.display_name(),
            configured: catalogs.is_configured(platform),
        })
        .collect();

    Json(PlatformsResponse { platforms })
}

pub fn platform_routes() -> Router<AppState> {
    Router::new().route("/api/platforms", get(list_platforms))
}
