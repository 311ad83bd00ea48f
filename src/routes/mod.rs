use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{response::ApiResponse, state::AppState};

pub mod cart;
pub mod customers;
pub mod doc;
pub mod health;
pub mod orders;
pub mod owners;
pub mod params;
pub mod products;
pub mod shops;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/customers", customers::router())
        .nest("/owners", owners::router())
        .nest("/products", products::router())
        .nest("/shops", shops::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
}

/// Health, `/api`, docs and the JSON 404 fallback, before the server-wide layers.
pub fn create_app_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<()>>) {
    tracing::debug!(path = %uri.path(), "no route");
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure(format!("Route {} not found", uri.path()))),
    )
}
