use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::shops::ShopList,
    error::AppResult,
    models::Shop,
    response::ApiResponse,
    routes::params::parse_id,
    services::shop_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shops))
        .route("/{id}", get(get_shop))
}

#[utoipa::path(
    get,
    path = "/api/shops",
    responses(
        (status = 200, description = "All shops", body = ApiResponse<ShopList>)
    ),
    tag = "Shops"
)]
pub async fn list_shops(State(state): State<AppState>) -> AppResult<Json<ApiResponse<ShopList>>> {
    let resp = shop_service::list_shops(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/{id}",
    params(
        ("id" = String, Path, description = "Shop ID")
    ),
    responses(
        (status = 200, description = "Get shop", body = ApiResponse<Shop>),
        (status = 404, description = "Shop not found"),
    ),
    tag = "Shops"
)]
pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let id = parse_id(&id, "shopId")?;
    let resp = shop_service::get_shop(&state, id).await?;
    Ok(Json(resp))
}
