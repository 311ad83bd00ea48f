use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::cart::{AddToCartRequest, CartList},
    error::AppResult,
    extract::ApiJson,
    models::Cart,
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_to_cart))
        .route("/customer/{customer_id}", get(carts_by_customer))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "New cart created for the customer and shop", body = ApiResponse<Cart>),
        (status = 200, description = "Items merged into the existing cart", body = ApiResponse<Cart>),
        (status = 400, description = "Missing ids, items or invalid quantity"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AddToCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Cart>>)> {
    let outcome = cart_service::add_to_cart(&state, payload).await?;

    let (status, message) = if outcome.created {
        (StatusCode::CREATED, "Cart created")
    } else {
        (StatusCode::OK, "Items merged into cart")
    };
    Ok((
        status,
        Json(ApiResponse::success(message, outcome.cart, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/cart/customer/{customer_id}",
    params(
        ("customer_id" = String, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Carts of the customer with product details", body = ApiResponse<CartList>),
        (status = 400, description = "Invalid customerId"),
    ),
    tag = "Cart"
)]
pub async fn carts_by_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = cart_service::get_carts_by_customer(&state, &customer_id).await?;
    Ok(Json(resp))
}
