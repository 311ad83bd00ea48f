use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::{
    dto::orders::{CancelProductRequest, CreateOrderRequest, OrderList, UpdateOrderStatusRequest, VerifyOtpRequest},
    error::AppResult,
    extract::ApiJson,
    models::{Order, OrderDetails},
    response::ApiResponse,
    routes::params::parse_id,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/customer/{customer_id}", get(orders_by_customer))
        .route("/shop/{shop_id}", get(orders_by_shop))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/status", patch(update_order_status))
        .route("/{order_id}/verify-otp", post(verify_otp))
        .route("/{order_id}/cancel-product", post(cancel_product))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created, matching carts purged", body = ApiResponse<Order>),
        (status = 400, description = "Missing ids or invalid product lines"),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let resp = order_service::create_order(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders/customer/{customer_id}",
    params(
        ("customer_id" = String, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Orders placed by the customer, newest first", body = ApiResponse<OrderList>),
        (status = 400, description = "Invalid customerId"),
    ),
    tag = "Orders"
)]
pub async fn orders_by_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let customer_id = parse_id(&customer_id, "customerId")?;
    let resp = order_service::get_orders_by_customer(&state, customer_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/shop/{shop_id}",
    params(
        ("shop_id" = String, Path, description = "Shop ID")
    ),
    responses(
        (status = 200, description = "Orders received by the shop, newest first", body = ApiResponse<OrderList>),
        (status = 400, description = "Invalid shopId"),
    ),
    tag = "Orders"
)]
pub async fn orders_by_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let shop_id = parse_id(&shop_id, "shopId")?;
    let resp = order_service::get_orders_by_shop(&state, shop_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(
        ("order_id" = String, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with customer, shop and products", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let order_id = parse_id(&order_id, "orderId")?;
    let resp = order_service::get_order_by_id(&state, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{order_id}/status",
    params(
        ("order_id" = String, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status or illegal transition"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = parse_id(&order_id, "orderId")?;
    let resp = order_service::update_status(&state, order_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/verify-otp",
    params(
        ("order_id" = String, Path, description = "Order ID")
    ),
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP matched, order delivered", body = ApiResponse<Order>),
        (status = 400, description = "Missing or invalid OTP"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = parse_id(&order_id, "orderId")?;
    let resp = order_service::verify_otp_and_deliver(&state, order_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/cancel-product",
    params(
        ("order_id" = String, Path, description = "Order ID")
    ),
    request_body = CancelProductRequest,
    responses(
        (status = 200, description = "Line reduced or removed, total recomputed", body = ApiResponse<Order>),
        (status = 400, description = "Order already closed or quantity out of range"),
        (status = 404, description = "Order or line not found"),
    ),
    tag = "Orders"
)]
pub async fn cancel_product(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    ApiJson(payload): ApiJson<CancelProductRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = parse_id(&order_id, "orderId")?;
    let resp = order_service::cancel_product(&state, order_id, payload).await?;
    Ok(Json(resp))
}
