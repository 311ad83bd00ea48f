use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::auth::{AvailabilityResponse, CustomerAuthResponse, CustomerList, CustomerRegisterRequest, LoginRequest},
    error::AppResult,
    extract::ApiJson,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/check-mobile/{mobile}", get(check_mobile))
        .route("/check-email/{email}", get(check_email))
}

#[utoipa::path(
    post,
    path = "/api/customers/register",
    request_body = CustomerRegisterRequest,
    responses(
        (status = 201, description = "Register customer", body = ApiResponse<CustomerAuthResponse>),
        (status = 400, description = "Missing fields or mobile/email already registered"),
    ),
    tag = "Customers"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CustomerRegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CustomerAuthResponse>>)> {
    let resp = auth_service::register_customer(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/customers/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login customer", body = ApiResponse<CustomerAuthResponse>),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "Account not found"),
    ),
    tag = "Customers"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<CustomerAuthResponse>>> {
    let resp = auth_service::login_customer(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/customers/check-mobile/{mobile}",
    params(
        ("mobile" = String, Path, description = "Mobile number")
    ),
    responses(
        (status = 200, description = "Whether the mobile is registered", body = ApiResponse<AvailabilityResponse>),
        (status = 400, description = "Invalid mobile number"),
    ),
    tag = "Customers"
)]
pub async fn check_mobile(
    State(state): State<AppState>,
    Path(mobile): Path<String>,
) -> AppResult<Json<ApiResponse<AvailabilityResponse>>> {
    let resp = auth_service::check_mobile_exists(&state, &mobile).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/customers/check-email/{email}",
    params(
        ("email" = String, Path, description = "Email address")
    ),
    responses(
        (status = 200, description = "Whether the email is registered", body = ApiResponse<AvailabilityResponse>),
        (status = 400, description = "Invalid email"),
    ),
    tag = "Customers"
)]
pub async fn check_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<ApiResponse<AvailabilityResponse>>> {
    let resp = auth_service::check_email_exists(&state, &email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    responses(
        (status = 200, description = "All customers, newest first", body = ApiResponse<CustomerList>)
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = auth_service::list_customers(&state).await?;
    Ok(Json(resp))
}
