use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::auth::{LoginRequest, OwnerAuthResponse, OwnerRegisterRequest},
    error::AppResult,
    extract::ApiJson,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[utoipa::path(
    post,
    path = "/api/owners/register",
    request_body = OwnerRegisterRequest,
    responses(
        (status = 201, description = "Register shop owner and open their shop", body = ApiResponse<OwnerAuthResponse>),
        (status = 400, description = "Missing fields or mobile already registered"),
    ),
    tag = "Owners"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<OwnerRegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OwnerAuthResponse>>)> {
    let resp = auth_service::register_owner(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/owners/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login shop owner", body = ApiResponse<OwnerAuthResponse>),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "Account not found"),
    ),
    tag = "Owners"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<OwnerAuthResponse>>> {
    let resp = auth_service::login_owner(&state, payload).await?;
    Ok(Json(resp))
}
