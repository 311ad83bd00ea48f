use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::auth::{
        AvailabilityResponse, CustomerAuthResponse, CustomerList, CustomerRegisterRequest,
        LoginRequest, OwnerAuthResponse, OwnerRegisterRequest,
    },
    entity::{
        customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers, Model as CustomerModel},
        shop_owners::{ActiveModel as OwnerActive, Column as OwnerCol, Entity as ShopOwners, Model as OwnerModel},
        shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
    },
    error::{AppError, AppResult},
    middleware::auth::{ROLE_CUSTOMER, ROLE_OWNER, sign_token},
    models::{Customer, ShopOwner},
    response::{ApiResponse, Meta},
    services::shop_service::shop_from_entity,
    state::AppState,
};

const MIN_MOBILE_LEN: usize = 7;
const MIN_PASSWORD_LEN: usize = 6;

pub async fn register_customer(
    state: &AppState,
    payload: CustomerRegisterRequest,
) -> AppResult<ApiResponse<CustomerAuthResponse>> {
    let (Some(customer_name), Some(mobile), Some(password), Some(location)) = (
        non_blank(payload.customer_name),
        non_blank(payload.mobile),
        non_blank(payload.password),
        non_blank(payload.location),
    ) else {
        return Err(AppError::bad_request(
            "Name, mobile, password, and location are required",
        ));
    };
    validate_credentials(&mobile, &password)?;
    let email = non_blank(payload.email).map(|e| e.to_lowercase());

    let exist = Customers::find()
        .filter(CustomerCol::Mobile.eq(mobile.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Mobile number already registered".into()));
    }

    if let Some(email) = email.as_deref() {
        let exist = Customers::find()
            .filter(CustomerCol::Email.eq(email))
            .one(&state.orm)
            .await?;
        if exist.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }
    }

    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(customer_name),
        mobile: Set(mobile),
        email: Set(email),
        password_hash: Set(hash_password(&password)?),
        address: Set(location),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| unique_violation(err, "Mobile number or email already registered"))?;

    tracing::info!(customer_id = %customer.id, "customer registered");
    audit::record(
        &state.pool,
        Some(customer.id),
        AuditAction::CustomerRegister,
        serde_json::json!({ "customer_id": customer.id }),
    )
    .await;

    let token = sign_token(&state.config, customer.id, ROLE_CUSTOMER)?;
    Ok(ApiResponse::success(
        "Customer registered successfully",
        CustomerAuthResponse {
            token,
            customer: customer_from_entity(customer),
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_customer(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<CustomerAuthResponse>> {
    let (mobile, password) = login_fields(payload)?;

    let customer = Customers::find()
        .filter(CustomerCol::Mobile.eq(mobile.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found for this mobile number"))?;

    if !verify_password(&password, &customer.password_hash) {
        return Err(AppError::Unauthorized("Invalid password".into()));
    }

    let token = sign_token(&state.config, customer.id, ROLE_CUSTOMER)?;
    audit::record(
        &state.pool,
        Some(customer.id),
        AuditAction::CustomerLogin,
        serde_json::json!({ "customer_id": customer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Login successful",
        CustomerAuthResponse {
            token,
            customer: customer_from_entity(customer),
        },
        Some(Meta::empty()),
    ))
}

pub async fn check_mobile_exists(
    state: &AppState,
    mobile: &str,
) -> AppResult<ApiResponse<AvailabilityResponse>> {
    if mobile.len() < MIN_MOBILE_LEN {
        return Err(AppError::bad_request("Invalid mobile number"));
    }

    let exists = Customers::find()
        .filter(CustomerCol::Mobile.eq(mobile))
        .one(&state.orm)
        .await?
        .is_some();

    let message = if exists {
        format!("Mobile {mobile} is already registered")
    } else {
        format!("Mobile {mobile} is available")
    };
    Ok(ApiResponse::success(message, AvailabilityResponse { exists }, None))
}

pub async fn check_email_exists(
    state: &AppState,
    email: &str,
) -> AppResult<ApiResponse<AvailabilityResponse>> {
    if !email.contains('@') {
        return Err(AppError::bad_request("Invalid email"));
    }

    let exists = Customers::find()
        .filter(CustomerCol::Email.eq(email.to_lowercase()))
        .one(&state.orm)
        .await?
        .is_some();

    let message = if exists {
        format!("Email {email} is already registered")
    } else {
        format!("Email {email} is available")
    };
    Ok(ApiResponse::success(message, AvailabilityResponse { exists }, None))
}

pub async fn list_customers(state: &AppState) -> AppResult<ApiResponse<CustomerList>> {
    let items = Customers::find()
        .order_by_desc(CustomerCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(customer_from_entity)
        .collect();

    Ok(ApiResponse::data(CustomerList { items }))
}

/// Registers the owner and opens their shop in one transaction.
pub async fn register_owner(
    state: &AppState,
    payload: OwnerRegisterRequest,
) -> AppResult<ApiResponse<OwnerAuthResponse>> {
    let (
        Some(owner_name),
        Some(shop_name),
        Some(mobile),
        Some(password),
        Some(location),
        Some(contact),
    ) = (
        non_blank(payload.owner_name),
        non_blank(payload.shop_name),
        non_blank(payload.mobile),
        non_blank(payload.password),
        non_blank(payload.location),
        non_blank(payload.contact),
    )
    else {
        return Err(AppError::bad_request(
            "Owner name, shop name, mobile, password, location, and contact are required",
        ));
    };
    validate_credentials(&mobile, &password)?;
    let email = non_blank(payload.email).map(|e| e.to_lowercase());

    let exist = ShopOwners::find()
        .filter(OwnerCol::Mobile.eq(mobile.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Mobile number already registered".into()));
    }

    let txn = state.orm.begin().await?;

    let owner = OwnerActive {
        id: Set(Uuid::new_v4()),
        owner_name: Set(owner_name.clone()),
        shop_name: Set(shop_name.clone()),
        mobile: Set(mobile),
        email: Set(email.clone()),
        password_hash: Set(hash_password(&password)?),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| unique_violation(err, "Mobile number already registered"))?;

    let shop = ShopActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(Some(owner.id)),
        shop_name: Set(shop_name),
        owner_name: Set(owner_name),
        location: Set(location),
        contact: Set(contact),
        email: Set(email),
        business_type: Set(non_blank(payload.business_type)),
        address: Set(non_blank(payload.address)),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(owner_id = %owner.id, shop_id = %shop.id, "shop owner registered");
    audit::record(
        &state.pool,
        Some(owner.id),
        AuditAction::OwnerRegister,
        serde_json::json!({ "owner_id": owner.id, "shop_id": shop.id }),
    )
    .await;

    let token = sign_token(&state.config, owner.id, ROLE_OWNER)?;
    Ok(ApiResponse::success(
        "Shop owner registered successfully",
        OwnerAuthResponse {
            token,
            owner: owner_from_entity(owner),
            shop: Some(shop_from_entity(shop)),
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_owner(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<OwnerAuthResponse>> {
    let (mobile, password) = login_fields(payload)?;

    let owner = ShopOwners::find()
        .filter(OwnerCol::Mobile.eq(mobile.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found for this mobile number"))?;

    if !verify_password(&password, &owner.password_hash) {
        return Err(AppError::Unauthorized("Invalid password".into()));
    }

    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(owner.id))
        .order_by_asc(ShopCol::CreatedAt)
        .one(&state.orm)
        .await?
        .map(shop_from_entity);

    let token = sign_token(&state.config, owner.id, ROLE_OWNER)?;
    Ok(ApiResponse::success(
        "Login successful",
        OwnerAuthResponse {
            token,
            owner: owner_from_entity(owner),
            shop,
        },
        Some(Meta::empty()),
    ))
}

fn validate_credentials(mobile: &str, password: &str) -> AppResult<()> {
    if mobile.len() < MIN_MOBILE_LEN {
        return Err(AppError::bad_request("Invalid mobile number format"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "Password must be at least 6 characters",
        ));
    }
    Ok(())
}

fn login_fields(payload: LoginRequest) -> AppResult<(String, String)> {
    match (non_blank(payload.mobile), payload.password.filter(|p| !p.is_empty())) {
        (Some(mobile), Some(password)) => Ok((mobile, password)),
        _ => Err(AppError::bad_request("mobile and password are required")),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// A concurrent registration can slip past the lookup; the unique index still catches it.
fn unique_violation(err: DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(message.to_string()),
        _ => err.into(),
    }
}

fn customer_from_entity(model: CustomerModel) -> Customer {
    Customer {
        id: model.id,
        customer_name: model.customer_name,
        mobile: model.mobile,
        email: model.email,
        address: model.address,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn owner_from_entity(model: OwnerModel) -> ShopOwner {
    ShopOwner {
        id: model.id,
        owner_name: model.owner_name,
        shop_name: model.shop_name,
        mobile: model.mobile,
        email: model.email,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
