mod common;

use cartlink_api::{
    dto::{
        auth::{CustomerRegisterRequest, LoginRequest, OwnerRegisterRequest},
        products::{CreateProductRequest, UpdateProductRequest},
    },
    entity::customers::{Column as CustomerCol, Entity as Customers},
    error::AppError,
    middleware::auth::{AuthUser, ROLE_CUSTOMER, ROLE_OWNER, verify_token},
    services::{auth_service, product_service, shop_service},
};
use axum::http::StatusCode;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{database_url, setup_state, unique_mobile};

fn customer(mobile: &str) -> CustomerRegisterRequest {
    CustomerRegisterRequest {
        customer_name: Some("Asha".into()),
        mobile: Some(mobile.to_string()),
        email: None,
        password: Some("secret1".into()),
        location: Some("Lake View".into()),
    }
}

#[tokio::test]
async fn duplicate_mobile_is_rejected_once_registered() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;
    let mobile = unique_mobile();

    let registered = auth_service::register_customer(&state, customer(&mobile))
        .await?
        .data
        .expect("auth data");
    let principal = verify_token(&state.config, &registered.token)?;
    assert_eq!(principal.subject_id, registered.customer.id);
    assert_eq!(principal.role, ROLE_CUSTOMER);

    let err = auth_service::register_customer(&state, customer(&mobile))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "Mobile number already registered");

    let count = Customers::find()
        .filter(CustomerCol::Mobile.eq(mobile.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(count, 1);

    let availability = auth_service::check_mobile_exists(&state, &mobile).await?;
    assert!(availability.data.expect("availability").exists);

    Ok(())
}

#[tokio::test]
async fn customer_login_distinguishes_unknown_and_wrong_password() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;
    let mobile = unique_mobile();
    auth_service::register_customer(&state, customer(&mobile)).await?;

    let err = auth_service::login_customer(
        &state,
        LoginRequest {
            mobile: Some(mobile.clone()),
            password: Some("wrong-pass".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = auth_service::login_customer(
        &state,
        LoginRequest {
            mobile: Some(unique_mobile()),
            password: Some("secret1".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let ok = auth_service::login_customer(
        &state,
        LoginRequest {
            mobile: Some(mobile),
            password: Some("secret1".into()),
        },
    )
    .await?;
    assert_eq!(ok.message.as_deref(), Some("Login successful"));

    Ok(())
}

#[tokio::test]
async fn owner_registration_opens_shop_and_guards_products() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;

    let registered = auth_service::register_owner(
        &state,
        OwnerRegisterRequest {
            owner_name: Some("Ravi".into()),
            shop_name: Some("Ravi Stores".into()),
            mobile: Some(unique_mobile()),
            password: Some("secret1".into()),
            location: Some("Station Road".into()),
            contact: Some("0801234567".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("owner data");

    let shop = registered.shop.expect("shop opened with owner");
    assert_eq!(shop.owner_id, Some(registered.owner.id));
    let fetched = shop_service::get_shop(&state, shop.id).await?;
    assert_eq!(fetched.data.expect("shop").shop_name, "Ravi Stores");

    let owner = AuthUser {
        subject_id: registered.owner.id,
        role: ROLE_OWNER.into(),
    };
    let product = product_service::create_product(
        &state,
        &owner,
        CreateProductRequest {
            name: Some("Filter Coffee 500g".into()),
            description: Some("Medium roast".into()),
            price: Some(32000),
            stock: Some(12),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(product.owner_id, Some(registered.owner.id));

    let shopper = AuthUser {
        subject_id: Uuid::new_v4(),
        role: ROLE_CUSTOMER.into(),
    };
    let err = product_service::create_product(&state, &shopper, CreateProductRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let other_owner = AuthUser {
        subject_id: Uuid::new_v4(),
        role: ROLE_OWNER.into(),
    };
    let err = product_service::update_product(
        &state,
        &other_owner,
        product.id,
        UpdateProductRequest {
            price: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    product_service::delete_product(&state, &owner, product.id).await?;
    let err = product_service::get_product(&state, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}
