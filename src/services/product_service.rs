use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner},
    models::{Product, ProductSummary},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, parse_id},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(owner_id) = query.owner_id.as_deref().filter(|s| !s.is_empty()) {
        let owner_id = parse_id(owner_id, "ownerId")?;
        condition = condition.add(Column::OwnerId.eq(owner_id));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_owner(user)?;

    let (Some(name), Some(description), Some(price), Some(stock)) = (
        payload.name.filter(|s| !s.trim().is_empty()),
        payload.description.filter(|s| !s.trim().is_empty()),
        payload.price,
        payload.stock,
    ) else {
        return Err(AppError::bad_request("Missing required fields"));
    };
    validate_amounts(Some(price), payload.mrp, Some(stock))?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(Some(user.subject_id)),
        name: Set(name),
        description: Set(description),
        price: Set(price),
        mrp: Set(payload.mrp),
        stock: Set(stock),
        sku: Set(payload.sku),
        category: Set(payload.category),
        is_active: Set(payload.is_active),
        is_featured: Set(payload.is_featured),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.subject_id),
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_owner(user)?;
    validate_amounts(payload.price, payload.mrp, payload.stock)?;

    let existing = find_owned(state, user, id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name.filter(|s| !s.trim().is_empty()) {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(mrp) = payload.mrp {
        active.mrp = Set(Some(mrp));
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(sku) = payload.sku {
        active.sku = Set(Some(sku));
    }
    if let Some(category) = payload.category {
        active.category = Set(Some(category));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_owner(user)?;
    let existing = find_owned(state, user, id).await?;

    Products::delete_by_id(existing.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.subject_id),
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Catalog lookup used when listing carts and orders. Missing products are simply absent.
pub async fn product_summaries<C>(
    conn: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, ProductSummary>>
where
    C: ConnectionTrait,
{
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let summaries = Products::find()
        .filter(Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| {
            (
                p.id,
                ProductSummary {
                    id: p.id,
                    name: p.name,
                    price: p.price,
                    mrp: p.mrp,
                    stock: p.stock,
                },
            )
        })
        .collect();

    Ok(summaries)
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ProductModel> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    if product.owner_id != Some(user.subject_id) {
        return Err(AppError::Forbidden);
    }
    Ok(product)
}

fn validate_amounts(price: Option<i64>, mrp: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p < 0) || mrp.is_some_and(|m| m < 0) {
        return Err(AppError::bad_request("price and mrp must not be negative"));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::bad_request("stock must not be negative"));
    }
    Ok(())
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        owner_id: model.owner_id,
        name: model.name,
        description: model.description,
        price: model.price,
        mrp: model.mrp,
        stock: model.stock,
        sku: model.sku,
        category: model.category,
        is_active: model.is_active,
        is_featured: model.is_featured,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
