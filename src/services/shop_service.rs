use chrono::Utc;
use sea_orm::{EntityTrait, QueryOrder};
use uuid::Uuid;

use crate::{
    dto::shops::ShopList,
    entity::shops::{Column, Entity as Shops, Model as ShopModel},
    error::{AppError, AppResult},
    models::Shop,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_shops(state: &AppState) -> AppResult<ApiResponse<ShopList>> {
    let items = Shops::find()
        .order_by_asc(Column::ShopName)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(shop_from_entity)
        .collect();

    Ok(ApiResponse::data(ShopList { items }))
}

pub async fn get_shop(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Shop>> {
    let shop = Shops::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Shop not found"))?;

    Ok(ApiResponse::success(
        "Shop",
        shop_from_entity(shop),
        Some(Meta::empty()),
    ))
}

pub(crate) fn shop_from_entity(model: ShopModel) -> Shop {
    Shop {
        id: model.id,
        owner_id: model.owner_id,
        shop_name: model.shop_name,
        owner_name: model.owner_name,
        location: model.location,
        contact: model.contact,
        email: model.email,
        business_type: model.business_type,
        address: model.address,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
