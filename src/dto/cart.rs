use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CartWithProducts;

/// Either a single `productId`/`quantity` pair or an `items` list.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub customer_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    #[serde(default)]
    #[schema(value_type = Option<i32>)]
    pub quantity: Option<Value>,
    pub items: Option<Vec<AddToCartItem>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartItem {
    pub product_id: Option<Uuid>,
    #[serde(default)]
    #[schema(value_type = Option<i32>)]
    pub quantity: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CartList {
    #[schema(value_type = Vec<CartWithProducts>)]
    pub items: Vec<CartWithProducts>,
}
