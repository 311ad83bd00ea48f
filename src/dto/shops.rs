use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Shop;

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ShopList {
    #[schema(value_type = Vec<Shop>)]
    pub items: Vec<Shop>,
}
