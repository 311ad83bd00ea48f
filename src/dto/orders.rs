use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::OrderDetails;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub products: Option<Vec<OrderProductInput>>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductInput {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i64>,
    /// Unit price in whole minor currency units, e.g. 999 for 9.99
    #[schema(example = 999)]
    pub price: Option<i64>,
    /// List price in whole minor currency units, defaults to price
    pub mrp: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_status: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub otp: Option<String>,
}

/// Cancels `quantity` units of one order line; without a quantity the whole line goes.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelProductRequest {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<OrderDetails>)]
    pub items: Vec<OrderDetails>,
}
