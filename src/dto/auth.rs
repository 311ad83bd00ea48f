use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Customer, Shop, ShopOwner};

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRegisterRequest {
    pub customer_name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub location: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRegisterRequest {
    pub owner_name: Option<String>,
    pub shop_name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub business_type: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct LoginRequest {
    pub mobile: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerAuthResponse {
    pub token: String,
    pub customer: Customer,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnerAuthResponse {
    pub token: String,
    pub owner: ShopOwner,
    pub shop: Option<Shop>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub exists: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CustomerList {
    #[schema(value_type = Vec<Customer>)]
    pub items: Vec<Customer>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
