use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Domain events written to `audit_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CustomerRegister,
    CustomerLogin,
    OwnerRegister,
    ProductCreate,
    ProductDelete,
    CartCreate,
    CartMerge,
    OrderCreate,
    OrderStatusUpdate,
    OrderDelivered,
    OrderCancelProduct,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::CustomerRegister => "customer_register",
            AuditAction::CustomerLogin => "customer_login",
            AuditAction::OwnerRegister => "owner_register",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::CartCreate => "cart_create",
            AuditAction::CartMerge => "cart_merge",
            AuditAction::OrderCreate => "order_create",
            AuditAction::OrderStatusUpdate => "order_status_update",
            AuditAction::OrderDelivered => "order_delivered",
            AuditAction::OrderCancelProduct => "order_cancel_product",
        }
    }

    /// Table the action touches.
    pub fn resource(self) -> &'static str {
        match self {
            AuditAction::CustomerRegister | AuditAction::CustomerLogin => "customers",
            AuditAction::OwnerRegister => "shop_owners",
            AuditAction::ProductCreate | AuditAction::ProductDelete => "products",
            AuditAction::CartCreate | AuditAction::CartMerge => "carts",
            AuditAction::OrderCreate
            | AuditAction::OrderStatusUpdate
            | AuditAction::OrderDelivered
            | AuditAction::OrderCancelProduct => "orders",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    actor_id: Option<Uuid>,
    action: AuditAction,
    metadata: Value,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Audit writes never fail the request; a failure is only logged.
pub async fn record(pool: &DbPool, actor_id: Option<Uuid>, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, actor_id, action, metadata).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
