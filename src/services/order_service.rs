use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{
        CancelProductRequest, CreateOrderRequest, OrderList, OrderProductInput,
        UpdateOrderStatusRequest, VerifyOtpRequest,
    },
    entity::{
        customers::{Column as CustomerCol, Entity as Customers},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        shops::{Column as ShopCol, Entity as Shops},
    },
    error::{AppError, AppResult},
    models::{
        CustomerSummary, Order, OrderDetails, OrderLine, OrderLineView, OrderStatus, ShopSummary,
    },
    response::{ApiResponse, Meta},
    services::{cart_service, product_service::product_summaries},
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let customer_id = payload
        .customer_id
        .ok_or_else(|| AppError::bad_request("Customer ID is required"))?;
    let shop_id = payload
        .shop_id
        .ok_or_else(|| AppError::bad_request("Shop ID is required"))?;
    let products = payload
        .products
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::bad_request("At least one product is required"))?;

    let lines = build_order_lines(&products)?;
    let total_amount = order_total(&lines)?;
    let delivery_otp = generate_delivery_otp();

    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        shop_id: Set(shop_id),
        total_amount: Set(total_amount),
        order_status: Set(OrderStatus::Pending.as_str().to_string()),
        delivery_otp: Set(delivery_otp),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (line_no, line) in lines.iter().enumerate() {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            line_no: Set(line_no as i32),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            mrp: Set(line.mrp),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        customer_id = %customer_id,
        shop_id = %shop_id,
        total_amount,
        "order created"
    );

    // The order is already durable; a cart left behind here is picked up by the sweeper.
    match cart_service::purge_carts(&state.pool, customer_id, shop_id).await {
        Ok(purged) => tracing::debug!(order_id = %order.id, purged, "cart purged after order"),
        Err(err) => tracing::warn!(
            order_id = %order.id,
            error = %err,
            "cart purge after order failed"
        ),
    }

    audit::record(
        &state.pool,
        Some(customer_id),
        AuditAction::OrderCreate,
        serde_json::json!({ "order_id": order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created successfully",
        order_from_entity(order, lines)?,
        Some(Meta::empty()),
    ))
}

pub async fn get_orders_by_customer(
    state: &AppState,
    customer_id: Uuid,
) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::CustomerId.eq(customer_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = load_details(&state.orm, orders).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_orders_by_shop(
    state: &AppState,
    shop_id: Uuid,
) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::ShopId.eq(shop_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = load_details(&state.orm, orders).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_order_by_id(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderDetails>> {
    let order = find_order(&state.orm, order_id).await?;

    let details = load_details(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    Ok(ApiResponse::success("Order", details, Some(Meta::empty())))
}

pub async fn update_status(
    state: &AppState,
    order_id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let next: OrderStatus = payload.order_status.as_deref().unwrap_or_default().parse()?;

    // The row lock keeps the transition check and the write on the same status.
    let txn = state.orm.begin().await?;
    let existing = find_order_for_update(&txn, order_id).await?;
    let current = status_of(&existing)?;
    ensure_transition(current, next, state.config.strict_status_transitions)?;

    let mut active: OrderActive = existing.into();
    active.order_status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "order status updated");
    audit::record(
        &state.pool,
        None,
        AuditAction::OrderStatusUpdate,
        serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
    )
    .await;

    let lines = load_lines(&state.orm, order.id).await?;
    Ok(ApiResponse::success(
        "Order status updated",
        order_from_entity(order, lines)?,
        Some(Meta::empty()),
    ))
}

pub async fn verify_otp_and_deliver(
    state: &AppState,
    order_id: Uuid,
    payload: VerifyOtpRequest,
) -> AppResult<ApiResponse<Order>> {
    let otp = payload
        .otp
        .filter(|otp| !otp.is_empty())
        .ok_or_else(|| AppError::bad_request("OTP is required"))?;

    let txn = state.orm.begin().await?;
    let existing = find_order_for_update(&txn, order_id).await?;
    if existing.delivery_otp != otp {
        tracing::debug!(order_id = %order_id, "delivery otp mismatch");
        return Err(AppError::bad_request("Invalid OTP"));
    }

    let current = status_of(&existing)?;
    if current == OrderStatus::Delivered {
        return Err(AppError::bad_request("Order already delivered"));
    }
    ensure_transition(
        current,
        OrderStatus::Delivered,
        state.config.strict_status_transitions,
    )?;

    let mut active: OrderActive = existing.into();
    active.order_status = Set(OrderStatus::Delivered.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order delivered");
    audit::record(
        &state.pool,
        Some(order.customer_id),
        AuditAction::OrderDelivered,
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    let lines = load_lines(&state.orm, order.id).await?;
    Ok(ApiResponse::success(
        "Order marked as delivered",
        order_from_entity(order, lines)?,
        Some(Meta::empty()),
    ))
}

pub async fn cancel_product(
    state: &AppState,
    order_id: Uuid,
    payload: CancelProductRequest,
) -> AppResult<ApiResponse<Order>> {
    let product_id = payload
        .product_id
        .ok_or_else(|| AppError::bad_request("productId is required"))?;

    let txn = state.orm.begin().await?;

    let order = find_order_for_update(&txn, order_id).await?;

    let current = status_of(&order)?;
    if current.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Cannot cancel products on a {current} order"
        )));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::LineNo)
        .all(&txn)
        .await?;
    let mut lines: Vec<OrderLine> = items.iter().map(line_from_entity).collect();

    let (index, remaining) = cancel_line_quantity(&mut lines, product_id, payload.quantity)?;
    let item = &items[index];
    if remaining == 0 {
        OrderItems::delete_by_id(item.id).exec(&txn).await?;
    } else {
        let mut active: OrderItemActive = item.clone().into();
        active.quantity = Set(remaining);
        active.update(&txn).await?;
    }

    let total_amount = order_total(&lines)?;
    let next = if lines.is_empty() {
        OrderStatus::Cancelled
    } else {
        current
    };

    let mut active: OrderActive = order.into();
    active.total_amount = Set(total_amount);
    active.order_status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        product_id = %product_id,
        remaining,
        total_amount,
        "order line cancelled"
    );
    audit::record(
        &state.pool,
        Some(order.customer_id),
        AuditAction::OrderCancelProduct,
        serde_json::json!({ "order_id": order.id, "product_id": product_id, "remaining": remaining }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product cancelled from order",
        order_from_entity(order, lines)?,
        Some(Meta::empty()),
    ))
}

/// Validate checkout lines. Quantity must be at least 1, price positive, mrp falls back to price.
pub fn build_order_lines(products: &[OrderProductInput]) -> AppResult<Vec<OrderLine>> {
    products
        .iter()
        .map(|product| {
            let (Some(product_id), Some(quantity), Some(price)) =
                (product.product_id, product.quantity, product.price)
            else {
                return Err(AppError::bad_request(
                    "Each product must have productId, quantity, and price",
                ));
            };
            if quantity < 1 || price <= 0 {
                return Err(AppError::bad_request(
                    "Each product must have productId, quantity, and price",
                ));
            }
            let quantity = i32::try_from(quantity)
                .map_err(|_| AppError::bad_request("quantity is too large"))?;
            let mrp = product.mrp.unwrap_or(price);
            if mrp < 0 {
                return Err(AppError::bad_request("mrp must not be negative"));
            }
            Ok(OrderLine {
                product_id,
                quantity,
                price,
                mrp,
            })
        })
        .collect()
}

pub fn order_total(lines: &[OrderLine]) -> AppResult<i64> {
    lines.iter().try_fold(0_i64, |total, line| {
        line.price
            .checked_mul(i64::from(line.quantity))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| AppError::bad_request("Order total is too large"))
    })
}

/// Six-digit delivery code. Only gates the delivered transition, it is not a credential.
pub fn generate_delivery_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Take `quantity` units (the whole line when `None`) off the first line for `product_id`.
/// Returns the line's index and what is left of it; a line left at zero is removed.
pub fn cancel_line_quantity(
    lines: &mut Vec<OrderLine>,
    product_id: Uuid,
    quantity: Option<i64>,
) -> AppResult<(usize, i32)> {
    let index = lines
        .iter()
        .position(|line| line.product_id == product_id)
        .ok_or_else(|| AppError::not_found("Product not found in order"))?;

    let line_quantity = lines[index].quantity;
    let cancel = quantity.unwrap_or(i64::from(line_quantity));
    if cancel < 1 || cancel > i64::from(line_quantity) {
        return Err(AppError::BadRequest(format!(
            "Cancel quantity must be between 1 and {line_quantity}"
        )));
    }

    let remaining = line_quantity - cancel as i32;
    if remaining == 0 {
        lines.remove(index);
    } else {
        lines[index].quantity = remaining;
    }
    Ok((index, remaining))
}

pub fn ensure_transition(current: OrderStatus, next: OrderStatus, strict: bool) -> AppResult<()> {
    if strict && !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move order from {current} to {next}"
        )));
    }
    Ok(())
}

async fn find_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))
}

/// Same as `find_order` but holds `FOR UPDATE` until the transaction ends.
async fn find_order_for_update<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))
}

async fn load_lines<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderLine>> {
    let lines = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::LineNo)
        .all(conn)
        .await?
        .iter()
        .map(line_from_entity)
        .collect();
    Ok(lines)
}

/// Resolve customer, shop and product references for a batch of orders, keeping their order.
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderDetails>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::OrderId)
        .order_by_asc(OrderItemCol::LineNo)
        .all(conn)
        .await?;

    let mut customer_ids: Vec<Uuid> = orders.iter().map(|o| o.customer_id).collect();
    customer_ids.sort_unstable();
    customer_ids.dedup();
    let customers: HashMap<Uuid, CustomerSummary> = Customers::find()
        .filter(CustomerCol::Id.is_in(customer_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| {
            (
                c.id,
                CustomerSummary {
                    id: c.id,
                    customer_name: c.customer_name,
                    email: c.email,
                    mobile: c.mobile,
                },
            )
        })
        .collect();

    let mut shop_ids: Vec<Uuid> = orders.iter().map(|o| o.shop_id).collect();
    shop_ids.sort_unstable();
    shop_ids.dedup();
    let shops: HashMap<Uuid, ShopSummary> = Shops::find()
        .filter(ShopCol::Id.is_in(shop_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| {
            (
                s.id,
                ShopSummary {
                    id: s.id,
                    shop_name: s.shop_name,
                    contact: s.contact,
                },
            )
        })
        .collect();

    let products = product_summaries(conn, items.iter().map(|i| i.product_id)).await?;

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLineView>> = HashMap::new();
    for item in items {
        lines_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderLineView {
                product_id: item.product_id,
                product: products.get(&item.product_id).cloned(),
                quantity: item.quantity,
                price: item.price,
                mrp: item.mrp,
            });
    }

    orders
        .into_iter()
        .map(|order| {
            let order_status = status_of(&order)?;
            Ok(OrderDetails {
                id: order.id,
                customer_id: order.customer_id,
                customer: customers.get(&order.customer_id).cloned(),
                shop_id: order.shop_id,
                shop: shops.get(&order.shop_id).cloned(),
                products: lines_by_order.remove(&order.id).unwrap_or_default(),
                total_amount: order.total_amount,
                order_status,
                delivery_otp: order.delivery_otp,
                created_at: order.created_at.with_timezone(&Utc),
                updated_at: order.updated_at.with_timezone(&Utc),
            })
        })
        .collect()
}

fn status_of(order: &OrderModel) -> AppResult<OrderStatus> {
    order.order_status.parse().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unknown status {:?}",
            order.id,
            order.order_status
        ))
    })
}

fn order_from_entity(model: OrderModel, products: Vec<OrderLine>) -> AppResult<Order> {
    let order_status = status_of(&model)?;
    Ok(Order {
        id: model.id,
        customer_id: model.customer_id,
        shop_id: model.shop_id,
        products,
        total_amount: model.total_amount,
        order_status,
        delivery_otp: model.delivery_otp,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn line_from_entity(model: &OrderItemModel) -> OrderLine {
    OrderLine {
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        mrp: model.mrp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(quantity: i64, price: i64) -> OrderProductInput {
        OrderProductInput {
            product_id: Some(Uuid::new_v4()),
            quantity: Some(quantity),
            price: Some(price),
            mrp: None,
        }
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let lines = build_order_lines(&[input(2, 10), input(3, 5)]).unwrap();
        assert_eq!(order_total(&lines).unwrap(), 35);
    }

    #[test]
    fn mrp_defaults_to_price() {
        let mut with_mrp = input(1, 80);
        with_mrp.mrp = Some(100);
        let lines = build_order_lines(&[input(1, 50), with_mrp]).unwrap();

        assert_eq!(lines[0].mrp, 50);
        assert_eq!(lines[1].mrp, 100);
    }

    #[test]
    fn lines_missing_required_fields_are_rejected() {
        let mut no_price = input(1, 10);
        no_price.price = None;
        let mut no_product = input(1, 10);
        no_product.product_id = None;

        for bad in [no_price, no_product, input(0, 10), input(1, 0)] {
            let err = build_order_lines(&[bad]).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Each product must have productId, quantity, and price"
            );
        }
    }

    #[test]
    fn total_overflow_is_a_validation_error() {
        let lines = build_order_lines(&[input(2, i64::MAX)]).unwrap();
        assert!(matches!(order_total(&lines), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn delivery_otp_is_six_digits_in_range() {
        for _ in 0..1_000 {
            let otp = generate_delivery_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn partial_cancel_reduces_quantity_and_total() {
        let mut lines = build_order_lines(&[input(5, 10), input(1, 20)]).unwrap();
        let p1 = lines[0].product_id;

        let (index, remaining) = cancel_line_quantity(&mut lines, p1, Some(2)).unwrap();
        assert_eq!((index, remaining), (0, 3));
        assert_eq!(order_total(&lines).unwrap(), 50);
    }

    #[test]
    fn cancelling_whole_line_removes_it() {
        let mut lines = build_order_lines(&[input(5, 10), input(1, 20)]).unwrap();
        let p2 = lines[1].product_id;

        let (index, remaining) = cancel_line_quantity(&mut lines, p2, None).unwrap();
        assert_eq!((index, remaining), (1, 0));
        assert_eq!(lines.len(), 1);
        assert_eq!(order_total(&lines).unwrap(), 50);
    }

    #[test]
    fn cancel_quantity_out_of_range_is_rejected() {
        let mut lines = build_order_lines(&[input(2, 10)]).unwrap();
        let p1 = lines[0].product_id;

        assert!(cancel_line_quantity(&mut lines, p1, Some(3)).is_err());
        assert!(cancel_line_quantity(&mut lines, p1, Some(0)).is_err());
        assert!(matches!(
            cancel_line_quantity(&mut lines, Uuid::new_v4(), Some(1)),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn unconstrained_transitions_by_default() {
        // Default mode keeps the overwrite-anything behavior.
        assert!(ensure_transition(OrderStatus::Delivered, OrderStatus::Pending, false).is_ok());
        assert!(ensure_transition(OrderStatus::Cancelled, OrderStatus::Shipped, false).is_ok());
    }

    #[test]
    fn strict_mode_rejects_illegal_transitions() {
        let err =
            ensure_transition(OrderStatus::Delivered, OrderStatus::Pending, true).unwrap_err();
        assert_eq!(err.to_string(), "Cannot move order from delivered to pending");
        assert!(ensure_transition(OrderStatus::Pending, OrderStatus::Confirmed, true).is_ok());
    }
}
