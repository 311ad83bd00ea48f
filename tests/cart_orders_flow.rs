mod common;

use cartlink_api::{
    dto::{
        cart::{AddToCartItem, AddToCartRequest},
        orders::{CancelProductRequest, CreateOrderRequest, OrderProductInput, UpdateOrderStatusRequest, VerifyOtpRequest},
    },
    entity::audit_logs::{Column as AuditCol, Entity as AuditLogs},
    error::AppError,
    models::{CartItem, Order, OrderStatus},
    services::{cart_service, order_service},
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use common::{database_url, setup_state};

fn single(customer_id: Uuid, shop_id: Uuid, product_id: Uuid, quantity: serde_json::Value) -> AddToCartRequest {
    AddToCartRequest {
        customer_id: Some(customer_id),
        shop_id: Some(shop_id),
        product_id: Some(product_id),
        quantity: Some(quantity),
        items: None,
    }
}

fn line(product_id: Uuid, quantity: i64, price: i64) -> OrderProductInput {
    OrderProductInput {
        product_id: Some(product_id),
        quantity: Some(quantity),
        price: Some(price),
        mrp: None,
    }
}

async fn place_order(
    state: &AppState,
    customer_id: Uuid,
    shop_id: Uuid,
    products: Vec<OrderProductInput>,
) -> anyhow::Result<Order> {
    let resp = order_service::create_order(
        state,
        CreateOrderRequest {
            customer_id: Some(customer_id),
            shop_id: Some(shop_id),
            products: Some(products),
        },
    )
    .await?;
    Ok(resp.data.expect("order data"))
}

async fn set_status(state: &AppState, order_id: Uuid, status: &str) -> Result<Order, AppError> {
    let resp = order_service::update_status(
        state,
        order_id,
        UpdateOrderStatusRequest {
            order_status: Some(status.to_string()),
        },
    )
    .await?;
    Ok(resp.data.expect("order data"))
}

async fn status_of(state: &AppState, order_id: Uuid) -> anyhow::Result<OrderStatus> {
    let resp = order_service::get_order_by_id(state, order_id).await?;
    Ok(resp.data.expect("order details").order_status)
}

// Cart merge -> checkout purges the cart -> OTP gates delivery.
#[tokio::test]
async fn cart_to_delivered_order_flow() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;

    let (customer_id, shop_id) = (Uuid::new_v4(), Uuid::new_v4());
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());

    let first = cart_service::add_to_cart(&state, single(customer_id, shop_id, p1, json!(2))).await?;
    assert!(first.created);
    assert_eq!(
        first.cart.items,
        vec![CartItem { product_id: p1, quantity: 2 }]
    );

    let second = cart_service::add_to_cart(
        &state,
        AddToCartRequest {
            customer_id: Some(customer_id),
            shop_id: Some(shop_id),
            items: Some(vec![
                AddToCartItem {
                    product_id: Some(p1),
                    quantity: Some(json!(3)),
                },
                AddToCartItem {
                    product_id: Some(p2),
                    quantity: Some(json!("1")),
                },
            ]),
            ..Default::default()
        },
    )
    .await?;
    assert!(!second.created);
    assert_eq!(second.cart.id, first.cart.id);
    assert_eq!(
        second.cart.items,
        vec![
            CartItem { product_id: p1, quantity: 5 },
            CartItem { product_id: p2, quantity: 1 },
        ]
    );

    let order = place_order(&state, customer_id, shop_id, vec![line(p1, 5, 10), line(p2, 1, 20)]).await?;
    assert_eq!(order.total_amount, 70);
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(order.delivery_otp.len(), 6);
    assert!(order.delivery_otp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(order.products[1].mrp, 20);

    let carts = cart_service::get_carts_by_customer(&state, &customer_id.to_string()).await?;
    assert!(carts.data.expect("carts").items.is_empty());

    let audited = AuditLogs::find()
        .filter(AuditCol::ActorId.eq(customer_id))
        .filter(AuditCol::Action.eq("order_create"))
        .count(&state.orm)
        .await?;
    assert_eq!(audited, 1);

    let wrong = if order.delivery_otp == "100000" { "100001" } else { "100000" };
    let err = order_service::verify_otp_and_deliver(
        &state,
        order.id,
        VerifyOtpRequest {
            otp: Some(wrong.to_string()),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid OTP");
    assert_eq!(status_of(&state, order.id).await?, OrderStatus::Pending);

    let delivered = order_service::verify_otp_and_deliver(
        &state,
        order.id,
        VerifyOtpRequest {
            otp: Some(order.delivery_otp.clone()),
        },
    )
    .await?
    .data
    .expect("order data");
    assert_eq!(delivered.order_status, OrderStatus::Delivered);

    let again = order_service::verify_otp_and_deliver(
        &state,
        order.id,
        VerifyOtpRequest {
            otp: Some(order.delivery_otp.clone()),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(again.to_string(), "Order already delivered");

    let by_customer = order_service::get_orders_by_customer(&state, customer_id).await?;
    let orders = by_customer.data.expect("orders").items;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_status, OrderStatus::Delivered);

    Ok(())
}

#[tokio::test]
async fn unknown_status_leaves_order_untouched() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;

    let order = place_order(&state, Uuid::new_v4(), Uuid::new_v4(), vec![line(Uuid::new_v4(), 1, 99)]).await?;

    let err = set_status(&state, order.id, "paid").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(status_of(&state, order.id).await?, OrderStatus::Pending);

    let missing = set_status(&state, Uuid::new_v4(), "shipped").await.unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));

    // Without strict transitions any recognized status overwrites the current one.
    assert_eq!(set_status(&state, order.id, "delivered").await?.order_status, OrderStatus::Delivered);
    assert_eq!(set_status(&state, order.id, "pending").await?.order_status, OrderStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn strict_transitions_reject_skipped_steps() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, true).await?;

    let order = place_order(&state, Uuid::new_v4(), Uuid::new_v4(), vec![line(Uuid::new_v4(), 2, 15)]).await?;

    let err = set_status(&state, order.id, "delivered").await.unwrap_err();
    assert_eq!(err.to_string(), "Cannot move order from pending to delivered");
    assert_eq!(status_of(&state, order.id).await?, OrderStatus::Pending);

    // OTP delivery follows the same table.
    let err = order_service::verify_otp_and_deliver(
        &state,
        order.id,
        VerifyOtpRequest {
            otp: Some(order.delivery_otp.clone()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    set_status(&state, order.id, "confirmed").await?;
    assert!(set_status(&state, order.id, "pending").await.is_err());
    set_status(&state, order.id, "shipped").await?;

    let delivered = order_service::verify_otp_and_deliver(
        &state,
        order.id,
        VerifyOtpRequest {
            otp: Some(order.delivery_otp.clone()),
        },
    )
    .await?;
    assert_eq!(delivered.data.expect("order").order_status, OrderStatus::Delivered);
    assert!(set_status(&state, order.id, "cancelled").await.is_err());

    Ok(())
}

#[tokio::test]
async fn cancel_product_recomputes_total_and_closes_empty_order() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;

    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    let order = place_order(&state, Uuid::new_v4(), Uuid::new_v4(), vec![line(p1, 5, 10), line(p2, 1, 20)]).await?;

    let order_id = order.id;
    let cancel = |product_id: Uuid, quantity: Option<i64>| {
        let state = state.clone();
        async move {
            order_service::cancel_product(
                &state,
                order_id,
                CancelProductRequest {
                    product_id: Some(product_id),
                    quantity,
                },
            )
            .await
            .map(|resp| resp.data.expect("order data"))
        }
    };

    let err = cancel(p1, Some(6)).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let err = cancel(Uuid::new_v4(), None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let reduced = cancel(p1, Some(2)).await?;
    assert_eq!(reduced.total_amount, 50);
    assert_eq!(reduced.products[0].quantity, 3);
    assert_eq!(reduced.order_status, OrderStatus::Pending);

    let without_p2 = cancel(p2, None).await?;
    assert_eq!(without_p2.products.len(), 1);
    assert_eq!(without_p2.total_amount, 30);

    let emptied = cancel(p1, None).await?;
    assert!(emptied.products.is_empty());
    assert_eq!(emptied.total_amount, 0);
    assert_eq!(emptied.order_status, OrderStatus::Cancelled);

    let err = cancel(p1, Some(1)).await.unwrap_err();
    assert_eq!(err.to_string(), "Cannot cancel products on a cancelled order");

    Ok(())
}

#[tokio::test]
async fn concurrent_adds_land_in_one_cart() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;

    let (customer_id, shop_id, product_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let adds = 16;

    let handles: Vec<_> = (0..adds)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move {
                cart_service::add_to_cart(&state, single(customer_id, shop_id, product_id, json!(1))).await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await??.created {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let carts = cart_service::get_carts_by_customer(&state, &customer_id.to_string())
        .await?
        .data
        .expect("carts")
        .items;
    assert_eq!(carts.len(), 1);
    assert_eq!(carts[0].items.len(), 1);
    assert_eq!(carts[0].items[0].quantity, adds);

    Ok(())
}

#[tokio::test]
async fn sweeper_removes_only_superseded_carts() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;

    let (customer_id, shop_id, product_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    place_order(&state, customer_id, shop_id, vec![line(product_id, 1, 10)]).await?;

    // A cart started after the order is a fresh basket.
    let outcome = cart_service::add_to_cart(&state, single(customer_id, shop_id, product_id, json!(1))).await?;
    cart_service::sweep_stale_carts(&state.pool).await?;
    let carts = cart_service::get_carts_by_customer(&state, &customer_id.to_string()).await?;
    assert_eq!(carts.data.expect("carts").items.len(), 1);

    // Simulate a purge that never ran: the cart predates the order.
    sqlx::query("UPDATE carts SET updated_at = now() - interval '1 hour' WHERE id = $1")
        .bind(outcome.cart.id)
        .execute(&state.pool)
        .await?;
    let swept = cart_service::sweep_stale_carts(&state.pool).await?;
    assert!(swept >= 1);

    let carts = cart_service::get_carts_by_customer(&state, &customer_id.to_string()).await?;
    assert!(carts.data.expect("carts").items.is_empty());

    Ok(())
}

#[tokio::test]
async fn invalid_customer_id_is_rejected() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, false).await?;

    let err = cart_service::get_carts_by_customer(&state, "not-a-uuid").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid customerId");

    let err = cart_service::add_to_cart(
        &state,
        single(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), json!("two")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

// Under strict transitions a shipped order can be delivered or cancelled, never both.
#[tokio::test]
async fn concurrent_deliver_and_cancel_have_one_winner() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, true).await?;

    let order = place_order(&state, Uuid::new_v4(), Uuid::new_v4(), vec![line(Uuid::new_v4(), 1, 40)]).await?;
    set_status(&state, order.id, "confirmed").await?;
    set_status(&state, order.id, "shipped").await?;

    let deliver = tokio::spawn({
        let state = state.clone();
        let otp = order.delivery_otp.clone();
        async move {
            order_service::verify_otp_and_deliver(&state, order.id, VerifyOtpRequest { otp: Some(otp) }).await
        }
    });
    let cancel = tokio::spawn({
        let state = state.clone();
        async move { set_status(&state, order.id, "cancelled").await }
    });

    let delivered = deliver.await?;
    let cancelled = cancel.await?;
    assert!(
        delivered.is_ok() != cancelled.is_ok(),
        "exactly one transition out of shipped must win"
    );

    let expected = if delivered.is_ok() {
        OrderStatus::Delivered
    } else {
        OrderStatus::Cancelled
    };
    assert_eq!(status_of(&state, order.id).await?, expected);

    Ok(())
}
