use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::Value;
use sqlx::{FromRow, PgConnection};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    db::DbPool,
    dto::cart::{AddToCartRequest, CartList},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
    },
    error::{AppError, AppResult},
    models::{Cart, CartItem, CartLineView, CartWithProducts},
    response::ApiResponse,
    routes::params::parse_id,
    services::product_service::product_summaries,
    state::AppState,
};

/// Result of an add-to-cart call; `created` is false when items were merged into an existing cart.
#[derive(Debug)]
pub struct AddToCartOutcome {
    pub cart: Cart,
    pub created: bool,
}

#[derive(FromRow)]
struct CartRow {
    id: Uuid,
    customer_id: Uuid,
    shop_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CartItemRow {
    product_id: Uuid,
    quantity: i32,
}

pub async fn add_to_cart(state: &AppState, payload: AddToCartRequest) -> AppResult<AddToCartOutcome> {
    let (Some(customer_id), Some(shop_id)) = (payload.customer_id, payload.shop_id) else {
        return Err(AppError::bad_request("customerId and shopId are required"));
    };
    let incoming = merge_items(&[], &normalize_items(&payload)?)?;

    let mut tx = state.pool.begin().await?;

    // The upsert row-locks the cart, so concurrent merges for one pair run one after another.
    let (cart_id, created): (Uuid, bool) = sqlx::query_as(
        r#"
        INSERT INTO carts (id, customer_id, shop_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (customer_id, shop_id) DO UPDATE SET updated_at = now()
        RETURNING id, (xmax = 0) AS created
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(shop_id)
    .fetch_one(&mut *tx)
    .await?;

    for item in &incoming {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
    }

    let cart = load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    tracing::debug!(
        cart_id = %cart.id,
        customer_id = %customer_id,
        shop_id = %shop_id,
        created,
        lines = cart.items.len(),
        "cart updated"
    );

    audit::record(
        &state.pool,
        Some(customer_id),
        if created {
            AuditAction::CartCreate
        } else {
            AuditAction::CartMerge
        },
        serde_json::json!({ "cart_id": cart.id, "shop_id": shop_id, "items": incoming }),
    )
    .await;

    Ok(AddToCartOutcome { cart, created })
}

pub async fn get_carts_by_customer(
    state: &AppState,
    customer_id: &str,
) -> AppResult<ApiResponse<CartList>> {
    let customer_id = parse_id(customer_id, "customerId")?;

    let carts = Carts::find()
        .filter(CartCol::CustomerId.eq(customer_id))
        .order_by_desc(CartCol::UpdatedAt)
        .all(&state.orm)
        .await?;

    let cart_ids: Vec<Uuid> = carts.iter().map(|c| c.id).collect();
    let items = if cart_ids.is_empty() {
        Vec::new()
    } else {
        CartItems::find()
            .filter(CartItemCol::CartId.is_in(cart_ids))
            .order_by_asc(CartItemCol::Position)
            .all(&state.orm)
            .await?
    };

    let products = product_summaries(&state.orm, items.iter().map(|i| i.product_id)).await?;

    let mut lines_by_cart: HashMap<Uuid, Vec<CartLineView>> = HashMap::new();
    for item in items {
        lines_by_cart
            .entry(item.cart_id)
            .or_default()
            .push(CartLineView {
                product_id: item.product_id,
                quantity: item.quantity,
                product: products.get(&item.product_id).cloned(),
            });
    }

    let items = carts
        .into_iter()
        .map(|cart| CartWithProducts {
            id: cart.id,
            customer_id: cart.customer_id,
            shop_id: cart.shop_id,
            items: lines_by_cart.remove(&cart.id).unwrap_or_default(),
            created_at: cart.created_at.with_timezone(&Utc),
            updated_at: cart.updated_at.with_timezone(&Utc),
        })
        .collect();

    Ok(ApiResponse::data(CartList { items }))
}

/// Delete every cart of a (customer, shop) pair. Items go with the cart via `ON DELETE CASCADE`.
pub async fn purge_carts(pool: &DbPool, customer_id: Uuid, shop_id: Uuid) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM carts WHERE customer_id = $1 AND shop_id = $2")
        .bind(customer_id)
        .bind(shop_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Remove carts that an order has already superseded but whose purge did not go through.
/// A cart touched after the latest order for its pair is kept.
pub async fn sweep_stale_carts(pool: &DbPool) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM carts c
        WHERE EXISTS (
            SELECT 1 FROM orders o
            WHERE o.customer_id = c.customer_id
              AND o.shop_id = c.shop_id
              AND o.created_at >= c.updated_at
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub fn spawn_cart_sweeper(pool: DbPool, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sweep_stale_carts(&pool).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(count = n, "swept stale carts"),
                Err(err) => tracing::warn!(error = %err, "cart sweep failed"),
            }
        }
    })
}

/// Turn the request into cart lines. A non-empty `items` list wins over `productId`.
pub fn normalize_items(payload: &AddToCartRequest) -> AppResult<Vec<CartItem>> {
    if let Some(items) = payload.items.as_ref().filter(|items| !items.is_empty()) {
        return items
            .iter()
            .map(|item| {
                let product_id = item
                    .product_id
                    .ok_or_else(|| AppError::bad_request("Each item must have a productId"))?;
                Ok(CartItem {
                    product_id,
                    quantity: coerce_quantity(item.quantity.as_ref())?,
                })
            })
            .collect();
    }

    match payload.product_id {
        Some(product_id) => Ok(vec![CartItem {
            product_id,
            quantity: coerce_quantity(payload.quantity.as_ref())?,
        }]),
        None => Err(AppError::bad_request("productId or items array required")),
    }
}

/// Missing quantity means 1. Integers and numeric strings are accepted, anything else is rejected.
pub fn coerce_quantity(raw: Option<&Value>) -> AppResult<i32> {
    let quantity = match raw {
        None | Some(Value::Null) => return Ok(1),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    }
    .ok_or_else(|| AppError::bad_request("quantity must be a whole number"))?;

    if quantity < 1 {
        return Err(AppError::bad_request("quantity must be greater than 0"));
    }
    i32::try_from(quantity).map_err(|_| AppError::bad_request("quantity is too large"))
}

/// Fold `existing` then `incoming` into one line per product, summing quantities.
/// Lines keep the order in which their product first appeared.
pub fn merge_items(existing: &[CartItem], incoming: &[CartItem]) -> AppResult<Vec<CartItem>> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for item in existing.iter().chain(incoming) {
        match index.get(&item.product_id) {
            Some(&i) => {
                merged[i].quantity = merged[i]
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::bad_request("quantity is too large"))?;
            }
            None => {
                index.insert(item.product_id, merged.len());
                merged.push(*item);
            }
        }
    }

    Ok(merged)
}

async fn load_cart(conn: &mut PgConnection, cart_id: Uuid) -> AppResult<Cart> {
    let row: CartRow = sqlx::query_as(
        "SELECT id, customer_id, shop_id, created_at, updated_at FROM carts WHERE id = $1",
    )
    .bind(cart_id)
    .fetch_one(&mut *conn)
    .await?;

    let items = sqlx::query_as::<_, CartItemRow>(
        "SELECT product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY position",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| CartItem {
        product_id: row.product_id,
        quantity: row.quantity,
    })
    .collect();

    Ok(Cart {
        id: row.id,
        customer_id: row.customer_id,
        shop_id: row.shop_id,
        items,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dto::cart::AddToCartItem;

    fn item(product_id: Uuid, quantity: i32) -> CartItem {
        CartItem {
            product_id,
            quantity,
        }
    }

    fn quantities(items: &[CartItem]) -> HashMap<Uuid, i32> {
        items.iter().map(|i| (i.product_id, i.quantity)).collect()
    }

    #[test]
    fn adding_same_product_twice_yields_one_summed_line() {
        let p1 = Uuid::new_v4();
        let first = merge_items(&[], &[item(p1, 2)]).unwrap();
        let second = merge_items(&first, &[item(p1, 2)]).unwrap();

        assert_eq!(second, vec![item(p1, 4)]);
    }

    #[test]
    fn merge_keeps_existing_lines_first_in_first_occurrence_order() {
        let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let existing = vec![item(p2, 1), item(p1, 2)];
        let incoming = vec![item(p3, 1), item(p1, 3), item(p3, 4)];

        let merged = merge_items(&existing, &incoming).unwrap();
        assert_eq!(merged, vec![item(p2, 1), item(p1, 5), item(p3, 5)]);
    }

    #[test]
    fn merge_is_commutative_in_quantities() {
        let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let a = vec![item(p1, 2), item(p2, 1)];
        let b = vec![item(p2, 7), item(p3, 3), item(p1, 1)];

        let ab = merge_items(&merge_items(&[], &a).unwrap(), &b).unwrap();
        let ba = merge_items(&merge_items(&[], &b).unwrap(), &a).unwrap();

        assert_eq!(quantities(&ab), quantities(&ba));
        assert_eq!(quantities(&ab)[&p2], 8);
    }

    #[test]
    fn merge_rejects_quantity_overflow() {
        let p1 = Uuid::new_v4();
        let err = merge_items(&[item(p1, i32::MAX)], &[item(p1, 1)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn quantity_defaults_to_one_and_accepts_numeric_strings() {
        assert_eq!(coerce_quantity(None).unwrap(), 1);
        assert_eq!(coerce_quantity(Some(&Value::Null)).unwrap(), 1);
        assert_eq!(coerce_quantity(Some(&json!(3))).unwrap(), 3);
        assert_eq!(coerce_quantity(Some(&json!(2.0))).unwrap(), 2);
        assert_eq!(coerce_quantity(Some(&json!(" 4 "))).unwrap(), 4);
    }

    #[test]
    fn malformed_quantities_fail_fast() {
        for raw in [json!("two"), json!(1.5), json!(true), json!([1]), json!(0), json!(-2)] {
            let err = coerce_quantity(Some(&raw)).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "accepted {raw}");
        }
        assert!(coerce_quantity(Some(&json!(i64::from(i32::MAX) + 1))).is_err());
    }

    #[test]
    fn single_product_payload_normalizes_to_one_line() {
        let p1 = Uuid::new_v4();
        let payload = AddToCartRequest {
            customer_id: Some(Uuid::new_v4()),
            shop_id: Some(Uuid::new_v4()),
            product_id: Some(p1),
            quantity: Some(json!("2")),
            items: None,
        };
        assert_eq!(normalize_items(&payload).unwrap(), vec![item(p1, 2)]);
    }

    #[test]
    fn items_list_takes_precedence_over_single_product() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let payload = AddToCartRequest {
            product_id: Some(p1),
            items: Some(vec![AddToCartItem {
                product_id: Some(p2),
                quantity: None,
            }]),
            ..Default::default()
        };
        assert_eq!(normalize_items(&payload).unwrap(), vec![item(p2, 1)]);
    }

    #[test]
    fn empty_items_without_product_is_rejected() {
        let payload = AddToCartRequest {
            items: Some(vec![]),
            ..Default::default()
        };
        let err = normalize_items(&payload).unwrap_err();
        assert_eq!(err.to_string(), "productId or items array required");
    }

    #[test]
    fn item_without_product_id_is_rejected() {
        let payload = AddToCartRequest {
            items: Some(vec![AddToCartItem {
                product_id: None,
                quantity: Some(json!(1)),
            }]),
            ..Default::default()
        };
        assert!(normalize_items(&payload).is_err());
    }
}
