use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use cartlink_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let owner_id = ensure_owner(&pool, "9000000001", "owner123").await?;
    let shop_id = ensure_shop(&pool, owner_id).await?;
    let customer_id = ensure_customer(&pool, "9000000002", "customer123").await?;
    seed_products(&pool, owner_id).await?;

    println!("Seed completed. Owner ID: {owner_id}, Shop ID: {shop_id}, Customer ID: {customer_id}");
    Ok(())
}

fn hash(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string())
}

async fn ensure_owner(pool: &sqlx::PgPool, mobile: &str, password: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO shop_owners (id, owner_name, shop_name, mobile, email, password_hash)
        VALUES ($1, 'Demo Owner', 'Corner Grocers', $2, 'owner@example.com', $3)
        ON CONFLICT (mobile) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(mobile)
    .bind(hash(password)?)
    .fetch_one(pool)
    .await?;

    println!("Ensured owner {mobile}");
    Ok(id)
}

async fn ensure_shop(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM shops WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO shops (id, owner_id, shop_name, owner_name, location, contact, business_type)
        VALUES ($1, $2, 'Corner Grocers', 'Demo Owner', 'Market Road', '9000000001', 'grocery')
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .fetch_one(pool)
    .await?;

    println!("Created shop {id}");
    Ok(id)
}

async fn ensure_customer(pool: &sqlx::PgPool, mobile: &str, password: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO customers (id, customer_name, mobile, email, password_hash, address)
        VALUES ($1, 'Demo Customer', $2, 'customer@example.com', $3, 'Lake View')
        ON CONFLICT (mobile) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(mobile)
    .bind(hash(password)?)
    .fetch_one(pool)
    .await?;

    println!("Ensured customer {mobile}");
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<()> {
    let products = vec![
        ("Basmati Rice 5kg", "Long grain aged rice", 65000_i64, 72000_i64, 40),
        ("Sunflower Oil 1L", "Refined cooking oil", 18000, 19500, 120),
        ("Green Tea 100g", "Loose leaf green tea", 24000, 26000, 60),
        ("Whole Wheat Atta 10kg", "Stone ground flour", 52000, 55000, 35),
    ];

    for (name, desc, price, mrp, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, owner_id, name, description, price, mrp, stock, is_active)
            SELECT $1, $2, $3, $4, $5, $6, $7, TRUE
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE owner_id = $2 AND name = $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(mrp)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
