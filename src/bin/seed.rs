use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use jewelry_store_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", "admin").await?;
    let user_id =
        ensure_user_with_role(&pool, "customer@example.com", "customer123", "customer").await?;
    seed_products(&pool).await?;
    seed_welcome_coupon(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // Prices in minor units (paise).
    let products = vec![
        (
            "Solitaire Diamond Ring",
            "Classic 0.5 carat solitaire on an 18k band",
            "rings",
            Some("gold"),
            45_000_00i64,
            12,
        ),
        (
            "Pearl Drop Earrings",
            "Freshwater pearls on sterling hooks",
            "earrings",
            Some("silver"),
            3_500_00,
            40,
        ),
        (
            "Gold Rope Chain",
            "22k rope chain, 20 inches",
            "chains",
            Some("gold"),
            68_000_00,
            8,
        ),
        (
            "Silver Charm Bracelet",
            "Sterling bracelet with three starter charms",
            "bracelets",
            Some("silver"),
            4_200_00,
            25,
        ),
        (
            "Emerald Pendant",
            "Lab-grown emerald in a rhodium setting",
            "pendants",
            Some("platinum"),
            22_500_00,
            10,
        ),
    ];

    for (name, desc, category, metal, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, category, metal, price, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(category)
        .bind(metal)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_welcome_coupon(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons
            (id, code, discount_type, value, minimum_order_amount, maximum_discount_amount,
             usage_limit, user_usage_limit, valid_from, valid_until)
        VALUES ($1, 'WELCOME10', 'percentage', 10, $2, $3, NULL, 1, now(), now() + interval '1 year')
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(1_000_00i64)
    .bind(500_00i64)
    .execute(pool)
    .await?;

    println!("Seeded WELCOME10 coupon");
    Ok(())
}
