use chrono::DateTime;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartItemDto, CartView},
    error::{AppError, AppResult},
    middleware::auth::CartOwner,
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    rules::pricing::{self, CartLine},
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    description: Option<String>,
    category: String,
    metal: Option<String>,
    price: i64,
    stock: i32,
    is_active: bool,
    created_at: DateTime<chrono::Utc>,
    updated_at: DateTime<chrono::Utc>,
}

/// Current cart with totals derived from the rows just read; nothing here is
/// cached or incrementally adjusted.
pub async fn cart_view(pool: &DbPool, owner: &CartOwner) -> AppResult<ApiResponse<CartView>> {
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.name, p.description, p.category, p.metal,
               p.price, p.stock, p.is_active, p.created_at, p.updated_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.owner_id = $1 AND ci.is_guest = $2
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(owner.owner_id())
    .bind(owner.is_guest())
    .fetch_all(pool)
    .await?;

    let lines: Vec<CartLine> = rows
        .iter()
        .map(|row| CartLine {
            quantity: row.quantity,
            unit_price: row.price,
        })
        .collect();
    let totals = pricing::cart_totals(&lines, 0);

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.cart_id,
            product: Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                category: row.category,
                metal: row.metal,
                price: row.price,
                stock: row.stock,
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            quantity: row.quantity,
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        CartView { items, totals },
        Some(Meta::empty()),
    ))
}

pub async fn add_to_cart(
    pool: &DbPool,
    owner: &CartOwner,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product: Option<(i32, bool)> =
        sqlx::query_as("SELECT stock, is_active FROM products WHERE id = $1")
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;
    let (stock, is_active) = match product {
        Some(p) => p,
        None => return Err(AppError::Validation("product not found".to_string())),
    };
    if !is_active {
        return Err(AppError::Validation(
            "product is no longer available".to_string(),
        ));
    }
    if stock < payload.quantity {
        return Err(AppError::Validation("insufficient stock".to_string()));
    }

    let cart_item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (owner_id, is_guest, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (owner_id, product_id)
        DO UPDATE SET quantity = EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(owner.owner_id())
    .bind(owner.is_guest())
    .bind(payload.product_id)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        owner.customer_id(),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    owner: &CartOwner,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result =
        sqlx::query("DELETE FROM cart_items WHERE product_id = $1 AND owner_id = $2 AND is_guest = $3")
            .bind(product_id)
            .bind(owner.owner_id())
            .bind(owner.is_guest())
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        owner.customer_id(),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// The product ids currently in a cart, for coupon applicability checks.
pub async fn cart_product_ids(pool: &DbPool, owner: &CartOwner) -> AppResult<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT product_id FROM cart_items WHERE owner_id = $1 AND is_guest = $2")
            .bind(owner.owner_id())
            .bind(owner.is_guest())
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Current cart lines (quantity and live unit price), for totals previews.
pub async fn cart_lines(pool: &DbPool, owner: &CartOwner) -> AppResult<Vec<CartLine>> {
    let rows: Vec<(i32, i64)> = sqlx::query_as(
        r#"
        SELECT ci.quantity, p.price
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.owner_id = $1 AND ci.is_guest = $2
        "#,
    )
    .bind(owner.owner_id())
    .bind(owner.is_guest())
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(quantity, unit_price)| CartLine {
            quantity,
            unit_price,
        })
        .collect())
}
