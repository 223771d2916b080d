use uuid::Uuid;

use crate::{
    audit::log_audit,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, require_admin},
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    dto::reviews::{CreateReviewRequest, ReviewList},
    state::AppState,
};

/// Create a review. Proof of purchase: the customer must own an order item
/// for the product on a non-cancelled order; one review per product per
/// customer.
pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".into()));
    }
    if payload.body.trim().is_empty() {
        return Err(AppError::Validation("review body must not be empty".into()));
    }

    let purchase: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT oi.id
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE o.customer_id = $1
          AND oi.product_id = $2
          AND o.status NOT IN ('cancelled', 'refunded')
        ORDER BY oi.created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user.user_id)
    .bind(payload.product_id)
    .fetch_optional(&state.pool)
    .await?;
    let (order_item_id,) = match purchase {
        Some(row) => row,
        None => {
            return Err(AppError::Validation(
                "you can only review products you have purchased".into(),
            ));
        }
    };

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE customer_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(payload.product_id)
            .fetch_optional(&state.pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::Validation(
            "you have already reviewed this product".into(),
        ));
    }

    let review: Review = sqlx::query_as(
        r#"
        INSERT INTO reviews (id, product_id, customer_id, order_item_id, rating, title, body)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.product_id)
    .bind(user.user_id)
    .bind(order_item_id)
    .bind(payload.rating)
    .bind(payload.title)
    .bind(payload.body)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_create",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id, "product_id": review.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review submitted for moderation",
        review,
        Some(Meta::empty()),
    ))
}

/// Public listing: approved reviews only.
pub async fn list_approved(
    state: &AppState,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = pagination.normalize();

    let items: Vec<Review> = sqlx::query_as(
        r#"
        SELECT * FROM reviews
        WHERE product_id = $1 AND is_approved = TRUE
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE product_id = $1 AND is_approved = TRUE")
            .bind(product_id)
            .fetch_one(&state.pool)
            .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

pub async fn set_approval(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    approved: bool,
) -> AppResult<ApiResponse<Review>> {
    require_admin(user)?;

    let review: Option<Review> =
        sqlx::query_as("UPDATE reviews SET is_approved = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(approved)
            .fetch_optional(&state.pool)
            .await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_moderate",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id, "approved": approved })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Review updated", review, Some(Meta::empty())))
}
