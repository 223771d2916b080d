use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::coupons::{CouponList, CouponPreview, CreateCouponRequest, UpdateCouponRequest},
    entity::{
        coupon_redemptions::ActiveModel as RedemptionActive,
        coupon_redemptions::Column as RedemptionCol,
        coupons::{ActiveModel as CouponActive, Column as CouponCol, Entity as Coupons, Model as CouponModel},
        user_coupons::{ActiveModel as UserCouponActive, Column as UserCouponCol, Entity as UserCoupons},
        CouponRedemptions,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, CartOwner, require_admin},
    models::{Coupon, DiscountType},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    rules::coupons::{CouponRules, DiscountRule, check_coupon},
    rules::pricing,
    services::cart_service,
    state::AppState,
};

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    require_admin(user)?;

    let code = payload.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::Validation("coupon code must not be empty".into()));
    }
    validate_discount(payload.discount_type, payload.value)?;
    if payload.valid_until <= payload.valid_from {
        return Err(AppError::Validation(
            "valid_until must be after valid_from".into(),
        ));
    }

    let exist = Coupons::find()
        .filter(CouponCol::Code.eq(code.clone()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Validation("coupon code already exists".into()));
    }

    let active = CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        discount_type: Set(payload.discount_type),
        value: Set(payload.value),
        minimum_order_amount: Set(payload.minimum_order_amount),
        maximum_discount_amount: Set(payload.maximum_discount_amount),
        usage_limit: Set(payload.usage_limit),
        user_usage_limit: Set(payload.user_usage_limit),
        usage_count: Set(0),
        valid_from: Set(payload.valid_from.into()),
        valid_until: Set(payload.valid_until.into()),
        allowed_users: Set(payload.allowed_users.map(|v| serde_json::json!(v))),
        excluded_users: Set(payload.excluded_users.map(|v| serde_json::json!(v))),
        applicable_products: Set(payload.applicable_products.map(|v| serde_json::json!(v))),
        excluded_products: Set(payload.excluded_products.map(|v| serde_json::json!(v))),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let coupon = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "coupon_create",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Coupon created",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    require_admin(user)?;
    let existing = Coupons::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let discount_type = existing.discount_type;
    let mut active: CouponActive = existing.into();
    if let Some(value) = payload.value {
        validate_discount(discount_type, value)?;
        active.value = Set(value);
    }
    if let Some(min) = payload.minimum_order_amount {
        active.minimum_order_amount = Set(Some(min));
    }
    if let Some(cap) = payload.maximum_discount_amount {
        active.maximum_discount_amount = Set(Some(cap));
    }
    if let Some(limit) = payload.usage_limit {
        active.usage_limit = Set(Some(limit));
    }
    if let Some(limit) = payload.user_usage_limit {
        active.user_usage_limit = Set(Some(limit));
    }
    if let Some(from) = payload.valid_from {
        active.valid_from = Set(from.into());
    }
    if let Some(until) = payload.valid_until {
        active.valid_until = Set(until.into());
    }
    if let Some(users) = payload.allowed_users {
        active.allowed_users = Set(Some(serde_json::json!(users)));
    }
    if let Some(users) = payload.excluded_users {
        active.excluded_users = Set(Some(serde_json::json!(users)));
    }
    if let Some(products) = payload.applicable_products {
        active.applicable_products = Set(Some(serde_json::json!(products)));
    }
    if let Some(products) = payload.excluded_products {
        active.excluded_products = Set(Some(serde_json::json!(products)));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let coupon = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "coupon_update",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": coupon.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Coupon updated",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CouponList>> {
    require_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Coupons::find().order_by_desc(CouponCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(coupon_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(meta),
    ))
}

pub async fn get_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Coupon>> {
    require_admin(user)?;
    let coupon = Coupons::find_by_id(id).one(&state.orm).await?;
    match coupon {
        Some(c) => Ok(ApiResponse::success(
            "Coupon",
            coupon_from_entity(c),
            Some(Meta::empty()),
        )),
        None => Err(AppError::NotFound),
    }
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    require_admin(user)?;
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "coupon_delete",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Preview what a code would do to the caller's current cart. Read-only: no
/// counters move until checkout redeems the coupon.
pub async fn validate_for_cart(
    state: &AppState,
    owner: &CartOwner,
    code: &str,
) -> AppResult<ApiResponse<CouponPreview>> {
    let normalized = code.trim().to_uppercase();
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(normalized))
        .one(&state.orm)
        .await?;
    let coupon = match coupon {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let product_ids = cart_service::cart_product_ids(&state.pool, owner).await?;
    if product_ids.is_empty() {
        return Err(AppError::Validation("Cart is empty".into()));
    }

    let lines = cart_service::cart_lines(&state.pool, owner).await?;
    let subtotal = pricing::cart_totals(&lines, 0).subtotal;

    let usage = match owner.customer_id() {
        Some(user_id) => user_usage(&state.orm, coupon.id, user_id).await?,
        None => 0,
    };

    let discount = check_coupon(
        &rules_from_entity(&coupon),
        owner.customer_id(),
        subtotal,
        &product_ids,
        usage,
        Utc::now(),
    )?;

    let totals = pricing::cart_totals(&lines, discount);
    Ok(ApiResponse::success(
        "Coupon applies",
        CouponPreview {
            code: coupon.code,
            discount,
            totals,
        },
        Some(Meta::empty()),
    ))
}

/// A user's recorded redemption count for a coupon.
pub async fn user_usage<C: ConnectionTrait>(
    conn: &C,
    coupon_id: Uuid,
    user_id: Uuid,
) -> AppResult<i32> {
    let row = UserCoupons::find()
        .filter(
            Condition::all()
                .add(UserCouponCol::CouponId.eq(coupon_id))
                .add(UserCouponCol::UserId.eq(user_id)),
        )
        .one(conn)
        .await?;
    Ok(row.map(|r| r.used_count).unwrap_or(0))
}

/// Record that `order_id` redeemed `coupon_id`. Returns false when the order
/// already has a redemption row, making retries a no-op.
pub async fn record_redemption<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    coupon_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<bool> {
    let inserted = CouponRedemptions::insert(RedemptionActive {
        order_id: Set(order_id),
        coupon_id: Set(coupon_id),
        user_id: Set(user_id),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::column(RedemptionCol::OrderId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
    Ok(inserted > 0)
}

/// Move the usage counters for a redemption that `record_redemption` just
/// admitted. The global counter is a conditional increment: zero rows
/// affected means the limit was reached by a concurrent checkout and the
/// caller must fail the order.
pub async fn apply_redemption<C: ConnectionTrait>(
    conn: &C,
    coupon_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<()> {
    let updated = Coupons::update_many()
        .col_expr(
            CouponCol::UsageCount,
            Expr::col(CouponCol::UsageCount).add(1),
        )
        .filter(CouponCol::Id.eq(coupon_id))
        .filter(
            Condition::any()
                .add(CouponCol::UsageLimit.is_null())
                .add(Expr::col(CouponCol::UsageCount).lt(Expr::col(CouponCol::UsageLimit))),
        )
        .exec(conn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(AppError::Validation(
            "this coupon has reached its usage limit".into(),
        ));
    }

    if let Some(user_id) = user_id {
        let bumped = UserCoupons::update_many()
            .col_expr(
                UserCouponCol::UsedCount,
                Expr::col(UserCouponCol::UsedCount).add(1),
            )
            .filter(
                Condition::all()
                    .add(UserCouponCol::CouponId.eq(coupon_id))
                    .add(UserCouponCol::UserId.eq(user_id)),
            )
            .exec(conn)
            .await?;
        if bumped.rows_affected == 0 {
            UserCouponActive {
                id: Set(Uuid::new_v4()),
                coupon_id: Set(coupon_id),
                user_id: Set(user_id),
                used_count: Set(1),
            }
            .insert(conn)
            .await?;
        }
    }

    Ok(())
}

fn validate_discount(discount_type: DiscountType, value: i64) -> AppResult<()> {
    if value <= 0 {
        return Err(AppError::Validation(
            "discount value must be positive".into(),
        ));
    }
    if discount_type == DiscountType::Percentage && value > 100 {
        return Err(AppError::Validation(
            "percentage discount cannot exceed 100".into(),
        ));
    }
    Ok(())
}

pub(crate) fn rules_from_entity(model: &CouponModel) -> CouponRules {
    CouponRules {
        is_active: model.is_active,
        valid_from: model.valid_from.with_timezone(&Utc),
        valid_until: model.valid_until.with_timezone(&Utc),
        discount: DiscountRule {
            discount_type: model.discount_type,
            value: model.value,
            minimum_order_amount: model.minimum_order_amount,
            maximum_discount_amount: model.maximum_discount_amount,
        },
        usage_limit: model.usage_limit,
        usage_count: model.usage_count,
        user_usage_limit: model.user_usage_limit,
        allowed_users: uuid_list(model.allowed_users.as_ref()),
        excluded_users: uuid_list(model.excluded_users.as_ref()),
        applicable_products: uuid_list(model.applicable_products.as_ref()),
        excluded_products: uuid_list(model.excluded_products.as_ref()),
    }
}

pub(crate) fn coupon_from_entity(model: CouponModel) -> Coupon {
    let allowed_users = uuid_list(model.allowed_users.as_ref());
    let excluded_users = uuid_list(model.excluded_users.as_ref());
    let applicable_products = uuid_list(model.applicable_products.as_ref());
    let excluded_products = uuid_list(model.excluded_products.as_ref());
    Coupon {
        id: model.id,
        code: model.code,
        discount_type: model.discount_type,
        value: model.value,
        minimum_order_amount: model.minimum_order_amount,
        maximum_discount_amount: model.maximum_discount_amount,
        usage_limit: model.usage_limit,
        user_usage_limit: model.user_usage_limit,
        usage_count: model.usage_count,
        valid_from: model.valid_from.with_timezone(&Utc),
        valid_until: model.valid_until.with_timezone(&Utc),
        allowed_users,
        excluded_users,
        applicable_products,
        excluded_products,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn uuid_list(value: Option<&serde_json::Value>) -> Vec<Uuid> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}
