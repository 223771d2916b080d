use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Coupon, DiscountType},
    rules::pricing::CartTotals,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub minimum_order_amount: Option<i64>,
    pub maximum_discount_amount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub user_usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub allowed_users: Option<Vec<Uuid>>,
    pub excluded_users: Option<Vec<Uuid>>,
    pub applicable_products: Option<Vec<Uuid>>,
    pub excluded_products: Option<Vec<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub value: Option<i64>,
    pub minimum_order_amount: Option<i64>,
    pub maximum_discount_amount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub user_usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub allowed_users: Option<Vec<Uuid>>,
    pub excluded_users: Option<Vec<Uuid>>,
    pub applicable_products: Option<Vec<Uuid>>,
    pub excluded_products: Option<Vec<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
}

/// Preview of what a coupon would do to the current cart.
#[derive(Debug, Serialize, ToSchema)]
pub struct CouponPreview {
    pub code: String,
    pub discount: i64,
    pub totals: CartTotals,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponList {
    pub items: Vec<Coupon>,
}
