use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::coupons::DiscountType;

/// One distinct variant per failing rule so callers (and tests) can tell
/// exactly why a code was refused. The `Display` strings are user-facing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("this coupon is not active")]
    Inactive,
    #[error("this coupon is not valid yet")]
    NotStarted,
    #[error("this coupon has expired")]
    Expired,
    #[error("order subtotal is below the coupon minimum of {required}")]
    MinimumNotMet { required: i64 },
    #[error("this coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("this coupon is not available for your account")]
    UserNotAllowed,
    #[error("this coupon cannot be used by your account")]
    UserExcluded,
    #[error("this coupon does not apply to any item in your cart")]
    NotApplicableToCart,
    #[error("your cart contains an item this coupon excludes")]
    ExcludedProductInCart,
    #[error("you have already used this coupon the maximum number of times")]
    UserLimitReached,
}

#[derive(Debug, Clone)]
pub struct DiscountRule {
    pub discount_type: DiscountType,
    pub value: i64,
    pub minimum_order_amount: Option<i64>,
    pub maximum_discount_amount: Option<i64>,
}

/// Compute the discount a rule grants against a subtotal. For percentage
/// coupons `value` is an integer percent, clamped to the optional cap; fixed
/// coupons never discount more than the subtotal itself.
pub fn discount_amount(subtotal: i64, rule: &DiscountRule) -> Result<i64, CouponRejection> {
    if let Some(required) = rule.minimum_order_amount {
        if subtotal < required {
            return Err(CouponRejection::MinimumNotMet { required });
        }
    }
    let raw = match rule.discount_type {
        DiscountType::Percentage => {
            let pct = subtotal * rule.value / 100;
            rule.maximum_discount_amount
                .map_or(pct, |cap| pct.min(cap))
        }
        DiscountType::FixedAmount => rule.value,
    };
    Ok(raw.clamp(0, subtotal))
}

/// Everything the eligibility rules need, decoupled from the stored record.
#[derive(Debug, Clone)]
pub struct CouponRules {
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub discount: DiscountRule,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub user_usage_limit: Option<i32>,
    pub allowed_users: Vec<Uuid>,
    pub excluded_users: Vec<Uuid>,
    pub applicable_products: Vec<Uuid>,
    pub excluded_products: Vec<Uuid>,
}

/// Run every eligibility rule; on success returns the discount amount.
/// `user_usage` is the requesting user's recorded redemption count for this
/// coupon. Guests pass `user_id = None` and fail any non-empty allow list.
pub fn check_coupon(
    coupon: &CouponRules,
    user_id: Option<Uuid>,
    subtotal: i64,
    cart_products: &[Uuid],
    user_usage: i32,
    now: DateTime<Utc>,
) -> Result<i64, CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if now < coupon.valid_from {
        return Err(CouponRejection::NotStarted);
    }
    if now > coupon.valid_until {
        return Err(CouponRejection::Expired);
    }
    if let Some(required) = coupon.discount.minimum_order_amount {
        if subtotal < required {
            return Err(CouponRejection::MinimumNotMet { required });
        }
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Err(CouponRejection::UsageLimitReached);
        }
    }
    if !coupon.allowed_users.is_empty() {
        match user_id {
            Some(user) if coupon.allowed_users.contains(&user) => {}
            _ => return Err(CouponRejection::UserNotAllowed),
        }
    }
    if let Some(user) = user_id {
        if coupon.excluded_users.contains(&user) {
            return Err(CouponRejection::UserExcluded);
        }
    }
    if !coupon.applicable_products.is_empty()
        && !cart_products
            .iter()
            .any(|p| coupon.applicable_products.contains(p))
    {
        return Err(CouponRejection::NotApplicableToCart);
    }
    if cart_products
        .iter()
        .any(|p| coupon.excluded_products.contains(p))
    {
        return Err(CouponRejection::ExcludedProductInCart);
    }
    if let Some(limit) = coupon.user_usage_limit {
        if user_usage >= limit {
            return Err(CouponRejection::UserLimitReached);
        }
    }
    discount_amount(subtotal, &coupon.discount)
}
