use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use jewelry_store_api::models::DiscountType;
use jewelry_store_api::rules::coupons::{
    CouponRejection, CouponRules, DiscountRule, check_coupon, discount_amount,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn percentage(value: i64, cap: Option<i64>) -> DiscountRule {
    DiscountRule {
        discount_type: DiscountType::Percentage,
        value,
        minimum_order_amount: None,
        maximum_discount_amount: cap,
    }
}

fn fixed(value: i64) -> DiscountRule {
    DiscountRule {
        discount_type: DiscountType::FixedAmount,
        value,
        minimum_order_amount: None,
        maximum_discount_amount: None,
    }
}

fn open_coupon(discount: DiscountRule) -> CouponRules {
    CouponRules {
        is_active: true,
        valid_from: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        valid_until: Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap(),
        discount,
        usage_limit: None,
        usage_count: 0,
        user_usage_limit: None,
        allowed_users: vec![],
        excluded_users: vec![],
        applicable_products: vec![],
        excluded_products: vec![],
    }
}

#[test]
fn fixed_discount_never_exceeds_subtotal() {
    assert_eq!(discount_amount(50_00, &fixed(100_00)), Ok(50_00));
    assert_eq!(discount_amount(200_00, &fixed(100_00)), Ok(100_00));
}

#[test]
fn percentage_discount_is_clamped_to_the_cap() {
    // 20% of 10000.00 would be 2000.00; the cap keeps it at 500.00.
    assert_eq!(discount_amount(10_000_00, &percentage(20, Some(500_00))), Ok(500_00));
    assert_eq!(discount_amount(1_000_00, &percentage(20, Some(500_00))), Ok(200_00));
    assert_eq!(discount_amount(1_000_00, &percentage(10, None)), Ok(100_00));
}

#[test]
fn subtotal_below_minimum_is_rejected_with_the_required_amount() {
    let rule = DiscountRule {
        minimum_order_amount: Some(500_00),
        ..fixed(50_00)
    };
    assert_eq!(
        discount_amount(400_00, &rule),
        Err(CouponRejection::MinimumNotMet { required: 500_00 })
    );
}

#[test]
fn inactive_coupon_is_rejected() {
    let mut coupon = open_coupon(fixed(50_00));
    coupon.is_active = false;
    let err = check_coupon(&coupon, None, 1_000_00, &[], 0, now()).unwrap_err();
    assert_eq!(err, CouponRejection::Inactive);
}

#[test]
fn validity_window_is_enforced_on_both_ends() {
    let coupon = open_coupon(fixed(50_00));

    let before = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
    assert_eq!(
        check_coupon(&coupon, None, 1_000_00, &[], 0, before),
        Err(CouponRejection::NotStarted)
    );

    let after = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(
        check_coupon(&coupon, None, 1_000_00, &[], 0, after),
        Err(CouponRejection::Expired)
    );
}

#[test]
fn exhausted_global_usage_is_always_rejected() {
    let mut coupon = open_coupon(fixed(50_00));
    coupon.usage_limit = Some(1);
    coupon.usage_count = 1;
    let err = check_coupon(&coupon, Some(Uuid::new_v4()), 1_000_00, &[], 0, now()).unwrap_err();
    assert_eq!(err, CouponRejection::UsageLimitReached);
}

#[test]
fn allow_list_requires_membership_and_guests_never_qualify() {
    let member = Uuid::new_v4();
    let mut coupon = open_coupon(fixed(50_00));
    coupon.allowed_users = vec![member];

    assert!(check_coupon(&coupon, Some(member), 1_000_00, &[], 0, now()).is_ok());
    assert_eq!(
        check_coupon(&coupon, Some(Uuid::new_v4()), 1_000_00, &[], 0, now()),
        Err(CouponRejection::UserNotAllowed)
    );
    assert_eq!(
        check_coupon(&coupon, None, 1_000_00, &[], 0, now()),
        Err(CouponRejection::UserNotAllowed)
    );
}

#[test]
fn deny_listed_user_is_rejected() {
    let banned = Uuid::new_v4();
    let mut coupon = open_coupon(fixed(50_00));
    coupon.excluded_users = vec![banned];

    assert_eq!(
        check_coupon(&coupon, Some(banned), 1_000_00, &[], 0, now()),
        Err(CouponRejection::UserExcluded)
    );
    assert!(check_coupon(&coupon, Some(Uuid::new_v4()), 1_000_00, &[], 0, now()).is_ok());
}

#[test]
fn product_scoped_coupon_needs_a_matching_cart_item() {
    let ring = Uuid::new_v4();
    let chain = Uuid::new_v4();
    let mut coupon = open_coupon(fixed(50_00));
    coupon.applicable_products = vec![ring];

    assert!(check_coupon(&coupon, None, 1_000_00, &[ring, chain], 0, now()).is_ok());
    assert_eq!(
        check_coupon(&coupon, None, 1_000_00, &[chain], 0, now()),
        Err(CouponRejection::NotApplicableToCart)
    );
}

#[test]
fn excluded_product_in_cart_blocks_the_coupon() {
    let clearance = Uuid::new_v4();
    let mut coupon = open_coupon(fixed(50_00));
    coupon.excluded_products = vec![clearance];

    assert_eq!(
        check_coupon(&coupon, None, 1_000_00, &[clearance], 0, now()),
        Err(CouponRejection::ExcludedProductInCart)
    );
}

#[test]
fn per_user_limit_is_enforced() {
    let user = Uuid::new_v4();
    let mut coupon = open_coupon(fixed(50_00));
    coupon.user_usage_limit = Some(2);

    assert!(check_coupon(&coupon, Some(user), 1_000_00, &[], 1, now()).is_ok());
    assert_eq!(
        check_coupon(&coupon, Some(user), 1_000_00, &[], 2, now()),
        Err(CouponRejection::UserLimitReached)
    );
}

#[test]
fn rejection_reasons_are_distinct_strings() {
    let reasons = [
        CouponRejection::Inactive.to_string(),
        CouponRejection::NotStarted.to_string(),
        CouponRejection::Expired.to_string(),
        CouponRejection::MinimumNotMet { required: 1 }.to_string(),
        CouponRejection::UsageLimitReached.to_string(),
        CouponRejection::UserNotAllowed.to_string(),
        CouponRejection::UserExcluded.to_string(),
        CouponRejection::NotApplicableToCart.to_string(),
        CouponRejection::ExcludedProductInCart.to_string(),
        CouponRejection::UserLimitReached.to_string(),
    ];
    for (i, a) in reasons.iter().enumerate() {
        for b in reasons.iter().skip(i + 1) {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn successful_check_returns_the_discount() {
    let coupon = open_coupon(percentage(20, Some(500_00)));
    let discount = check_coupon(&coupon, None, 10_000_00, &[], 0, now()).unwrap();
    assert_eq!(discount, 500_00);
}
