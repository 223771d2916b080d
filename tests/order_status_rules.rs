use chrono::NaiveDate;

use jewelry_store_api::models::{OrderStatus, ShippingMethod};
use jewelry_store_api::rules::status::{
    Actor, TransitionError, TransitionRequest, estimate_delivery, is_remote_region,
    validate_transition,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn request(from: OrderStatus, to: OrderStatus, actor: Actor) -> TransitionRequest<'static> {
    TransitionRequest {
        from,
        to,
        actor,
        tracking_number: None,
        estimated_delivery: None,
        today: date(2026, 1, 5),
    }
}

#[test]
fn pending_cannot_jump_straight_to_shipped() {
    let err = validate_transition(&request(
        OrderStatus::Pending,
        OrderStatus::Shipped,
        Actor::Admin,
    ))
    .unwrap_err();
    assert_eq!(
        err,
        TransitionError::Invalid {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped
        }
    );
    assert_eq!(err.to_string(), "invalid transition from pending to shipped");
}

#[test]
fn shipping_requires_a_tracking_number() {
    let mut req = request(OrderStatus::Processing, OrderStatus::Shipped, Actor::Admin);
    assert_eq!(
        validate_transition(&req),
        Err(TransitionError::TrackingRequired)
    );

    req.tracking_number = Some("   ");
    assert_eq!(
        validate_transition(&req),
        Err(TransitionError::TrackingRequired)
    );

    req.tracking_number = Some("TRK-12345");
    assert!(validate_transition(&req).is_ok());
}

#[test]
fn only_the_system_confirms_pending_orders() {
    assert!(
        validate_transition(&request(
            OrderStatus::Pending,
            OrderStatus::Processing,
            Actor::System
        ))
        .is_ok()
    );
    assert!(matches!(
        validate_transition(&request(
            OrderStatus::Pending,
            OrderStatus::Processing,
            Actor::Admin
        )),
        Err(TransitionError::NotPermitted { .. })
    ));
}

#[test]
fn pending_cancellation_belongs_to_the_customer() {
    assert!(
        validate_transition(&request(
            OrderStatus::Pending,
            OrderStatus::Cancelled,
            Actor::Customer
        ))
        .is_ok()
    );
    assert!(matches!(
        validate_transition(&request(
            OrderStatus::Pending,
            OrderStatus::Cancelled,
            Actor::Admin
        )),
        Err(TransitionError::NotPermitted { .. })
    ));
}

#[test]
fn processing_cancellation_belongs_to_the_admin() {
    assert!(
        validate_transition(&request(
            OrderStatus::Processing,
            OrderStatus::Cancelled,
            Actor::Admin
        ))
        .is_ok()
    );
    assert!(matches!(
        validate_transition(&request(
            OrderStatus::Processing,
            OrderStatus::Cancelled,
            Actor::Customer
        )),
        Err(TransitionError::NotPermitted { .. })
    ));
}

#[test]
fn admin_may_deliver_without_a_due_estimate() {
    let req = request(OrderStatus::Shipped, OrderStatus::Delivered, Actor::Admin);
    assert!(validate_transition(&req).is_ok());
}

#[test]
fn system_delivery_waits_for_the_estimate_to_pass() {
    let mut req = request(OrderStatus::Shipped, OrderStatus::Delivered, Actor::System);
    assert_eq!(
        validate_transition(&req),
        Err(TransitionError::DeliveryNotDue)
    );

    req.estimated_delivery = Some(date(2026, 1, 6));
    assert_eq!(
        validate_transition(&req),
        Err(TransitionError::DeliveryNotDue)
    );

    req.estimated_delivery = Some(date(2026, 1, 5));
    assert!(validate_transition(&req).is_ok());
}

#[test]
fn terminal_states_have_no_outbound_transitions() {
    for from in [
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ] {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            if from == to {
                continue;
            }
            assert!(matches!(
                validate_transition(&request(from, to, Actor::Admin)),
                Err(TransitionError::Invalid { .. })
            ));
        }
    }
}

#[test]
fn nothing_transitions_into_refunded_here() {
    for from in [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        for actor in [Actor::Customer, Actor::Admin, Actor::System] {
            assert!(matches!(
                validate_transition(&request(from, OrderStatus::Refunded, actor)),
                Err(TransitionError::Invalid { .. })
            ));
        }
    }
}

#[test]
fn overnight_shipping_skips_the_weekend() {
    // Friday 2026-01-02 + 1 business day lands on Monday.
    let estimate = estimate_delivery(date(2026, 1, 2), ShippingMethod::Overnight, false);
    assert_eq!(estimate, date(2026, 1, 5));
}

#[test]
fn standard_shipping_counts_seven_business_days() {
    // Monday 2026-01-05: 6,7,8,9 then 12,13,14.
    let estimate = estimate_delivery(date(2026, 1, 5), ShippingMethod::Standard, false);
    assert_eq!(estimate, date(2026, 1, 14));
}

#[test]
fn remote_regions_add_two_business_days() {
    // Express from Monday: 3 + 2 business days => 6,7,8,9,12.
    let estimate = estimate_delivery(date(2026, 1, 5), ShippingMethod::Express, true);
    assert_eq!(estimate, date(2026, 1, 12));
}

#[test]
fn remote_region_lookup_is_case_insensitive() {
    assert!(is_remote_region("Sikkim"));
    assert!(is_remote_region("  LADAKH "));
    assert!(!is_remote_region("Maharashtra"));
}
