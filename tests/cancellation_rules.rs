use uuid::Uuid;

use jewelry_store_api::models::OrderStatus;
use jewelry_store_api::rules::cancellation::{
    CancelRequester, CancellationError, CancellationView, check_cancellable,
};

fn customer_order(status: OrderStatus, customer_id: Uuid) -> CancellationView<'static> {
    CancellationView {
        status,
        customer_id: Some(customer_id),
        is_guest: false,
        email: "customer@example.com",
        phone: "9876543210",
    }
}

fn guest_order(status: OrderStatus) -> CancellationView<'static> {
    CancellationView {
        status,
        customer_id: None,
        is_guest: true,
        email: "guest@example.com",
        phone: "98765 43210",
    }
}

#[test]
fn owner_cancels_pending_and_processing_orders() {
    let owner = Uuid::new_v4();
    for status in [OrderStatus::Pending, OrderStatus::Processing] {
        assert!(
            check_cancellable(
                &customer_order(status, owner),
                &CancelRequester::Customer(owner)
            )
            .is_ok()
        );
    }
}

#[test]
fn shipped_orders_are_never_cancellable() {
    let owner = Uuid::new_v4();
    let err = check_cancellable(
        &customer_order(OrderStatus::Shipped, owner),
        &CancelRequester::Customer(owner),
    )
    .unwrap_err();
    assert_eq!(err, CancellationError::NotCancellable(OrderStatus::Shipped));
}

#[test]
fn terminal_states_are_never_cancellable() {
    let owner = Uuid::new_v4();
    for status in [
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ] {
        assert_eq!(
            check_cancellable(
                &customer_order(status, owner),
                &CancelRequester::Customer(owner)
            ),
            Err(CancellationError::NotCancellable(status))
        );
    }
}

#[test]
fn foreign_order_fails_ownership_before_status() {
    // A pending order that belongs to someone else must produce an ownership
    // error, not a status error.
    let err = check_cancellable(
        &customer_order(OrderStatus::Pending, Uuid::new_v4()),
        &CancelRequester::Customer(Uuid::new_v4()),
    )
    .unwrap_err();
    assert_eq!(err, CancellationError::NotYourOrder);
}

#[test]
fn guest_placed_orders_stay_on_the_guest_path() {
    // Even a signed-in customer cannot cancel a guest order through the
    // account path.
    let err = check_cancellable(
        &guest_order(OrderStatus::Pending),
        &CancelRequester::Customer(Uuid::new_v4()),
    )
    .unwrap_err();
    assert_eq!(err, CancellationError::NotYourOrder);
}

#[test]
fn guests_cannot_touch_account_orders() {
    let err = check_cancellable(
        &customer_order(OrderStatus::Pending, Uuid::new_v4()),
        &CancelRequester::Guest {
            email: "customer@example.com",
            phone: "9876543210",
        },
    )
    .unwrap_err();
    assert_eq!(err, CancellationError::NotYourOrder);
}

#[test]
fn guest_credentials_must_match_both_email_and_phone() {
    let order = guest_order(OrderStatus::Pending);

    let wrong_phone = CancelRequester::Guest {
        email: "guest@example.com",
        phone: "1112223334",
    };
    assert_eq!(
        check_cancellable(&order, &wrong_phone),
        Err(CancellationError::GuestCredentialsMismatch)
    );

    let wrong_email = CancelRequester::Guest {
        email: "other@example.com",
        phone: "9876543210",
    };
    assert_eq!(
        check_cancellable(&order, &wrong_email),
        Err(CancellationError::GuestCredentialsMismatch)
    );
}

#[test]
fn guest_match_ignores_case_and_phone_formatting() {
    let order = guest_order(OrderStatus::Pending);
    let requester = CancelRequester::Guest {
        email: "Guest@Example.com",
        phone: "98765-43210",
    };
    assert!(check_cancellable(&order, &requester).is_ok());
}
