use thiserror::Error;
use uuid::Uuid;

use crate::entity::orders::OrderStatus;

#[derive(Debug, Clone, Copy)]
pub enum CancelRequester<'a> {
    Customer(Uuid),
    Guest { email: &'a str, phone: &'a str },
}

/// The slice of an order the cancellation rules look at.
#[derive(Debug, Clone, Copy)]
pub struct CancellationView<'a> {
    pub status: OrderStatus,
    pub customer_id: Option<Uuid>,
    pub is_guest: bool,
    pub email: &'a str,
    pub phone: &'a str,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CancellationError {
    #[error("order can no longer be cancelled once it is {0}")]
    NotCancellable(OrderStatus),
    #[error("this order does not belong to you")]
    NotYourOrder,
    #[error("the provided contact details do not match this order")]
    GuestCredentialsMismatch,
}

/// Ownership is verified before status, so a foreign order always yields an
/// ownership error and never leaks its fulfilment state.
pub fn check_cancellable(
    order: &CancellationView<'_>,
    requester: &CancelRequester<'_>,
) -> Result<(), CancellationError> {
    match requester {
        CancelRequester::Customer(user_id) => {
            // Guest-placed orders stay on the track-order path even if the
            // contact email later matches a registered account.
            if order.is_guest || order.customer_id != Some(*user_id) {
                return Err(CancellationError::NotYourOrder);
            }
        }
        CancelRequester::Guest { email, phone } => {
            if !order.is_guest {
                return Err(CancellationError::NotYourOrder);
            }
            let email_ok = order.email.eq_ignore_ascii_case(email.trim());
            let phone_ok = normalize_phone(order.phone) == normalize_phone(phone);
            if !email_ok || !phone_ok {
                return Err(CancellationError::GuestCredentialsMismatch);
            }
        }
    }

    match order.status {
        OrderStatus::Pending | OrderStatus::Processing => Ok(()),
        other => Err(CancellationError::NotCancellable(other)),
    }
}

fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
