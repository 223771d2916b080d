use chrono::{Datelike, Days, NaiveDate, Weekday};
use thiserror::Error;

use crate::entity::orders::{OrderStatus, ShippingMethod};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    Customer,
    Admin,
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Actor::Customer => "customer",
            Actor::Admin => "admin",
            Actor::System => "system",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    Invalid { from: OrderStatus, to: OrderStatus },
    #[error("{actor} may not move an order from {from} to {to}")]
    NotPermitted {
        actor: Actor,
        from: OrderStatus,
        to: OrderStatus,
    },
    #[error("a tracking number is required to mark an order shipped")]
    TrackingRequired,
    #[error("the estimated delivery date has not passed yet")]
    DeliveryNotDue,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest<'a> {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor: Actor,
    pub tracking_number: Option<&'a str>,
    pub estimated_delivery: Option<NaiveDate>,
    pub today: NaiveDate,
}

/// The full transition table. `refunded` has no inbound edge here; it is set
/// by payment recording, never by this engine.
pub fn validate_transition(req: &TransitionRequest<'_>) -> Result<(), TransitionError> {
    use OrderStatus::*;

    let allowed: &[Actor] = match (req.from, req.to) {
        (Pending, Processing) => &[Actor::System],
        (Pending, Cancelled) => &[Actor::Customer],
        (Processing, Shipped) => &[Actor::Admin],
        (Processing, Cancelled) => &[Actor::Admin],
        (Shipped, Delivered) => &[Actor::Admin, Actor::System],
        (from, to) => return Err(TransitionError::Invalid { from, to }),
    };

    if !allowed.contains(&req.actor) {
        return Err(TransitionError::NotPermitted {
            actor: req.actor,
            from: req.from,
            to: req.to,
        });
    }

    if (req.from, req.to) == (Processing, Shipped)
        && req.tracking_number.is_none_or(|t| t.trim().is_empty())
    {
        return Err(TransitionError::TrackingRequired);
    }

    // The system may only auto-deliver once the estimate has passed.
    if (req.from, req.to) == (Shipped, Delivered)
        && req.actor == Actor::System
        && !req.estimated_delivery.is_some_and(|d| d <= req.today)
    {
        return Err(TransitionError::DeliveryNotDue);
    }

    Ok(())
}

/// State/union-territory names that get two extra business days of transit.
const REMOTE_REGIONS: &[&str] = &[
    "andaman and nicobar islands",
    "arunachal pradesh",
    "himachal pradesh",
    "jammu and kashmir",
    "ladakh",
    "lakshadweep",
    "manipur",
    "meghalaya",
    "mizoram",
    "nagaland",
    "sikkim",
    "tripura",
];

pub fn is_remote_region(state: &str) -> bool {
    let normalized = state.trim().to_lowercase();
    REMOTE_REGIONS.contains(&normalized.as_str())
}

/// Estimated delivery date for an order shipped on `shipped_on`: the method's
/// base transit time plus two business days for remote regions. Business days
/// skip Saturday and Sunday; there is no holiday calendar.
pub fn estimate_delivery(shipped_on: NaiveDate, method: ShippingMethod, remote: bool) -> NaiveDate {
    let days = method.transit_business_days() + if remote { 2 } else { 0 };
    add_business_days(shipped_on, days)
}

fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
    let mut date = start;
    let mut remaining = days;
    while remaining > 0 {
        date = match date.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    date
}
