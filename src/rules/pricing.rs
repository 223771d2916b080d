use serde::Serialize;
use utoipa::ToSchema;

/// All amounts are integer minor units (1 rupee = 100 minor units).
pub const TAX_RATE_PERCENT: i64 = 18;
/// Orders strictly above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 2_000_00;
pub const FLAT_SHIPPING_FEE: i64 = 100_00;

#[derive(Debug, Clone, Copy)]
pub struct CartLine {
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub shipping: i64,
    pub discount: i64,
    pub total: i64,
}

/// Derive all totals from the current line items. Callers must never patch
/// individual fields of a stored total; any cart mutation recomputes here.
pub fn cart_totals(lines: &[CartLine], discount: i64) -> CartTotals {
    let subtotal: i64 = lines
        .iter()
        .map(|line| line.unit_price * i64::from(line.quantity))
        .sum();
    let tax = tax_amount(subtotal);
    let shipping = shipping_fee(subtotal);
    // The discount calculator already caps discounts at the subtotal; even if
    // a caller hands in something larger, the total floors at zero.
    let discount = discount.max(0);
    let total = (subtotal + tax + shipping - discount).max(0);
    CartTotals {
        subtotal,
        tax,
        shipping,
        discount,
        total,
    }
}

/// Fixed 18% rate, rounded half-up to a minor unit.
pub fn tax_amount(subtotal: i64) -> i64 {
    (subtotal * TAX_RATE_PERCENT + 50) / 100
}

pub fn shipping_fee(subtotal: i64) -> i64 {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    }
}
