use jewelry_store_api::rules::pricing::{
    CartLine, FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, cart_totals, tax_amount,
};

fn line(quantity: i32, unit_price: i64) -> CartLine {
    CartLine {
        quantity,
        unit_price,
    }
}

#[test]
fn small_cart_pays_flat_shipping_and_tax() {
    // 2 x 500.00 => subtotal 1000.00, tax 180.00, shipping 100.00
    let totals = cart_totals(&[line(2, 500_00)], 0);
    assert_eq!(totals.subtotal, 1_000_00);
    assert_eq!(totals.tax, 180_00);
    assert_eq!(totals.shipping, FLAT_SHIPPING_FEE);
    assert_eq!(totals.total, 1_280_00);
}

#[test]
fn orders_above_threshold_ship_free() {
    let totals = cart_totals(&[line(1, 2_500_00)], 0);
    assert_eq!(totals.shipping, 0);
    assert_eq!(totals.total, totals.subtotal + totals.tax);
}

#[test]
fn threshold_is_strictly_greater_than() {
    // Exactly at the threshold still pays the flat fee.
    let totals = cart_totals(&[line(1, FREE_SHIPPING_THRESHOLD)], 0);
    assert_eq!(totals.shipping, FLAT_SHIPPING_FEE);
}

#[test]
fn totals_are_recomputed_from_lines_not_accumulated() {
    let before = cart_totals(&[line(2, 500_00), line(1, 300_00)], 0);
    assert_eq!(before.subtotal, 1_300_00);

    // Dropping a line and recomputing gives exactly the smaller cart's totals.
    let after = cart_totals(&[line(2, 500_00)], 0);
    assert_eq!(after.subtotal, 1_000_00);
    assert_eq!(after, cart_totals(&[line(2, 500_00)], 0));
}

#[test]
fn oversized_discount_floors_total_at_zero() {
    let totals = cart_totals(&[line(1, 100_00)], 10_000_00);
    assert_eq!(totals.total, 0);
}

#[test]
fn negative_discount_is_ignored() {
    let totals = cart_totals(&[line(1, 100_00)], -50_00);
    assert_eq!(totals.discount, 0);
    assert_eq!(totals.total, totals.subtotal + totals.tax + totals.shipping);
}

#[test]
fn tax_rounds_half_up_to_a_minor_unit() {
    // 18% of 3 minor units is 0.54, which rounds up.
    assert_eq!(tax_amount(3), 1);
    // 18% of 2 minor units is 0.36, which rounds down.
    assert_eq!(tax_amount(2), 0);
    assert_eq!(tax_amount(1_000_00), 180_00);
}
