use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Address, Order, OrderItem, OrderStatus, PaymentMethod, ShippingMethod};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub phone: String,
    pub shipping_address: Address,
    /// Defaults to the shipping address when omitted.
    pub billing_address: Option<Address>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GuestCheckoutRequest {
    pub email: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackOrderQuery {
    pub confirmation_number: String,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GuestCancelRequest {
    pub confirmation_number: String,
    pub email: String,
    pub phone: String,
}

/// Checkout result; online-payment orders also carry the gateway reference
/// the client completes payment against.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub gateway_order_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// Cancellation outcome; prepaid orders carry the external refund note.
#[derive(Debug, Serialize, ToSchema)]
pub struct CancellationOutcome {
    pub order: Order,
    pub refund_note: Option<String>,
}
