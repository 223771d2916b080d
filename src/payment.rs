use async_trait::async_trait;
use uuid::Uuid;

/// Payment collaborator. Signature cryptography belongs to the gateway SDK;
/// this service only records the verified outcome on the order.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register the order with the gateway; returns the gateway's order id.
    async fn create_gateway_order(&self, order_id: Uuid, amount: i64) -> anyhow::Result<String>;

    /// Whether the gateway accepts the (payment id, signature) pair for the
    /// given gateway order.
    async fn verify_payment(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> anyhow::Result<bool>;
}

/// Development stand-in that only checks reference formats. A deployment
/// wires the real gateway SDK in behind the trait.
#[derive(Debug, Clone, Default)]
pub struct DevGateway;

#[async_trait]
impl PaymentGateway for DevGateway {
    async fn create_gateway_order(&self, order_id: Uuid, _amount: i64) -> anyhow::Result<String> {
        Ok(format!("gw_{}", order_id.simple()))
    }

    async fn verify_payment(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> anyhow::Result<bool> {
        Ok(gateway_order_id.starts_with("gw_") && !payment_id.is_empty() && !signature.is_empty())
    }
}
