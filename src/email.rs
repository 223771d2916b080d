use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::orders::OrderStatus;

#[derive(Debug, Clone)]
pub struct OrderStatusEmail {
    pub to: String,
    pub order_id: Uuid,
    pub confirmation_number: String,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

/// Outbound mail collaborator. Sends are fire-and-forget: callers log a
/// warning on failure and keep going, a lost email never rolls back an order.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_order_status_update(&self, message: OrderStatusEmail) -> anyhow::Result<()>;
}

/// Default mailer: writes the notification to the log. Deployments swap a
/// real transport in behind the same trait.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_order_status_update(&self, message: OrderStatusEmail) -> anyhow::Result<()> {
        tracing::info!(
            to = %message.to,
            order_id = %message.order_id,
            confirmation = %message.confirmation_number,
            status = %message.status,
            tracking = message.tracking_number.as_deref().unwrap_or("-"),
            "order status update email"
        );
        Ok(())
    }
}

/// Captures sent messages for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<OrderStatusEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_order_status_update(&self, message: OrderStatusEmail) -> anyhow::Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("mailer mutex poisoned"))?
            .push(message);
        Ok(())
    }
}
