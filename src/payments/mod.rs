use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod stripe;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment request failed")]
    Request(#[from] reqwest::Error),

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    #[error("malformed webhook event: {0}")]
    Malformed(String),

    #[error("payment gateway rejected the request: {0}")]
    Gateway(String),
}

/// One line of a hosted checkout page. `unit_amount` is in minor units.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub name: String,
    pub image_url: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct HostedSessionRequest {
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Carried as opaque metadata and echoed back in webhook events.
    pub order_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

/// A verified, decoded notification from the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Completed {
        order_id: Uuid,
        user_id: Option<Uuid>,
    },
    Failed {
        order_id: Uuid,
    },
    /// Recognized delivery, uninteresting kind. Logged and acknowledged.
    Ignored {
        kind: String,
    },
}

/// Narrow contract over the external payment collaborator. The rest of the
/// crate never talks to the processor's API directly.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_hosted_session(
        &self,
        req: &HostedSessionRequest,
    ) -> Result<HostedSession, PaymentError>;

    /// Verify the event signature and decode the payload. Called before any
    /// order mutation; an invalid signature never reaches the reconciler.
    fn parse_event(&self, payload: &[u8], signature_header: &str)
    -> Result<PaymentEvent, PaymentError>;
}
