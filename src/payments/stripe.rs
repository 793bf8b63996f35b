//! Stripe integration via REST API (no SDK dependency).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use super::{
    HostedSession, HostedSessionRequest, PaymentError, PaymentEvent, PaymentGateway,
};

const COMPLETED_EVENT: &str = "checkout.session.completed";
const FAILED_EVENT: &str = "payment_intent.payment_failed";

/// Maximum webhook age before a delivery is treated as a replay.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify a `Stripe-Signature` header: HMAC-SHA256 over `"{t}.{payload}"`
    /// with constant-time comparison, then a freshness check.
    fn verify_signature(&self, payload: &[u8], sig_header: &str) -> Result<(), PaymentError> {
        if self.webhook_secret.is_empty() {
            return Err(PaymentError::InvalidSignature("webhook secret not configured"));
        }

        let mut timestamp = "";
        let mut signature = "";
        for part in sig_header.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = t;
            } else if let Some(v) = part.strip_prefix("v1=") {
                signature = v;
            }
        }
        if timestamp.is_empty() || signature.is_empty() {
            return Err(PaymentError::InvalidSignature("missing t= or v1= component"));
        }

        let signed_payload = format!(
            "{timestamp}.{}",
            std::str::from_utf8(payload)
                .map_err(|_| PaymentError::InvalidSignature("payload is not utf-8"))?
        );
        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| PaymentError::InvalidSignature("hmac key error"))?;
        mac.update(signed_payload.as_bytes());

        let sig_bytes = hex::decode(signature)
            .map_err(|_| PaymentError::InvalidSignature("signature is not hex"))?;
        mac.verify_slice(&sig_bytes)
            .map_err(|_| PaymentError::InvalidSignature("signature mismatch"))?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| PaymentError::InvalidSignature("invalid timestamp"))?;
        let now = chrono::Utc::now().timestamp();
        if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(PaymentError::InvalidSignature("timestamp outside tolerance"));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_hosted_session(
        &self,
        req: &HostedSessionRequest,
    ) -> Result<HostedSession, PaymentError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("success_url".into(), req.success_url.clone()),
            ("cancel_url".into(), req.cancel_url.clone()),
            ("metadata[order_id]".into(), req.order_id.to_string()),
            ("metadata[user_id]".into(), req.user_id.to_string()),
        ];
        for (i, item) in req.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                "usd".into(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            if !item.image_url.is_empty() {
                form.push((
                    format!("line_items[{i}][price_data][product_data][images][0]"),
                    item.image_url.clone(),
                ));
            }
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        let resp: serde_json::Value = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        match (resp["id"].as_str(), resp["url"].as_str()) {
            (Some(id), Some(url)) => Ok(HostedSession {
                id: id.to_string(),
                url: url.to_string(),
            }),
            _ => Err(PaymentError::Gateway(format!(
                "checkout session create failed: {resp}"
            ))),
        }
    }

    fn parse_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, PaymentError> {
        self.verify_signature(payload, signature_header)?;

        let event: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::Malformed(e.to_string()))?;
        let kind = event["type"].as_str().unwrap_or("").to_string();
        let metadata = &event["data"]["object"]["metadata"];

        let order_id = metadata["order_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok());

        match kind.as_str() {
            COMPLETED_EVENT => match order_id {
                Some(order_id) => Ok(PaymentEvent::Completed {
                    order_id,
                    user_id: metadata["user_id"]
                        .as_str()
                        .and_then(|s| Uuid::parse_str(s).ok()),
                }),
                None => Ok(PaymentEvent::Ignored { kind }),
            },
            FAILED_EVENT => match order_id {
                Some(order_id) => Ok(PaymentEvent::Failed { order_id }),
                None => Ok(PaymentEvent::Ignored { kind }),
            },
            _ => Ok(PaymentEvent::Ignored { kind }),
        }
    }
}
