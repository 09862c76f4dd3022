use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const STRIPE_API: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "payment" => Some(Self::Payment),
            "subscription" => Some(Self::Subscription),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub mode: CheckoutMode,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub client_reference_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn create_checkout_session(&self, req: &CheckoutRequest)
        -> anyhow::Result<CheckoutSession>;
}

pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build stripe http client")?;
        Ok(Self {
            client,
            secret_key: secret_key.to_string(),
        })
    }
}

/// Form-encoded body in Stripe's bracketed parameter syntax.
pub fn checkout_form(req: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), req.mode.as_str().to_string()),
        ("line_items[0][price]".to_string(), req.price_id.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("success_url".to_string(), req.success_url.clone()),
        ("cancel_url".to_string(), req.cancel_url.clone()),
        ("allow_promotion_codes".to_string(), "true".to_string()),
        // echoed back by the webhook; the session object carries no price otherwise
        ("metadata[price_id]".to_string(), req.price_id.clone()),
    ];
    if let Some(reference) = &req.client_reference_id {
        form.push(("client_reference_id".to_string(), reference.clone()));
    }
    match (&req.customer_id, &req.customer_email) {
        (Some(customer), _) => form.push(("customer".to_string(), customer.clone())),
        (None, Some(email)) => {
            form.push(("customer_email".to_string(), email.clone()));
            if req.mode == CheckoutMode::Payment {
                form.push(("customer_creation".to_string(), "always".to_string()));
            }
        }
        (None, None) => {}
    }
    form
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        anyhow::ensure!(!self.secret_key.is_empty(), "stripe secret key is not configured");
        let resp = self
            .client
            .post(format!("{STRIPE_API}/checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(req))
            .send()
            .await
            .context("stripe checkout request")?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| "unknown stripe error".into());
            anyhow::bail!("stripe responded {status}: {message}");
        }
        let session = resp
            .json::<CheckoutSession>()
            .await
            .context("decode checkout session")?;
        debug!(session_id = %session.id, "stripe checkout session created");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            price_id: "price_123".into(),
            success_url: "https://app/success".into(),
            cancel_url: "https://app/cancel".into(),
            mode: CheckoutMode::Payment,
            customer_id: None,
            customer_email: None,
            client_reference_id: None,
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn anonymous_checkout_lists_the_price_only() {
        let form = checkout_form(&request());
        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "line_items[0][price]"), Some("price_123"));
        assert_eq!(value(&form, "metadata[price_id]"), Some("price_123"));
        assert_eq!(value(&form, "client_reference_id"), None);
        assert_eq!(value(&form, "customer"), None);
        assert_eq!(value(&form, "customer_email"), None);
    }

    #[test]
    fn known_customer_wins_over_email() {
        let mut req = request();
        req.customer_id = Some("cus_1".into());
        req.customer_email = Some("a@example.com".into());
        req.client_reference_id = Some("user-1".into());
        let form = checkout_form(&req);
        assert_eq!(value(&form, "customer"), Some("cus_1"));
        assert_eq!(value(&form, "customer_email"), None);
        assert_eq!(value(&form, "client_reference_id"), Some("user-1"));
    }

    #[test]
    fn email_prefill_creates_customer_for_one_off_payments() {
        let mut req = request();
        req.customer_email = Some("a@example.com".into());
        let form = checkout_form(&req);
        assert_eq!(value(&form, "customer_email"), Some("a@example.com"));
        assert_eq!(value(&form, "customer_creation"), Some("always"));

        req.mode = CheckoutMode::Subscription;
        let form = checkout_form(&req);
        assert_eq!(value(&form, "customer_creation"), None);
    }

    #[test]
    fn mode_parses_known_values_only() {
        assert_eq!(CheckoutMode::parse("payment"), Some(CheckoutMode::Payment));
        assert_eq!(CheckoutMode::parse("subscription"), Some(CheckoutMode::Subscription));
        assert_eq!(CheckoutMode::parse("setup"), None);
    }
}
