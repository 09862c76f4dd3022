use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> anyhow::Result<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct RecaptchaClient {
    client: Client,
    secret: String,
}

impl RecaptchaClient {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build recaptcha http client")?;
        Ok(Self {
            client,
            secret: secret.to_string(),
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaClient {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> anyhow::Result<bool> {
        anyhow::ensure!(!self.secret.is_empty(), "recaptcha secret is not configured");
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }
        let resp: SiteVerifyResponse = self
            .client
            .post(SITEVERIFY_URL)
            .form(&form)
            .send()
            .await
            .context("recaptcha siteverify request")?
            .error_for_status()
            .context("recaptcha siteverify status")?
            .json()
            .await
            .context("decode siteverify response")?;
        if !resp.success {
            debug!(errors = ?resp.error_codes, "recaptcha rejected token");
        }
        Ok(resp.success)
    }
}
