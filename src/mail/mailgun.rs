use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Mailer, OutgoingMail};
use crate::config::MailConfig;

const MAILGUN_API: &str = "https://api.mailgun.net/v3";

pub struct MailgunClient {
    client: Client,
    api_key: String,
    domain: String,
    from: String,
}

impl MailgunClient {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build mailgun http client")?;
        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            domain: cfg.domain.clone(),
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for MailgunClient {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.api_key.is_empty() && !self.domain.is_empty(),
            "mailgun is not configured"
        );
        let mut form = vec![
            ("from", self.from.as_str()),
            ("to", mail.to.as_str()),
            ("subject", mail.subject.as_str()),
            ("text", mail.text.as_str()),
        ];
        if let Some(reply_to) = &mail.reply_to {
            form.push(("h:Reply-To", reply_to.as_str()));
        }
        let resp = self
            .client
            .post(format!("{MAILGUN_API}/{}/messages", self.domain))
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .context("mailgun request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("mailgun responded {status}: {body}");
        }
        debug!(to = %mail.to, "mail accepted by mailgun");
        Ok(())
    }
}
