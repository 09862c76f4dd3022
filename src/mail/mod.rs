use async_trait::async_trait;

pub mod mailgun;
pub mod templates;
pub mod webhook;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// Sends without failing the caller; errors are only logged.
pub async fn send_best_effort(mailer: &dyn Mailer, mail: OutgoingMail) {
    if let Err(e) = mailer.send(&mail).await {
        tracing::warn!(error = %e, to = %mail.to, subject = %mail.subject, "notification mail failed");
    }
}
