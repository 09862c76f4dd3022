use std::sync::Arc;

use crate::{
    applications::repo::ApplicationRepo,
    auth::tokens::TokenStore,
    billing::stripe::{BillingProvider, StripeClient},
    captcha::{CaptchaVerifier, RecaptchaClient},
    config::AppConfig,
    db::PgStore,
    feedback::repo::FeedbackRepo,
    leads::repo::LeadRepo,
    mail::{mailgun::MailgunClient, Mailer},
    messages::repo::MessageRepo,
    resumes::repo::ResumeRepo,
    storage::{Storage, StorageClient},
    users::repo::UserRepo,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub messages: Arc<dyn MessageRepo>,
    pub leads: Arc<dyn LeadRepo>,
    pub feedback: Arc<dyn FeedbackRepo>,
    pub resumes: Arc<dyn ResumeRepo>,
    pub applications: Arc<dyn ApplicationRepo>,
    pub tokens: Arc<dyn TokenStore>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
    pub billing: Arc<dyn BillingProvider>,
    pub captcha: Arc<dyn CaptchaVerifier>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = PgStore::connect(&config).await?;
        if let Err(e) = store.migrate().await {
            tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
        }

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let mailer = Arc::new(MailgunClient::new(&config.mail)?) as Arc<dyn Mailer>;
        let billing = Arc::new(StripeClient::new(&config.stripe.secret_key)?) as Arc<dyn BillingProvider>;
        let captcha = Arc::new(RecaptchaClient::new(&config.recaptcha_secret)?) as Arc<dyn CaptchaVerifier>;

        Ok(Self::from_parts(config, Arc::new(store), storage, mailer, billing, captcha))
    }

    /// Wires one store behind every repository seam.
    pub fn from_parts<S>(
        config: Arc<AppConfig>,
        store: Arc<S>,
        storage: Arc<dyn StorageClient>,
        mailer: Arc<dyn Mailer>,
        billing: Arc<dyn BillingProvider>,
        captcha: Arc<dyn CaptchaVerifier>,
    ) -> Self
    where
        S: UserRepo
            + MessageRepo
            + LeadRepo
            + FeedbackRepo
            + ResumeRepo
            + ApplicationRepo
            + TokenStore
            + 'static,
    {
        Self {
            config,
            users: store.clone(),
            messages: store.clone(),
            leads: store.clone(),
            feedback: store.clone(),
            resumes: store.clone(),
            applications: store.clone(),
            tokens: store,
            storage,
            mailer,
            billing,
            captcha,
        }
    }

    /// In-memory state for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::fixture().state
    }
}
