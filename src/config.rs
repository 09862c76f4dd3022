use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (MinIO, localstack). AWS default when unset.
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Monthly amount in cents per price id, used by the admin revenue estimate.
    pub plan_amounts: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
    pub signing_key: String,
    pub from: String,
    pub support_email: String,
}

/// What the access gate does when a status lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateFailPolicy {
    /// Let the request through.
    Open,
    /// Send the visitor back to sign-in.
    Closed,
}

impl GateFailPolicy {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => anyhow::bail!("GATE_FAIL_POLICY must be open or closed, got {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub public_base_url: String,
    pub frontend_dir: String,
    pub admin_emails: Vec<String>,
    pub gate_fail_policy: GateFailPolicy,
    pub storage: StorageConfig,
    pub stripe: StripeConfig,
    pub mail: MailConfig,
    pub recaptcha_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "applynify".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "applynify-web".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
        };
        let gate_fail_policy = match std::env::var("GATE_FAIL_POLICY") {
            Ok(v) => GateFailPolicy::parse(&v)?,
            Err(_) => GateFailPolicy::Open,
        };
        let storage = StorageConfig {
            bucket: std::env::var("S3_BUCKET")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            access_key: std::env::var("S3_ACCESS_KEY").ok(),
            secret_key: std::env::var("S3_SECRET_KEY").ok(),
        };
        let stripe = StripeConfig {
            secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            plan_amounts: parse_plan_amounts(
                &std::env::var("STRIPE_PLAN_AMOUNTS").unwrap_or_default(),
            )?,
        };
        let mail = MailConfig {
            api_key: std::env::var("MAILGUN_API_KEY").unwrap_or_default(),
            domain: std::env::var("MAILGUN_DOMAIN").unwrap_or_default(),
            signing_key: std::env::var("MAILGUN_SIGNING_KEY").unwrap_or_default(),
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Applynify <no-reply@applynify.com>".into()),
            support_email: std::env::var("SUPPORT_EMAIL")
                .unwrap_or_else(|_| "support@applynify.com".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into())
                .trim_end_matches('/')
                .to_string(),
            frontend_dir: std::env::var("FRONTEND_DIR").unwrap_or_else(|_| "./public".into()),
            admin_emails: split_list(&std::env::var("ADMIN_EMAILS").unwrap_or_default()),
            gate_fail_policy,
            storage,
            stripe,
            mail,
            recaptcha_secret: std::env::var("RECAPTCHA_SECRET").unwrap_or_default(),
        })
    }

    /// Session cookies get the `Secure` attribute when served over https.
    pub fn secure_cookies(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `price_abc:2900,price_def:9900`
fn parse_plan_amounts(raw: &str) -> anyhow::Result<Vec<(String, i64)>> {
    let mut out = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (price, cents) = entry
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("STRIPE_PLAN_AMOUNTS entry {entry:?} lacks ':'"))?;
        let cents = cents
            .trim()
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("STRIPE_PLAN_AMOUNTS entry {entry:?}: {e}"))?;
        out.push((price.trim().to_string(), cents));
    }
    Ok(out)
}
