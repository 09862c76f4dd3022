//! Redirect rules for protected pages, free of I/O.
//!
//! The middleware calls [`before_lookup`] with whatever session it resolved.
//! Only when that returns [`Step::LookupStatus`] does it load the account and
//! finish with [`after_lookup`] (or [`on_lookup_failure`]).

use uuid::Uuid;

use crate::{
    auth::{claims::Claims, extractors::is_admin},
    config::GateFailPolicy,
    users::model::AccountStatus,
};

pub const PROTECTED_PREFIXES: [&str; 4] = ["/dashboard", "/onboarding", "/admin", "/settings"];

pub const ADMIN_LOGIN: &str = "/admin/login";
pub const ADMIN_HOME: &str = "/admin/dashboard";
pub const SIGN_IN: &str = "/signin";
pub const VERIFY_EMAIL: &str = "/verify-email";
pub const ONBOARDING: &str = "/onboarding";
pub const DASHBOARD: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Done(Decision),
    /// The account's verification and onboarding state is needed.
    LookupStatus(Uuid),
}

/// `path` equals `prefix` or sits below it.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|p| under(path, p))
}

/// `/signin?callbackUrl=<path+query>`, percent-encoded.
pub fn sign_in_redirect(path: &str, query: Option<&str>) -> Decision {
    let target = match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    };
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    Decision::Redirect(format!("{SIGN_IN}?callbackUrl={encoded}"))
}

pub fn before_lookup(path: &str, query: Option<&str>, claims: Option<&Claims>) -> Step {
    let admin = claims.is_some_and(is_admin);

    if path == ADMIN_LOGIN {
        return Step::Done(if admin {
            Decision::Redirect(ADMIN_HOME.into())
        } else {
            Decision::Pass
        });
    }

    if under(path, "/admin") {
        return Step::Done(if admin {
            Decision::Pass
        } else {
            Decision::Redirect(ADMIN_LOGIN.into())
        });
    }

    match claims {
        None => Step::Done(sign_in_redirect(path, query)),
        Some(c) => Step::LookupStatus(c.sub),
    }
}

pub fn after_lookup(path: &str, status: AccountStatus) -> Decision {
    if !status.email_verified {
        return Decision::Redirect(VERIFY_EMAIL.into());
    }
    let ready = status.onboarding_complete && status.has_plan;
    if under(path, ONBOARDING) && ready {
        return Decision::Redirect(DASHBOARD.into());
    }
    if under(path, DASHBOARD) && !ready {
        return Decision::Redirect(ONBOARDING.into());
    }
    Decision::Pass
}

pub fn on_lookup_failure(policy: GateFailPolicy, path: &str, query: Option<&str>) -> Decision {
    match policy {
        GateFailPolicy::Open => Decision::Pass,
        GateFailPolicy::Closed => sign_in_redirect(path, query),
    }
}
