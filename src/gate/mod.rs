use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error};

use crate::{auth::session::SessionKeys, state::AppState};

pub mod decision;

use decision::{after_lookup, before_lookup, is_protected, on_lookup_failure, sign_in_redirect, Decision, Step};

/// Redirects visitors of protected pages based on session and account state.
pub async fn access_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if !is_protected(&path) {
        return next.run(req).await;
    }
    let query = req.uri().query().map(str::to_owned);
    let claims = SessionKeys::from_ref(&state).resolve(req.headers());

    let decision = match before_lookup(&path, query.as_deref(), claims.as_ref()) {
        Step::Done(d) => d,
        Step::LookupStatus(user_id) => match state.users.find_by_id(user_id).await {
            Ok(Some(user)) => after_lookup(&path, user.status()),
            Ok(None) => {
                debug!(%user_id, "session for unknown user");
                sign_in_redirect(&path, query.as_deref())
            }
            Err(e) => {
                error!(error = %e, %user_id, "gate status lookup failed");
                on_lookup_failure(state.config.gate_fail_policy, &path, query.as_deref())
            }
        },
    };

    match decision {
        Decision::Pass => next.run(req).await,
        Decision::Redirect(to) => {
            debug!(%path, %to, "gate redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        config::GateFailPolicy,
        state::AppState,
        testing::{self, Fixture},
        users::model::User,
    };

    async fn visit(app: Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Option<String>) {
        let mut req = Request::builder().uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        (resp.status(), location)
    }

    fn seeded(fx: &Fixture, edit: impl FnOnce(&mut User)) -> String {
        let mut user = testing::user("jane@example.com");
        user.email_verified = true;
        edit(&mut user);
        let cookie = testing::session_cookie(&fx.state, &user);
        fx.store.insert_user(user);
        cookie
    }

    #[tokio::test]
    async fn admin_path_without_admin_claim_goes_to_admin_login() {
        let fx = testing::fixture();
        let cookie = seeded(&fx, |_| {});
        let (status, location) = visit(build_app(fx.state.clone()), "/admin/users", Some(&cookie)).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/admin/login"));

        let (_, location) = visit(build_app(fx.state), "/admin", None).await;
        assert_eq!(location.as_deref(), Some("/admin/login"));
    }

    #[tokio::test]
    async fn admin_is_sent_from_login_to_dashboard() {
        let fx = testing::fixture();
        let mut admin = testing::user(testing::ADMIN_EMAIL);
        admin.email_verified = true;
        let cookie = testing::session_cookie(&fx.state, &admin);
        fx.store.insert_user(admin);

        let (_, location) = visit(build_app(fx.state.clone()), "/admin/login", Some(&cookie)).await;
        assert_eq!(location.as_deref(), Some("/admin/dashboard"));
        let (_, location) = visit(build_app(fx.state), "/admin/users", Some(&cookie)).await;
        assert_eq!(location, None);
    }

    #[tokio::test]
    async fn missing_session_preserves_callback() {
        let app = build_app(testing::state());
        let (status, location) = visit(app, "/settings/billing?tab=plans", None).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            location.as_deref(),
            Some("/signin?callbackUrl=%2Fsettings%2Fbilling%3Ftab%3Dplans")
        );
    }

    #[tokio::test]
    async fn quoted_session_cookie_is_honoured() {
        let fx = testing::fixture();
        let cookie = seeded(&fx, |u| {
            u.onboarding_complete = true;
            u.price_id = Some("price_pro".into());
        });
        let (name, value) = cookie.split_once('=').unwrap();
        let quoted = format!("{name}=\"{value}\"");
        let (status, location) = visit(build_app(fx.state), "/dashboard", Some(&quoted)).await;
        assert_eq!(location, None);
        assert_ne!(status, StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn unverified_user_goes_to_verify_email() {
        let fx = testing::fixture();
        let cookie = seeded(&fx, |u| u.email_verified = false);
        let (_, location) = visit(build_app(fx.state), "/settings", Some(&cookie)).await;
        assert_eq!(location.as_deref(), Some("/verify-email"));
    }

    #[tokio::test]
    async fn onboarding_state_steers_between_onboarding_and_dashboard() {
        let fx = testing::fixture();
        let ready = seeded(&fx, |u| {
            u.onboarding_complete = true;
            u.price_id = Some("price_pro".into());
        });
        let (_, location) = visit(build_app(fx.state.clone()), "/onboarding", Some(&ready)).await;
        assert_eq!(location.as_deref(), Some("/dashboard"));
        let (_, location) = visit(build_app(fx.state.clone()), "/dashboard", Some(&ready)).await;
        assert_eq!(location, None);

        let unpaid = seeded(&fx, |u| u.onboarding_complete = true);
        let (_, location) = visit(build_app(fx.state.clone()), "/dashboard", Some(&unpaid)).await;
        assert_eq!(location.as_deref(), Some("/onboarding"));

        let fresh = seeded(&fx, |u| u.price_id = Some("price_pro".into()));
        let (_, location) = visit(build_app(fx.state), "/dashboard", Some(&fresh)).await;
        assert_eq!(location.as_deref(), Some("/onboarding"));
    }

    #[tokio::test]
    async fn unprotected_pages_are_not_gated() {
        let (status, location) = visit(build_app(AppState::fake()), "/pricing", None).await;
        assert_eq!(location, None);
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lookup_failure_follows_policy() {
        let fx = testing::fixture();
        let cookie = seeded(&fx, |_| {});
        fx.store.fail_user_lookups.store(true, Ordering::SeqCst);
        let (_, location) = visit(build_app(fx.state), "/dashboard", Some(&cookie)).await;
        assert_eq!(location, None);

        let mut config = testing::config();
        config.gate_fail_policy = GateFailPolicy::Closed;
        let fx = testing::fixture_with(config);
        let cookie = seeded(&fx, |_| {});
        fx.store.fail_user_lookups.store(true, Ordering::SeqCst);
        let (_, location) = visit(build_app(fx.state), "/dashboard", Some(&cookie)).await;
        assert_eq!(location.as_deref(), Some("/signin?callbackUrl=%2Fdashboard"));
    }
}
