use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod stripe;
pub mod webhook;

pub fn router() -> Router<AppState> {
    handlers::billing_routes()
}
