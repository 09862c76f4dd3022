use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod stats;

pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
