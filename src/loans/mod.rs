mod dto;
pub mod engine;
pub mod handlers;
pub mod repo;
pub mod schedule;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::client_routes().merge(handlers::admin_routes())
}
