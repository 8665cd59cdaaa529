mod dto;
pub mod energy;
pub mod handlers;
pub mod insights;
pub mod labels;
pub mod repo;
pub mod services;
pub mod sleep;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
