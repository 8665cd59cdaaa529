pub mod catalog_client;
mod dto;
pub mod debounce;
pub mod handlers;
pub mod macros;
pub mod merge;
pub mod product;
pub mod repo;
pub mod serving;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
