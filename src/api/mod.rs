pub mod health;
pub mod mail;

use axum::Router;

use crate::state::AppState;

/// Create the router: the function trigger plus health
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(mail::mail_routes())
        .merge(health::health_routes())
        .with_state(state)
}
