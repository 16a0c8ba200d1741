pub mod api;
pub mod telephony;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// All routes of the service, without outer middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(telephony::create_telephony_router())
        .with_state(state)
}
