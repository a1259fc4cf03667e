pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        // Classes and schedules
        .route("/classes", post(handlers::create_class))
        .route("/classes/{class_id}", get(handlers::get_class))
        .route(
            "/classes/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .route("/classes/schedules/{schedule_id}", get(handlers::get_schedule))
        // Bookings
        .route("/classes/book", post(handlers::book_class))
        .route("/classes/cancel", post(handlers::cancel_booking))
        .route("/classes/my-bookings", get(handlers::my_bookings))
        // Members
        .route(
            "/members",
            get(handlers::list_members).post(handlers::create_member),
        )
        .route("/members/{member_id}", get(handlers::get_member))
        // Health check
        .route("/healthcheck", get(handlers::healthcheck))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
