//! Event registration backend: events with a capacity, and the participants
//! registered for them, behind a small JSON API.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod participants;
pub mod state;
pub mod validation;

use axum::{Router, routing::get};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn app(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route(
            "/events/{id}",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        )
        .route(
            "/participants",
            get(handlers::list_participants).post(handlers::create_participant),
        )
        .route(
            "/participants/{id}",
            get(handlers::get_participant)
                .put(handlers::update_participant)
                .delete(handlers::delete_participant),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
