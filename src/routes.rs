// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, recalculation, results},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Mounts the attempt lifecycle, recalculation trigger and result reads.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let test_routes = Router::new()
        .route("/{test_id}/attempts", post(attempt::start_or_resume))
        .route("/{test_id}/recalculate", post(recalculation::recalculate_test))
        .route("/{test_id}/leaderboard", get(results::get_leaderboard));

    let attempt_routes = Router::new()
        .route("/{attempt_id}/answers", put(attempt::save_answers))
        .route("/{attempt_id}/complete", post(attempt::complete))
        .route("/{attempt_id}/result", get(results::get_attempt_result));

    Router::new()
        .nest("/api/tests", test_routes)
        .nest("/api/attempts", attempt_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
