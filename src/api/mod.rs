//! Web layer - HTTP handlers and routing
//!
//! Server-rendered pages for:
//! - the news board (`news`)
//! - private notes (`notes`)
//! - accounts (`users`)

pub mod middleware;
pub mod news;
pub mod notes;
pub mod users;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

pub use middleware::{AppState, AuthenticatedUser, CurrentUser, MaybeUser, WebError};

/// Build the application router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(news::router())
        .merge(notes::router())
        .merge(users::router())
        .fallback(middleware::not_found)
        // Error pages read the user resolved by `optional_auth`
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
