pub mod auth;
pub mod error;
pub mod groups;
pub mod middleware;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// All REST routes. Everything except signup and login requires a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/{group_id}/join", post(groups::join_group))
        .route("/groups/{group_id}/leave", post(groups::leave_group))
        .route("/groups/{group_id}/messages", post(groups::send_message))
        .route(
            "/groups/{group_id}/messages/{message_id}/pin",
            post(groups::toggle_important),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
