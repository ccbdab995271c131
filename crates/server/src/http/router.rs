use super::handlers::{contact, posts, unsubscribe};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    let cors = if allowed_origins == "*" {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(Any)
                .allow_headers(Any)
        } else {
            tracing::info!("CORS enabled for origins: {:?}", origins);
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(origins)
                .allow_headers(Any)
        }
    };

    Router::new()
        .route("/contact", post(contact::submit))
        .route("/blog", get(posts::index))
        .route("/blog/hashtag/:category", get(posts::category_index))
        .route("/blog/:slug", get(posts::detail).post(posts::submit))
        .route(
            "/blog/unsubscribe/all-posts",
            post(unsubscribe::from_all_posts),
        )
        .route(
            "/blog/unsubscribe/:comment_id",
            post(unsubscribe::from_comment),
        )
        .layer(cors)
        .with_state(state)
}
