use crate::db::queries::review::{
    create_review, delete_review, get_review, get_reviews_for_product, update_review,
};
use crate::middleware::auth::{jwt_middleware, require_admin};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

/// Public review routes: reading reviews requires no identity.
pub fn review_routes() -> Router<PgPool> {
    Router::new()
        .route("/products/{product_id}/reviews", get(get_reviews_for_product))
        .route("/reviews/{review_id}", get(get_review))
}

/// Authenticated routes: creating a review injects `created_by` from the JWT.
pub fn secure_review_routes() -> Router<PgPool> {
    Router::new()
        .route("/products/{product_id}/reviews", post(create_review))
        .route_layer(from_fn(jwt_middleware))
}

/// Admin-only routes: overwriting or removing someone else's review.
pub fn admin_review_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/reviews/{review_id}",
            axum::routing::put(update_review).delete(delete_review),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(jwt_middleware))
}
