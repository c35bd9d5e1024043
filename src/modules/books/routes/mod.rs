pub mod books;
pub mod reviews;

use axum::{
    routing::{delete, get},
    Router,
};

use super::store::SharedStore;

/// Book and review routes, relative to the module mount point.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(books::list_books).post(books::create_book))
        .route("/health", get(health_check))
        .route("/{id}", delete(books::delete_book))
        .route(
            "/{id}/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .with_state(store)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}
