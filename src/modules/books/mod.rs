pub mod models;
mod openapi;
pub mod rating;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_kernel::{InitCtx, Migration, Module};

use store::{SharedStore, BOOKS_COLLECTION, REVIEWS_COLLECTION};

/// Books and their reviews, mounted under `/api/books`.
pub struct BooksModule {
    store: SharedStore,
}

impl BooksModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi::spec())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_reviews_by_book",
                collection: REVIEWS_COLLECTION,
                keys: &[("bookId", 1), ("createdAt", -1)],
                unique: false,
            },
            Migration {
                id: "002_books_by_creation",
                collection: BOOKS_COLLECTION,
                keys: &[("createdAt", 1)],
                unique: false,
            },
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: SharedStore) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
