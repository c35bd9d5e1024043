//! Persistence for books and reviews.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::{MongoStore, BOOKS_COLLECTION, REVIEWS_COLLECTION};

use std::sync::Arc;

use async_trait::async_trait;

use super::models::{Book, BookId, Review};
use super::rating::RatingAggregate;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("corrupt {collection} document {id}: {reason}")]
    Corrupt {
        collection: &'static str,
        id: String,
        reason: String,
    },

    #[error("rating aggregate of book {0} kept changing under concurrent reviews")]
    Contention(BookId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations the books module needs from its document store.
///
/// Every call is a single round trip; nothing here spans more than one
/// document atomically.
#[async_trait]
pub trait ShelfStore: Send + Sync {
    /// All books, in no particular order.
    async fn list_books(&self) -> StoreResult<Vec<Book>>;

    async fn find_book(&self, id: &BookId) -> StoreResult<Option<Book>>;

    async fn insert_book(&self, book: &Book) -> StoreResult<()>;

    /// Removes the book and returns it, or `None` if it did not exist.
    /// Reviews are left untouched.
    async fn delete_book(&self, id: &BookId) -> StoreResult<Option<Book>>;

    /// Writes `next` only if the stored review count still equals
    /// `expected_count`. Returns whether the write happened.
    async fn update_rating(
        &self,
        id: &BookId,
        expected_count: i64,
        next: RatingAggregate,
    ) -> StoreResult<bool>;

    /// Reviews of one book, newest first.
    async fn list_reviews(&self, book_id: &BookId) -> StoreResult<Vec<Review>>;

    async fn insert_review(&self, review: &Review) -> StoreResult<()>;

    /// Returns the number of reviews removed.
    async fn delete_reviews_for_book(&self, book_id: &BookId) -> StoreResult<u64>;
}

pub type SharedStore = Arc<dyn ShelfStore>;
