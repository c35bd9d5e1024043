//! Business operations behind the book and review endpoints.

use bson::oid::ObjectId;
use shelf_http::error::AppError;

use super::models::{Book, BookId, NewBook, NewReview, Rating, Review};
use super::rating::RatingAggregate;
use super::store::{ShelfStore, StoreError, StoreResult};

/// Upper bound on read/compare-and-set rounds when concurrent reviews keep
/// moving a book's aggregate. Each round lets at least one writer through.
const MAX_AGGREGATE_ATTEMPTS: usize = 32;

pub struct ShelfService<'a> {
    store: &'a dyn ShelfStore,
}

impl<'a> ShelfService<'a> {
    pub fn new(store: &'a dyn ShelfStore) -> Self {
        Self { store }
    }

    pub async fn list_books(&self) -> Result<Vec<Book>, AppError> {
        self.store
            .list_books()
            .await
            .map_err(|e| AppError::internal(e, "Server error fetching books"))
    }

    pub async fn create_book(&self, input: NewBook) -> Result<Book, AppError> {
        let book = Book::new(input);
        self.store
            .insert_book(&book)
            .await
            .map_err(|e| AppError::internal(e, "Server error adding book"))?;

        tracing::info!(book_id = %book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Deletes the book, then its reviews. The two steps are separate writes:
    /// if the second fails the book is already gone and its reviews remain
    /// orphaned in the store.
    pub async fn delete_book(&self, id: &str) -> Result<(), AppError> {
        let Ok(book_id) = ObjectId::parse_str(id) else {
            return Err(AppError::not_found("Book not found"));
        };

        let deleted = self
            .store
            .delete_book(&book_id)
            .await
            .map_err(|e| AppError::internal(e, "Server error deleting book"))?;
        if deleted.is_none() {
            return Err(AppError::not_found("Book not found"));
        }

        let removed_reviews = self
            .store
            .delete_reviews_for_book(&book_id)
            .await
            .map_err(|e| AppError::internal(e, "Server error deleting book"))?;

        tracing::info!(book_id = %book_id, removed_reviews, "book deleted");
        Ok(())
    }

    /// An id that cannot exist has no reviews.
    pub async fn list_reviews(&self, book_id: &str) -> Result<Vec<Review>, AppError> {
        let Ok(book_id) = ObjectId::parse_str(book_id) else {
            return Ok(Vec::new());
        };

        self.store
            .list_reviews(&book_id)
            .await
            .map_err(|e| AppError::internal(e, "Server error fetching reviews"))
    }

    /// Stores the review, then folds its rating into the parent book. A
    /// missing parent does not prevent the review from being created.
    pub async fn create_review(&self, book_id: &str, input: NewReview) -> Result<Review, AppError> {
        let book_id =
            ObjectId::parse_str(book_id).map_err(|_| AppError::bad_request("Invalid book id"))?;

        let review = Review::new(book_id, input);
        self.store
            .insert_review(&review)
            .await
            .map_err(|e| AppError::internal(e, "Server error adding review"))?;

        match self
            .apply_rating(&book_id, review.rating)
            .await
            .map_err(|e| AppError::internal(e, "Server error adding review"))?
        {
            Some(aggregate) => tracing::info!(
                book_id = %book_id,
                review_id = %review.id,
                average_rating = aggregate.average,
                review_count = aggregate.count,
                "review created"
            ),
            None => tracing::warn!(
                book_id = %book_id,
                review_id = %review.id,
                "review created for unknown book, aggregate not updated"
            ),
        }

        Ok(review)
    }

    /// Read the current aggregate, compute the next one and write it back
    /// only if nobody else did in between; otherwise start over.
    async fn apply_rating(
        &self,
        book_id: &BookId,
        rating: Rating,
    ) -> StoreResult<Option<RatingAggregate>> {
        for attempt in 1..=MAX_AGGREGATE_ATTEMPTS {
            let Some(book) = self.store.find_book(book_id).await? else {
                return Ok(None);
            };

            let current = RatingAggregate::of(&book);
            let next = current.with_rating(rating);
            if self.store.update_rating(book_id, current.count, next).await? {
                return Ok(Some(next));
            }

            tracing::debug!(book_id = %book_id, attempt, "rating aggregate moved, retrying");
        }

        Err(StoreError::Contention(*book_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::http::StatusCode;

    use super::*;
    use crate::modules::books::store::MemoryStore;

    /// Wraps a [`MemoryStore`] and lets another writer land between a
    /// service's read of the aggregate and its compare-and-set.
    #[derive(Default)]
    struct ContendedStore {
        inner: MemoryStore,
        /// Ratings applied by a competing writer, one per `update_rating` call.
        competing: Mutex<Vec<Rating>>,
        /// Reject every compare-and-set, as if the count never settles.
        never_settles: bool,
        attempts: AtomicUsize,
    }

    impl ContendedStore {
        fn with_competitors(ratings: &[i64]) -> Self {
            Self {
                competing: Mutex::new(ratings.iter().map(|&r| Rating::new(r).unwrap()).collect()),
                ..Self::default()
            }
        }

        fn never_settling() -> Self {
            Self {
                never_settles: true,
                ..Self::default()
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ShelfStore for ContendedStore {
        async fn list_books(&self) -> StoreResult<Vec<Book>> {
            self.inner.list_books().await
        }
        async fn find_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
            self.inner.find_book(id).await
        }
        async fn insert_book(&self, book: &Book) -> StoreResult<()> {
            self.inner.insert_book(book).await
        }
        async fn delete_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
            self.inner.delete_book(id).await
        }
        async fn update_rating(
            &self,
            id: &BookId,
            expected_count: i64,
            next: RatingAggregate,
        ) -> StoreResult<bool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.never_settles {
                return Ok(false);
            }

            let competitor = self.competing.lock().unwrap().pop();
            if let Some(rating) = competitor {
                let current = RatingAggregate::of(&self.inner.find_book(id).await?.unwrap());
                let moved = current.with_rating(rating);
                assert!(self.inner.update_rating(id, current.count, moved).await?);
            }

            self.inner.update_rating(id, expected_count, next).await
        }
        async fn list_reviews(&self, book_id: &BookId) -> StoreResult<Vec<Review>> {
            self.inner.list_reviews(book_id).await
        }
        async fn insert_review(&self, review: &Review) -> StoreResult<()> {
            self.inner.insert_review(review).await
        }
        async fn delete_reviews_for_book(&self, book_id: &BookId) -> StoreResult<u64> {
            self.inner.delete_reviews_for_book(book_id).await
        }
    }

    fn new_book() -> NewBook {
        NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            category: "Science Fiction".to_string(),
            description: "Spice".to_string(),
            image_url: String::new(),
        }
    }

    fn new_review(rating: i64) -> NewReview {
        NewReview {
            user_id: "u-1".to_string(),
            user_name: "Ada".to_string(),
            rating: Rating::new(rating).unwrap(),
            review_text: "Noted".to_string(),
        }
    }

    #[tokio::test]
    async fn interleaved_write_is_retried_not_overwritten() {
        let store = ContendedStore::with_competitors(&[5]);
        let service = ShelfService::new(&store);
        let book = service.create_book(new_book()).await.unwrap();

        service
            .create_review(&book.id.to_hex(), new_review(1))
            .await
            .unwrap();

        let stored = store.find_book(&book.id).await.unwrap().unwrap();
        assert_eq!(stored.review_count, 2);
        assert_eq!(stored.average_rating, 3.0);
        assert_eq!(store.attempts(), 2);
    }

    #[tokio::test]
    async fn repeated_interleaving_still_counts_every_review() {
        let store = ContendedStore::with_competitors(&[2, 4, 4]);
        let service = ShelfService::new(&store);
        let book = service.create_book(new_book()).await.unwrap();

        service
            .create_review(&book.id.to_hex(), new_review(5))
            .await
            .unwrap();

        let stored = store.find_book(&book.id).await.unwrap().unwrap();
        assert_eq!(stored.review_count, 4);
        assert!((stored.average_rating - 3.75).abs() < 1e-9);
        assert_eq!(store.attempts(), 4);
    }

    #[tokio::test]
    async fn aggregate_that_never_settles_is_a_contention_error() {
        let store = ContendedStore::never_settling();
        let service = ShelfService::new(&store);
        let book = service.create_book(new_book()).await.unwrap();

        let result = service
            .apply_rating(&book.id, Rating::new(3).unwrap())
            .await;
        assert!(matches!(result, Err(StoreError::Contention(id)) if id == book.id));
        assert_eq!(store.attempts(), MAX_AGGREGATE_ATTEMPTS);
    }

    #[tokio::test]
    async fn contention_fails_the_request_but_keeps_the_review() {
        let store = ContendedStore::never_settling();
        let service = ShelfService::new(&store);
        let book = service.create_book(new_book()).await.unwrap();

        let error = service
            .create_review(&book.id.to_hex(), new_review(3))
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.inner.review_count().await, 1);

        let stored = store.find_book(&book.id).await.unwrap().unwrap();
        assert_eq!(stored.review_count, 0);
    }
}
