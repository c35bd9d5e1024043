use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ShelfStore, StoreResult};
use crate::modules::books::models::{Book, BookId, Review};
use crate::modules::books::rating::RatingAggregate;

/// Process-local store for tests and demo runs. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    books: Vec<Book>,
    reviews: Vec<Review>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn review_count(&self) -> usize {
        self.state.read().await.reviews.len()
    }
}

#[async_trait]
impl ShelfStore for MemoryStore {
    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        Ok(self.state.read().await.books.clone())
    }

    async fn find_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.iter().find(|book| &book.id == id).cloned())
    }

    async fn insert_book(&self, book: &Book) -> StoreResult<()> {
        self.state.write().await.books.push(book.clone());
        Ok(())
    }

    async fn delete_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
        let mut state = self.state.write().await;
        let position = state.books.iter().position(|book| &book.id == id);
        Ok(position.map(|index| state.books.remove(index)))
    }

    async fn update_rating(
        &self,
        id: &BookId,
        expected_count: i64,
        next: RatingAggregate,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(book) = state
            .books
            .iter_mut()
            .find(|book| &book.id == id && book.review_count == expected_count)
        else {
            return Ok(false);
        };

        book.average_rating = next.average;
        book.review_count = next.count;
        Ok(true)
    }

    async fn list_reviews(&self, book_id: &BookId) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        // Newest insertion first, then a stable sort keeps that order for
        // reviews created within the same millisecond.
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .rev()
            .filter(|review| &review.book_id == book_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        self.state.write().await.reviews.push(review.clone());
        Ok(())
    }

    async fn delete_reviews_for_book(&self, book_id: &BookId) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.reviews.len();
        state.reviews.retain(|review| &review.book_id != book_id);
        Ok((before - state.reviews.len()) as u64)
    }
}
