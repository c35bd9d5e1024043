use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::{ShelfStore, StoreError, StoreResult};
use crate::modules::books::models::{Book, BookId, Rating, Review};
use crate::modules::books::rating::RatingAggregate;

pub const BOOKS_COLLECTION: &str = "books";
pub const REVIEWS_COLLECTION: &str = "reviews";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    author: String,
    category: String,
    description: String,
    #[serde(default)]
    image_url: String,
    /// Absent or `null` on books written before any review.
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    review_count: Option<i64>,
    created_at: bson::DateTime,
}

impl From<&Book> for BookDocument {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            description: book.description.clone(),
            image_url: book.image_url.clone(),
            average_rating: Some(book.average_rating),
            review_count: Some(book.review_count),
            created_at: bson::DateTime::from_chrono(book.created_at),
        }
    }
}

impl From<BookDocument> for Book {
    fn from(document: BookDocument) -> Self {
        Self {
            id: document.id,
            title: document.title,
            author: document.author,
            category: document.category,
            description: document.description,
            image_url: document.image_url,
            average_rating: document.average_rating.unwrap_or_default(),
            review_count: document.review_count.unwrap_or_default(),
            created_at: document.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    book_id: ObjectId,
    user_id: String,
    user_name: String,
    rating: i32,
    review_text: String,
    created_at: bson::DateTime,
}

impl From<&Review> for ReviewDocument {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id,
            book_id: review.book_id,
            user_id: review.user_id.clone(),
            user_name: review.user_name.clone(),
            rating: i32::from(review.rating.get()),
            review_text: review.review_text.clone(),
            created_at: bson::DateTime::from_chrono(review.created_at),
        }
    }
}

impl TryFrom<ReviewDocument> for Review {
    type Error = StoreError;

    fn try_from(document: ReviewDocument) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(document.rating)).ok_or_else(|| StoreError::Corrupt {
            collection: REVIEWS_COLLECTION,
            id: document.id.to_hex(),
            reason: format!("rating {} outside 1..=5", document.rating),
        })?;

        Ok(Self {
            id: document.id,
            book_id: document.book_id,
            user_id: document.user_id,
            user_name: document.user_name,
            rating,
            review_text: document.review_text,
            created_at: document.created_at.to_chrono(),
        })
    }
}

/// Matches the book only while its stored count is still `expected_count`.
/// A count of zero also matches a missing or `null` field, which reads as zero.
fn rating_filter(id: &BookId, expected_count: i64) -> Document {
    if expected_count == 0 {
        doc! {
            "_id": *id,
            "$or": [{ "reviewCount": 0_i64 }, { "reviewCount": null }],
        }
    } else {
        doc! { "_id": *id, "reviewCount": expected_count }
    }
}

/// MongoDB-backed store. Cloning shares the underlying client pool.
#[derive(Clone, Debug)]
pub struct MongoStore {
    books: Collection<BookDocument>,
    reviews: Collection<ReviewDocument>,
}

impl MongoStore {
    pub fn new(database: &shelf_db::Database) -> Self {
        Self {
            books: database.collection(BOOKS_COLLECTION),
            reviews: database.collection(REVIEWS_COLLECTION),
        }
    }
}

#[async_trait]
impl ShelfStore for MongoStore {
    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        let documents: Vec<BookDocument> = self.books.find(doc! {}).await?.try_collect().await?;
        Ok(documents.into_iter().map(Book::from).collect())
    }

    async fn find_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
        let document = self.books.find_one(doc! { "_id": *id }).await?;
        Ok(document.map(Book::from))
    }

    async fn insert_book(&self, book: &Book) -> StoreResult<()> {
        self.books.insert_one(BookDocument::from(book)).await?;
        Ok(())
    }

    async fn delete_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
        let document = self.books.find_one_and_delete(doc! { "_id": *id }).await?;
        Ok(document.map(Book::from))
    }

    async fn update_rating(
        &self,
        id: &BookId,
        expected_count: i64,
        next: RatingAggregate,
    ) -> StoreResult<bool> {
        let result = self
            .books
            .update_one(
                rating_filter(id, expected_count),
                doc! { "$set": { "averageRating": next.average, "reviewCount": next.count } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn list_reviews(&self, book_id: &BookId) -> StoreResult<Vec<Review>> {
        let documents: Vec<ReviewDocument> = self
            .reviews
            .find(doc! { "bookId": *book_id })
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(Review::try_from).collect()
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        self.reviews.insert_one(ReviewDocument::from(review)).await?;
        Ok(())
    }

    async fn delete_reviews_for_book(&self, book_id: &BookId) -> StoreResult<u64> {
        let result = self.reviews.delete_many(doc! { "bookId": *book_id }).await?;
        Ok(result.deleted_count)
    }
}
