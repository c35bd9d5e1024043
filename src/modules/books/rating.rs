//! Incremental maintenance of a book's rating aggregate.

use super::models::{Book, Rating};

/// Denormalized `averageRating` / `reviewCount` pair stored on a book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAggregate {
    pub average: f64,
    pub count: i64,
}

impl RatingAggregate {
    pub const EMPTY: Self = Self {
        average: 0.0,
        count: 0,
    };

    pub fn of(book: &Book) -> Self {
        Self {
            average: book.average_rating,
            count: book.review_count,
        }
    }

    /// Fold one more rating into the running mean.
    ///
    /// The aggregate is never recomputed from the reviews themselves, so any
    /// drift already present in the stored values is carried forward.
    pub fn with_rating(self, rating: Rating) -> Self {
        let count = self.count.max(0);
        let total = self.average * count as f64 + f64::from(rating.get());
        let count = count + 1;

        Self {
            average: total / count as f64,
            count,
        }
    }
}
