use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use shelf_http::error::AppError;

use crate::modules::books::models::{CreateReviewRequest, Review};
use crate::modules::books::service::ShelfService;
use crate::modules::books::store::SharedStore;

const MISSING_REVIEW_FIELDS: &str = "Please provide all required review fields.";

pub async fn list_reviews(
    State(store): State<SharedStore>,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = ShelfService::new(store.as_ref())
        .list_reviews(&book_id)
        .await?;
    Ok(Json(reviews))
}

pub async fn create_review(
    State(store): State<SharedStore>,
    Path(book_id): Path<String>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let Json(request) = payload?;
    let input = request
        .validate()
        .map_err(|errors| AppError::validation(errors.details(), MISSING_REVIEW_FIELDS))?;

    let review = ShelfService::new(store.as_ref())
        .create_review(&book_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
