use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use shelf_http::error::AppError;

use crate::modules::books::models::{Book, CreateBookRequest, MessageResponse};
use crate::modules::books::service::ShelfService;
use crate::modules::books::store::SharedStore;

const MISSING_BOOK_FIELDS: &str = "Please provide all required book fields.";

pub async fn list_books(State(store): State<SharedStore>) -> Result<Json<Vec<Book>>, AppError> {
    let books = ShelfService::new(store.as_ref()).list_books().await?;
    Ok(Json(books))
}

pub async fn create_book(
    State(store): State<SharedStore>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(request) = payload?;
    let input = request
        .validate()
        .map_err(|errors| AppError::validation(errors.details(), MISSING_BOOK_FIELDS))?;

    let book = ShelfService::new(store.as_ref()).create_book(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn delete_book(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    ShelfService::new(store.as_ref()).delete_book(&id).await?;
    Ok(Json(MessageResponse {
        message: "Book deleted successfully".to_string(),
    }))
}
