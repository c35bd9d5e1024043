use bson::{oid::ObjectId, serde_helpers::serialize_object_id_as_hex_string};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Store-assigned identifier shared by books and reviews.
pub type BookId = ObjectId;

/// A book with its denormalized rating aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(serialize_with = "serialize_object_id_as_hex_string")]
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    /// Running mean of all review ratings, `0` until the first review.
    pub average_rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Fresh book with a new id and an empty aggregate.
    pub fn new(input: NewBook) -> Self {
        Self {
            id: ObjectId::new(),
            title: input.title,
            author: input.author,
            category: input.category,
            description: input.description,
            image_url: input.image_url,
            average_rating: 0.0,
            review_count: 0,
            created_at: now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(serialize_with = "serialize_object_id_as_hex_string")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_object_id_as_hex_string")]
    pub book_id: BookId,
    pub user_id: String,
    pub user_name: String,
    pub rating: Rating,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(book_id: BookId, input: NewReview) -> Self {
        Self {
            id: ObjectId::new(),
            book_id,
            user_id: input.user_id,
            user_name: input.user_name,
            rating: input.rating,
            review_text: input.review_text,
            created_at: now(),
        }
    }
}

/// Creation timestamps are kept at millisecond precision, the resolution of
/// the database's date type, so a stored record reads back unchanged.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Review score, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then(|| Self(value as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Validated input for [`Book::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
}

/// Validated input for [`Review::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub user_id: String,
    pub user_name: String,
    pub rating: Rating,
    pub review_text: String,
}

/// Request body for creating a book. Fields are raw JSON so that absent
/// values surface as validation errors and scalars are accepted as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: Option<Value>,
    pub author: Option<Value>,
    pub category: Option<Value>,
    pub description: Option<Value>,
    pub image_url: Option<Value>,
}

impl CreateBookRequest {
    pub fn validate(self) -> Result<NewBook, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = errors.required("title", self.title);
        let author = errors.required("author", self.author);
        let category = errors.required("category", self.category);
        let description = errors.required("description", self.description);
        let image_url = errors.optional("imageUrl", self.image_url);

        errors.into_result(NewBook {
            title,
            author,
            category,
            description,
            image_url,
        })
    }
}

/// Request body for creating a review. `rating` must be an integral number;
/// strings, fractions and out-of-range numbers get a field-level error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub user_id: Option<Value>,
    pub user_name: Option<Value>,
    pub rating: Option<Value>,
    pub review_text: Option<Value>,
}

impl CreateReviewRequest {
    pub fn validate(self) -> Result<NewReview, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let user_id = errors.required("userId", self.user_id);
        let user_name = errors.required("userName", self.user_name);
        let rating = match parse_rating(self.rating.as_ref()) {
            Ok(rating) => Some(rating),
            Err(error) => {
                errors.push("rating", error);
                None
            }
        };
        let review_text = errors.required("reviewText", self.review_text);

        match rating {
            Some(rating) => errors.into_result(NewReview {
                user_id,
                user_name,
                rating,
                review_text,
            }),
            None => Err(errors),
        }
    }
}

/// Zero counts as missing, like an absent value.
fn parse_rating(value: Option<&Value>) -> Result<Rating, &'static str> {
    let number = match value {
        None | Some(Value::Null) => return Err("required"),
        Some(Value::Number(number)) => number,
        Some(_) => return Err("not_an_integer"),
    };

    let integer = number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|value| value.fract() == 0.0)
            .map(|value| value as i64)
    });

    match integer {
        None => Err("not_an_integer"),
        Some(0) => Err("required"),
        Some(value) => Rating::new(value).ok_or("out_of_range"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub error: &'static str,
}

/// Field-level problems collected while validating a request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    fn push(&mut self, field: &'static str, error: &'static str) {
        self.0.push(FieldError { field, error });
    }

    /// Absent, `null`, `""`, `0` and `false` count as missing. Other
    /// scalars are taken as their text form; whitespace is kept as sent.
    fn required(&mut self, field: &'static str, value: Option<Value>) -> String {
        match value {
            Some(Value::String(text)) if !text.is_empty() => text,
            Some(Value::Number(number)) if number.as_f64() != Some(0.0) => number.to_string(),
            Some(Value::Bool(true)) => true.to_string(),
            Some(Value::Array(_) | Value::Object(_)) => {
                self.push(field, "not_a_string");
                String::new()
            }
            _ => {
                self.push(field, "required");
                String::new()
            }
        }
    }

    /// Like [`Self::required`], but an absent or `null` value becomes `""`.
    fn optional(&mut self, field: &'static str, value: Option<Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text,
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            Some(Value::Array(_) | Value::Object(_)) => {
                self.push(field, "not_a_string");
                String::new()
            }
        }
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Error details in the shape of the HTTP error envelope.
    pub fn details(&self) -> Vec<serde_json::Value> {
        self.0
            .iter()
            .map(|e| json!({ "field": e.field, "error": e.error }))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_book() -> CreateBookRequest {
        CreateBookRequest {
            title: Some(json!("Dune")),
            author: Some(json!("Frank Herbert")),
            category: Some(json!("Science Fiction")),
            description: Some(json!("Spice and sand")),
            image_url: None,
        }
    }

    fn complete_review(rating: Value) -> CreateReviewRequest {
        CreateReviewRequest {
            user_id: Some(json!("u-1")),
            user_name: Some(json!("Ada")),
            rating: Some(rating),
            review_text: Some(json!("Loved it")),
        }
    }

    fn failing_fields(errors: ValidationErrors) -> Vec<&'static str> {
        errors.fields().iter().map(|e| e.field).collect()
    }

    #[test]
    fn complete_book_request_validates() {
        let book = complete_book().validate().unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.image_url, "");
    }

    #[test]
    fn every_missing_book_field_is_reported() {
        let errors = CreateBookRequest::default().validate().unwrap_err();
        assert_eq!(
            failing_fields(errors),
            vec!["title", "author", "category", "description"]
        );
    }

    #[test]
    fn empty_and_falsy_book_fields_count_as_missing() {
        let request = CreateBookRequest {
            title: Some(json!("")),
            author: Some(Value::Null),
            category: Some(json!(0)),
            description: Some(json!(false)),
            ..complete_book()
        };
        let errors = request.validate().unwrap_err();
        assert_eq!(
            failing_fields(errors),
            vec!["title", "author", "category", "description"]
        );
    }

    #[test]
    fn whitespace_book_field_is_kept_as_sent() {
        let request = CreateBookRequest {
            author: Some(json!("   ")),
            ..complete_book()
        };
        assert_eq!(request.validate().unwrap().author, "   ");
    }

    #[test]
    fn scalar_fields_are_taken_as_text() {
        let request = CreateReviewRequest {
            user_id: Some(json!(123)),
            user_name: Some(json!(true)),
            ..complete_review(json!(4))
        };
        let review = request.validate().unwrap();
        assert_eq!(review.user_id, "123");
        assert_eq!(review.user_name, "true");

        let book = CreateBookRequest {
            image_url: Some(json!(7)),
            ..complete_book()
        }
        .validate()
        .unwrap();
        assert_eq!(book.image_url, "7");
    }

    #[test]
    fn structured_values_are_not_text() {
        let request = CreateBookRequest {
            title: Some(json!(["Dune"])),
            image_url: Some(json!({ "href": "x" })),
            ..complete_book()
        };
        let errors = request.validate().unwrap_err();
        assert_eq!(
            errors.fields(),
            &[
                FieldError {
                    field: "title",
                    error: "not_a_string"
                },
                FieldError {
                    field: "imageUrl",
                    error: "not_a_string"
                },
            ]
        );
    }

    #[test]
    fn rating_accepts_integral_values_in_range() {
        for value in [json!(1), json!(5), json!(3.0)] {
            assert!(complete_review(value).validate().is_ok());
        }
    }

    #[test]
    fn rating_zero_is_treated_as_missing() {
        let errors = complete_review(json!(0)).validate().unwrap_err();
        assert_eq!(
            errors.fields(),
            &[FieldError {
                field: "rating",
                error: "required"
            }]
        );
    }

    #[test]
    fn rating_outside_bounds_is_rejected() {
        for value in [json!(6), json!(-1)] {
            let errors = complete_review(value).validate().unwrap_err();
            assert_eq!(errors.fields()[0].error, "out_of_range");
        }
    }

    #[test]
    fn rating_must_be_an_integer() {
        for value in [json!(4.5), json!("4"), json!(true)] {
            let errors = complete_review(value).validate().unwrap_err();
            assert_eq!(errors.fields()[0].error, "not_an_integer");
        }
    }

    #[test]
    fn missing_review_fields_are_all_reported() {
        let errors = CreateReviewRequest::default().validate().unwrap_err();
        assert_eq!(
            failing_fields(errors),
            vec!["userId", "userName", "rating", "reviewText"]
        );
    }

    #[test]
    fn details_match_error_envelope_shape() {
        let errors = CreateBookRequest::default().validate().unwrap_err();
        assert_eq!(
            errors.details()[0],
            json!({ "field": "title", "error": "required" })
        );
    }

    #[test]
    fn book_serializes_with_camel_case_and_hex_id() {
        let book = Book::new(complete_book().validate().unwrap());
        let value = serde_json::to_value(&book).unwrap();

        assert_eq!(value["id"], book.id.to_hex());
        assert_eq!(value["averageRating"], 0.0);
        assert_eq!(value["reviewCount"], 0);
        assert_eq!(value["imageUrl"], "");
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn review_serializes_book_reference_as_hex() {
        let book_id = ObjectId::new();
        let review = Review::new(
            book_id,
            complete_review(json!(4)).validate().unwrap(),
        );
        let value = serde_json::to_value(&review).unwrap();

        assert_eq!(value["bookId"], book_id.to_hex());
        assert_eq!(value["rating"], 4);
        assert_eq!(value["reviewText"], "Loved it");
    }
}
