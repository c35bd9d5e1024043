use serde_json::{json, Value};

fn error_responses(codes: &[&str]) -> Value {
    let mut responses = serde_json::Map::new();
    for code in codes {
        let description = match *code {
            "400" => "Missing or invalid fields",
            "404" => "Book not found",
            _ => "Server error",
        };
        responses.insert(
            (*code).to_string(),
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            }),
        );
    }
    Value::Object(responses)
}

fn with_errors(mut responses: Value, codes: &[&str]) -> Value {
    if let (Some(target), Value::Object(errors)) = (responses.as_object_mut(), error_responses(codes)) {
        target.extend(errors);
    }
    responses
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": "Book id as a 24-character hex string",
        "schema": { "type": "string" }
    })
}

pub(super) fn spec() -> Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "responses": with_errors(json!({
                        "200": {
                            "description": "All books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        }
                    }), &["500"])
                },
                "post": {
                    "summary": "Create a book",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": with_errors(json!({
                        "201": {
                            "description": "Book created",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        }
                    }), &["400", "500"])
                }
            },
            "/health": {
                "get": {
                    "summary": "Books module health",
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            },
            "/{id}": {
                "delete": {
                    "summary": "Delete a book and its reviews",
                    "parameters": [id_parameter()],
                    "responses": with_errors(json!({
                        "200": {
                            "description": "Book deleted",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Message" }
                                }
                            }
                        }
                    }), &["404", "500"])
                }
            },
            "/{id}/reviews": {
                "get": {
                    "summary": "List reviews for a book, newest first",
                    "parameters": [id_parameter()],
                    "responses": with_errors(json!({
                        "200": {
                            "description": "Reviews for the book",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Review" }
                                    }
                                }
                            }
                        }
                    }), &["500"])
                },
                "post": {
                    "summary": "Add a review and update the book's rating",
                    "parameters": [id_parameter()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateReview" }
                            }
                        }
                    },
                    "responses": with_errors(json!({
                        "201": {
                            "description": "Review created",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Review" }
                                }
                            }
                        }
                    }), &["400", "500"])
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "category": { "type": "string" },
                        "description": { "type": "string" },
                        "imageUrl": { "type": "string" },
                        "averageRating": { "type": "number" },
                        "reviewCount": { "type": "integer" },
                        "createdAt": { "type": "string", "format": "date-time" }
                    },
                    "required": [
                        "id", "title", "author", "category", "description",
                        "imageUrl", "averageRating", "reviewCount", "createdAt"
                    ]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "category": { "type": "string" },
                        "description": { "type": "string" },
                        "imageUrl": { "type": "string" }
                    },
                    "required": ["title", "author", "category", "description"]
                },
                "Review": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "bookId": { "type": "string" },
                        "userId": { "type": "string" },
                        "userName": { "type": "string" },
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "reviewText": { "type": "string" },
                        "createdAt": { "type": "string", "format": "date-time" }
                    },
                    "required": [
                        "id", "bookId", "userId", "userName", "rating", "reviewText", "createdAt"
                    ]
                },
                "CreateReview": {
                    "type": "object",
                    "properties": {
                        "userId": { "type": "string" },
                        "userName": { "type": "string" },
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "reviewText": { "type": "string" }
                    },
                    "required": ["userId", "userName", "rating", "reviewText"]
                },
                "Message": {
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"]
                }
            }
        }
    })
}
