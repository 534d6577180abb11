use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::Error as SqlxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Request body is missing or malformed")]
    MissingBody,

    #[error("Incomplete data: {0} is required")]
    MissingFields(&'static str),

    #[error("There are no products in the cart")]
    EmptyCart,

    #[error("Quantity for product {0} must be greater than zero")]
    InvalidQuantity(i64),

    #[error("User does not exist")]
    UserNotFound,

    #[error("Shop does not exist")]
    ShopNotFound,

    #[error("Sale does not exist")]
    SaleNotFound,

    /// No route matches the request, or a path segment failed to parse.
    #[error("Not found")]
    RouteNotFound,

    /// Login with an email nobody registered. Rendered exactly like
    /// `InvalidCredentials`.
    #[error("Invalid email or password")]
    UnknownEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("A product or shop in the cart does not exist")]
    UnknownReference,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Sale {0} references a product or shop that no longer exists")]
    DanglingReference(i64),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    /// Maps constraint violations raised by SQLite onto domain errors.
    pub fn from_write(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            // users.email is the only unique column written without an upsert
            if db_err.is_unique_violation() {
                return AppError::EmailTaken;
            }
            if db_err.is_foreign_key_violation() {
                return AppError::UnknownReference;
            }
        }
        AppError::DatabaseError(err)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingBody
            | AppError::MissingFields(_)
            | AppError::EmptyCart
            | AppError::InvalidQuantity(_)
            | AppError::UserNotFound
            | AppError::ShopNotFound
            | AppError::SaleNotFound
            | AppError::RouteNotFound
            | AppError::UnknownEmail
            | AppError::InvalidCredentials
            | AppError::UnknownReference => StatusCode::NOT_FOUND,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::DanglingReference(_)
            | AppError::PasswordError(_)
            | AppError::TokenError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Don't leak storage or crypto details to clients
        let message = if status.is_server_error() {
            log::error!("Request failed: {}", self);
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(json!({ "message": message }))
    }
}
