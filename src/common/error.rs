// src/common/error.rs

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::ValidationErrorsKind;

// ---
// Closed error taxonomy exposed to clients
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRequest,
    InternalServiceError,
    ServiceTimeout,
    UserNotFound,
    InvalidPassword,
    WebscrapingIssue,
    AwsConnectionIssue,
    InvalidInvitation,
    InvalidCustomer,
    InvalidBulkCsvFile,
    DeletionIssue,
    HomeBotAiError,
    Unauthorized,
    NotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InternalServiceError => "INTERNAL_SERVICE_ERROR",
            ErrorCode::ServiceTimeout => "SERVICE_TIMEOUT",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::InvalidPassword => "INVALID_PASSWORD",
            ErrorCode::WebscrapingIssue => "WEBSCRAPING_ISSUE",
            ErrorCode::AwsConnectionIssue => "AWS_CONNECTION_ISSUE",
            ErrorCode::InvalidInvitation => "INVALID_INVITATION",
            ErrorCode::InvalidCustomer => "INVALID_CUSTOMER",
            ErrorCode::InvalidBulkCsvFile => "INVALID_BULK_CSV_FILE",
            ErrorCode::DeletionIssue => "DELETION_ISSUE",
            ErrorCode::HomeBotAiError => "HOME_BOT_AI_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest
            | ErrorCode::InvalidInvitation
            | ErrorCode::InvalidCustomer
            | ErrorCode::InvalidBulkCsvFile => StatusCode::BAD_REQUEST,
            ErrorCode::UserNotFound | ErrorCode::InvalidPassword | ErrorCode::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ErrorCode::ServiceTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalServiceError
            | ErrorCode::WebscrapingIssue
            | ErrorCode::AwsConnectionIssue
            | ErrorCode::DeletionIssue
            | ErrorCode::HomeBotAiError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "The request to the route is invalid",
            ErrorCode::InternalServiceError => "There was a problem processing the request",
            ErrorCode::ServiceTimeout => "A timeout in processing has occurred",
            ErrorCode::UserNotFound => "No user exists with this email and password",
            ErrorCode::InvalidPassword => "Invalid password for user email",
            ErrorCode::WebscrapingIssue => "There was an issue retrieving data from the requested site",
            ErrorCode::AwsConnectionIssue => "There was an issue connecting to AWS",
            ErrorCode::InvalidInvitation => "The invitation is invalid or has expired",
            ErrorCode::InvalidCustomer => "No subscription information exists for this customer",
            ErrorCode::InvalidBulkCsvFile => {
                "The .csv file uploaded by the user is invalid. Please try again."
            }
            ErrorCode::DeletionIssue => "The customer subscription could not be canceled",
            ErrorCode::HomeBotAiError => "There was an issue booting up HomeBot",
            ErrorCode::Unauthorized => "Token is invalid!",
            ErrorCode::NotFound => "The requested resource was not found",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed JSON body: {0}")]
    JsonRejection(#[from] JsonRejection),

    #[error("malformed multipart body: {0}")]
    MultipartRejection(#[from] MultipartError),

    #[error("a user with this email already exists")]
    EmailAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid password")]
    InvalidPassword,

    #[error("token is missing")]
    MissingToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token is invalid")]
    InvalidToken,

    #[error("invalid invitation")]
    InvalidInvitation,

    #[error("no subscription information for customer")]
    InvalidCustomer,

    #[error("invalid bulk csv: {0}")]
    InvalidBulkCsv(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("subscription could not be canceled: {0}")]
    DeletionIssue(String),

    #[error("object storage error: {0}")]
    Storage(String),

    #[error("payment processor error: {0}")]
    Payment(String),

    #[error("home bot error: {0}")]
    HomeBot(String),

    #[error("scraping error: {0}")]
    Scraping(String),

    #[error("the scraping queue is full")]
    QueueFull,

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidRequest(_)
            | AppError::JsonRejection(_)
            | AppError::MultipartRejection(_)
            | AppError::EmailAlreadyExists => ErrorCode::InvalidRequest,
            AppError::UserNotFound => ErrorCode::UserNotFound,
            AppError::InvalidPassword => ErrorCode::InvalidPassword,
            AppError::MissingToken | AppError::ExpiredToken | AppError::InvalidToken => {
                ErrorCode::Unauthorized
            }
            AppError::InvalidInvitation => ErrorCode::InvalidInvitation,
            AppError::InvalidCustomer => ErrorCode::InvalidCustomer,
            AppError::InvalidBulkCsv(_) | AppError::Csv(_) => ErrorCode::InvalidBulkCsvFile,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::DeletionIssue(_) => ErrorCode::DeletionIssue,
            AppError::Storage(_) => ErrorCode::AwsConnectionIssue,
            AppError::HomeBot(_) => ErrorCode::HomeBotAiError,
            AppError::Scraping(_) => ErrorCode::WebscrapingIssue,
            AppError::QueueFull => ErrorCode::ServiceTimeout,
            AppError::Payment(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_)
            | AppError::HttpClient(_) => ErrorCode::InternalServiceError,
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::InvalidRequest(message) | AppError::InvalidBulkCsv(message) => message.clone(),
            AppError::JsonRejection(rejection) => rejection.body_text(),
            AppError::EmailAlreadyExists => "A user with this email already exists".to_string(),
            AppError::MissingToken => "Token is missing!".to_string(),
            AppError::ExpiredToken => "Token has expired!".to_string(),
            AppError::InvalidToken => "Token is invalid!".to_string(),
            AppError::NotFound(resource) => format!("The requested {resource} was not found"),
            other => other.code().default_message().to_string(),
        }
    }
}

// Flattens nested errors into `field`, `items[0].field` style keys.
fn collect_details(prefix: &str, errors: &validator::ValidationErrors, out: &mut Map<String, Value>) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages: Vec<Value> = field_errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => Value::String(message.to_string()),
                        None => Value::String(e.code.to_string()),
                    })
                    .collect();
                out.insert(key, Value::Array(messages));
            }
            ValidationErrorsKind::Struct(inner) => collect_details(&key, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_details(&format!("{key}[{index}]"), inner, out);
                }
            }
        }
    }
}

fn validation_details(errors: &validator::ValidationErrors) -> Value {
    let mut details = Map::new();
    collect_details("", errors, &mut details);
    Value::Object(details)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = code.status();

        if status.is_server_error() {
            tracing::error!(code = code.as_str(), "Internal error: {}", self);
        } else {
            tracing::info!(code = code.as_str(), "Request rejected: {}", self);
        }

        let mut body = json!({
            "code": code.as_str(),
            "message": self.client_message(),
        });
        if let AppError::ValidationError(errors) = &self {
            body["details"] = validation_details(errors);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::validation::violation;

    async fn render(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn every_code_has_its_bound_status() {
        assert_eq!(ErrorCode::InvalidRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InternalServiceError.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::ServiceTimeout.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(ErrorCode::UserNotFound.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidPassword.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidInvitation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidCustomer.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidBulkCsvFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::AwsConnectionIssue.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::DeletionIssue.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::HomeBotAiError.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn token_errors_use_fixed_messages() {
        let (status, body) = render(AppError::MissingToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Token is missing!");

        let (_, body) = render(AppError::ExpiredToken).await;
        assert_eq!(body["message"], "Token has expired!");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_driver_details() {
        let (status, body) = render(AppError::DatabaseError(sqlx::Error::PoolTimedOut)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_SERVICE_ERROR");
        assert_eq!(body["message"], "There was a problem processing the request");
    }

    #[tokio::test]
    async fn validation_errors_list_every_field() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("email", violation("email", "email must contain '@'"));
        errors.add("password", violation("password", "password must be at least 8 characters"));

        let (status, body) = render(AppError::ValidationError(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
        assert_eq!(body["details"]["email"][0], "email must contain '@'");
        assert_eq!(
            body["details"]["password"][0],
            "password must be at least 8 characters"
        );
    }
}
