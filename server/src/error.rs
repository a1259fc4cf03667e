use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::{ErrorResponse, Tier};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] redb::DatabaseError),

    #[error("Database transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Database table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Database storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Database commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Member not found")]
    MemberNotFound,

    #[error("Class not found")]
    ClassNotFound,

    #[error("Class schedule not found")]
    ScheduleNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Class is full")]
    ClassFull,

    #[error("This class requires a {required} membership, member is {actual}")]
    TierTooLow { required: Tier, actual: Tier },

    #[error("Member has already booked this class")]
    AlreadyBooked,

    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    #[error("Booking belongs to another member")]
    NotBookingOwner,

    #[error("Member already exists")]
    MemberExists,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MemberNotFound
            | Self::ClassNotFound
            | Self::ScheduleNotFound
            | Self::BookingNotFound => StatusCode::NOT_FOUND,
            Self::TierTooLow { .. } | Self::NotBookingOwner => StatusCode::FORBIDDEN,
            Self::ClassFull | Self::AlreadyBooked | Self::AlreadyCancelled | Self::MemberExists => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> u32 {
        match self {
            Self::Database(_)
            | Self::DatabaseError(_)
            | Self::Transaction(_)
            | Self::Table(_)
            | Self::Storage(_)
            | Self::Commit(_)
            | Self::Serialization(_) => 1000,
            Self::InvalidRequest(_) => 1001,
            Self::MemberNotFound => 1002,
            Self::ClassNotFound => 1003,
            Self::ScheduleNotFound => 1004,
            Self::BookingNotFound => 1005,
            Self::ClassFull => 1006,
            Self::TierTooLow { .. } => 1007,
            Self::AlreadyBooked => 1008,
            Self::AlreadyCancelled => 1009,
            Self::NotBookingOwner => 1010,
            Self::MemberExists => 1011,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse::new(self.error_code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
