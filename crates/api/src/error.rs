// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::{FieldError, IntoFieldError, ScalarValue, graphql_value};
use thiserror::Error;

/// Failures surfaced to the API caller, tagged with a machine-readable kind.
///
/// Validation outcomes of the join classifier (BACKWARDS, FULL, ...) are
/// *not* errors; they are returned as plain values. These variants cover the
/// hard failures only.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    InvariantViolation(String),
    #[error("{0}")]
    CapacityExceeded(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("database error: {0}")]
    Database(diesel::result::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            ApiError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            ApiError::InvalidTransition(_) => "INVALID_TRANSITION",
            ApiError::Internal(_) | ApiError::Database(_) => "INTERNAL",
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => ApiError::NotFound("record not found".to_string()),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::InvalidTransition("a conflicting record already exists".to_string()),
            other => ApiError::Database(other),
        }
    }
}

impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::NotFound(format!("malformed identifier: {err}"))
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(err: argon2::password_hash::Error) -> Self {
        ApiError::Internal(format!("password hashing failed: {err}"))
    }
}

impl From<crate::graphql::auth::JwtValidationError> for ApiError {
    fn from(err: crate::graphql::auth::JwtValidationError) -> Self {
        ApiError::Unauthorized(format!("invalid token: {err}"))
    }
}

impl From<crate::graphql::auth::JwtGenerationError> for ApiError {
    fn from(err: crate::graphql::auth::JwtGenerationError) -> Self {
        ApiError::Internal(format!("token generation failed: {err}"))
    }
}

impl<S: ScalarValue> IntoFieldError<S> for ApiError {
    fn into_field_error(self) -> FieldError<S> {
        let kind = self.kind();
        if matches!(self, ApiError::Database(_) | ApiError::Internal(_)) {
            tracing::error!("request failed: {self}");
        }
        FieldError::new(self.to_string(), graphql_value!({ "kind": (kind) }))
    }
}
