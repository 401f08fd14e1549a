use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::{ApiResponse, Meta};

/// Per-field validation messages, keyed by the request field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Hand back `value` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Invalid data")]
    Validation(FieldErrors),

    #[error("Insufficient stock, {available} available")]
    InsufficientStock { available: i32 },

    #[error("Transaction failed: {0}")]
    Transaction(#[source] sea_orm::DbErr),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(FieldErrors::single(field, message))
    }

    /// Database failures raised inside a lifecycle transaction surface as
    /// `Transaction`; domain errors keep their kind.
    pub fn into_transaction(self) -> Self {
        match self {
            AppError::OrmError(err) => AppError::Transaction(err),
            other => other,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound | AppError::RouteNotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::Transaction(_) => "transaction",
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound | AppError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::Transaction(_)
            | AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    kind: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let (fields, available, path) = match &self {
            AppError::Validation(fields) => (Some(fields.clone()), None, None),
            AppError::InsufficientStock { available } => (None, Some(*available), None),
            AppError::RouteNotFound(path) => (None, None, Some(path.clone())),
            _ => (None, None, None),
        };

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                kind: self.kind(),
                error: self.to_string(),
                fields,
                available,
                path,
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_errors_map_to_conflict_with_kind() {
        let err = AppError::InsufficientStock { available: 3 };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.kind(), "insufficient_stock");
        assert_eq!(err.to_string(), "Insufficient stock, 3 available");
    }

    #[test]
    fn orm_errors_become_transaction_errors() {
        let err = AppError::OrmError(sea_orm::DbErr::Custom("boom".into())).into_transaction();
        assert!(matches!(err, AppError::Transaction(_)));
        assert_eq!(err.kind(), "transaction");

        let err = AppError::validation("client", "required").into_transaction();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("quantity", "must be at least 1");
        errors.add("quantity", "must be an integer");
        errors.add("client", "is required");

        assert_eq!(errors.get("quantity").map(<[String]>::len), Some(2));
        assert!(errors.contains("client"));
        assert!(matches!(errors.finish(()), Err(AppError::Validation(_))));
        assert!(FieldErrors::new().finish(1).is_ok());
    }

    #[test]
    fn validation_response_is_unprocessable() {
        let response = AppError::validation("name", "is required").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_route_echoes_the_path() {
        let response = AppError::RouteNotFound("/api/nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["path"], "/api/nope");
        assert_eq!(body["data"]["kind"], "not_found");
        assert_eq!(body["message"], "No route for /api/nope");
    }
}
