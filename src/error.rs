//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message sent whenever an authorizer or a hook leaves the request unauthorized.
pub const UNAUTHORIZED_MESSAGE: &str = "UNAUTHORIZED ACCESS IS NOT ALLOWED";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid default identifier: scope {scope} column {column}")]
    InvalidIdentifier { scope: String, column: String },
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures raised by a data access layer.
#[derive(Error, Debug)]
pub enum DalError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("record rejected: {0}")]
    Rejected(String),
    #[error("storage: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Dal(#[from] DalError),
    /// Failure signalled by an injected behavior or authorizer; passed through verbatim.
    #[error("{0}")]
    Hook(String),
}

impl AppError {
    pub fn hook(reason: impl Into<String>) -> Self {
        AppError::Hook(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Dal(_) | AppError::Hook(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reason shown to the caller. Storage and config internals stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Dal(_) => "data access failure".to_string(),
            AppError::Config(_) => "endpoint configuration failure".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    #[serde(rename = "Code")]
    pub code: u16,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Error")]
    pub error: String,
}

/// A pipeline failure: the fixed endpoint message plus the stage error that caused it.
#[derive(Debug)]
pub struct EndpointError {
    pub message: &'static str,
    pub source: AppError,
}

impl EndpointError {
    pub fn new(message: &'static str, source: AppError) -> Self {
        EndpointError { message, source }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let status = self.source.status();
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.source.client_message(),
            error: self.message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.client_message(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
