use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{entries::EntryError, repos::RepoError},
    infra::error::InfraError,
};

/// Diagnostic detail carried in response extensions for the logging layer.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map a store failure that escaped the service layer.
    pub fn from_repo(source: &'static str, err: &RepoError) -> Self {
        let (status, message) = match err {
            RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
            RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Duplicate record"),
            RepoError::Timeout | RepoError::Persistence(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
            }
        };
        Self::from_error(source, status, message, err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<EntryError> for HttpError {
    fn from(error: EntryError) -> Self {
        const SOURCE: &str = "application::error::entry_error_to_http_error";
        match error {
            EntryError::NotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Entry not found",
                "entry lookup did not resolve",
            ),
            EntryError::Validation(errors) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                errors.to_string(),
            ),
            EntryError::Repo(err) => HttpError::from_repo(SOURCE, &err),
        }
    }
}

/// Failures that abort the binary before or while serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_failures_surface_as_unavailable() {
        let err = HttpError::from_repo("test", &RepoError::from_persistence("connection reset"));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_entries_surface_as_not_found() {
        let err = HttpError::from(EntryError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn startup_failures_keep_the_infra_message() {
        let err = AppError::from(InfraError::configuration("database url is not configured"));
        assert_eq!(
            err.to_string(),
            "configuration error: database url is not configured"
        );
    }
}
