use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use validator::ValidationErrors;

pub mod auth;
pub mod country_log;
pub mod expense;
pub mod filters;
pub mod meeting;
pub mod notification;
pub mod query_cache;
pub mod session;
pub mod task;
pub mod view;

#[cfg(test)]
pub(crate) mod test_util;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input was invalid: {0}")]
    Invalid(ValidationErrors),
    #[error("requested data does not exist")]
    DoesNotExist,
    #[error("failed to {action}: {message}")]
    Rejected { action: String, message: String },
    #[error("the session expired, log in again: {0}")]
    SessionExpired(String),
    #[error("failed to {action} due to a communication failure: {cause}")]
    RemoteFailure {
        action: String,
        #[source]
        cause: anyhow::Error,
    },
}

impl From<ValidationErrors> for Error {
    fn from(value: ValidationErrors) -> Self {
        Self::Invalid(value)
    }
}

/// Failure reported by a driven port talking to the backend
#[derive(Error, Debug)]
pub enum DrivenPortError {
    #[error("a communication failure occurred: {0}")]
    CommsFailure(anyhow::Error),
    #[error("the requested data does not exist")]
    DoesNotExist,
    #[error("the server rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("the session expired: {0}")]
    SessionExpired(String),
}

impl From<anyhow::Error> for DrivenPortError {
    fn from(value: anyhow::Error) -> Self {
        Self::CommsFailure(value)
    }
}

impl DrivenPortError {
    /// Converts this DrivenPortError to a domain error with some extra info on the [action]
    /// being taken when communicating over the port
    pub(crate) fn into_error_trying_to(self, action: &str) -> Error {
        match self {
            Self::DoesNotExist => Error::DoesNotExist,
            Self::Rejected { message, .. } => Error::Rejected {
                action: action.into(),
                message,
            },
            Self::SessionExpired(reason) => Error::SessionExpired(reason),
            Self::CommsFailure(err) => Error::RemoteFailure {
                action: action.into(),
                cause: err,
            },
        }
    }
}

static LAST_TEMPORARY_ID: AtomicI64 = AtomicI64::new(0);

/// Temporary ID of an optimistically inserted item until the server assigns a real one. Based on
/// milliseconds since the Unix epoch and strictly increasing, so two inserts in the same
/// millisecond get different IDs.
pub(crate) fn temporary_id() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let next = |last: i64| last.max(now - 1) + 1;
    match LAST_TEMPORARY_ID.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last))) {
        Ok(last) | Err(last) => next(last),
    }
}
