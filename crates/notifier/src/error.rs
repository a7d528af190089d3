use thiserror::Error;

use fanout_common::error::AppError;

/// Queue lifecycle misuse. Delivery failures are never surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotifierError {
    #[error("notification queue is closed")]
    QueueClosed,

    #[error("notification workers already started")]
    AlreadyStarted,
}

impl From<NotifierError> for AppError {
    fn from(err: NotifierError) -> Self {
        AppError::Unavailable(err.to_string())
    }
}
