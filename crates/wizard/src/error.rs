use shared::domain::{OrderId, SessionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} has expired")]
    Expired(SessionId),
    #[error("session store failure: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Failures the wizard cannot resolve by redisplaying a step.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    SessionUnavailable(#[from] SessionError),
    #[error("catalog lookup failed: {0}")]
    Catalog(anyhow::Error),
    #[error("order could not be stored: {0}")]
    Persistence(anyhow::Error),
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
}

/// Why confirming a draft into an order failed. Nothing is stored on either path.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("order could not be stored: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<CommitError> for WizardError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Session(err) => WizardError::SessionUnavailable(err),
            CommitError::Store(err) => WizardError::Persistence(err),
        }
    }
}
