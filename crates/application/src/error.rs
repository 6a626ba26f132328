use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::broadcaster::BroadcastError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
    #[error("authentication failed")]
    Authentication,
}

impl ApplicationError {
    /// 创建基础设施错误
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ApplicationError::Infrastructure(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
