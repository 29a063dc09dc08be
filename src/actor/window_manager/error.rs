use thiserror::Error;

use crate::sys::backend::BackendError;

#[derive(Debug, Error)]
pub enum WindowManagerError {
    #[error("refreshing caches failed: {0}")]
    Refresh(#[source] BackendError),
    #[error("polling focus failed: {0}")]
    Focus(#[source] BackendError),
}
