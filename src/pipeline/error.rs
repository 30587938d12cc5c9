use std::sync::Arc;
use thiserror::Error;

use crate::platform::PlatformError;

/// Why a feed could not be built.
///
/// Either kind aborts the whole build; there is no partial feed on error.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The platform has no album with this id
    #[error("Album not found: {0}")]
    NotFound(String),
    /// A remote call failed (network, status, timeout, or malformed body)
    #[error("Transport error: {0}")]
    Transport(#[from] PlatformError),
    /// An error produced by another caller's cached computation
    #[error(transparent)]
    Shared(Arc<FeedError>),
}

/// Coarse classification of [`FeedError`], stable across cache sharing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Transport,
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::NotFound(_) => ErrorKind::NotFound,
            FeedError::Transport(_) => ErrorKind::Transport,
            FeedError::Shared(inner) => inner.kind(),
        }
    }
}

/// Unwraps an error coming out of the cache when this caller was its only holder.
impl From<Arc<FeedError>> for FeedError {
    fn from(shared: Arc<FeedError>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(FeedError::Shared)
    }
}
