use skein_store::StoreError;
use skein_tree::TreeError;
use skein_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<TypeError> for StreamError {
    fn from(err: TypeError) -> Self {
        Self::Tree(err.into())
    }
}

impl From<StoreError> for StreamError {
    fn from(err: StoreError) -> Self {
        Self::Tree(err.into())
    }
}

impl StreamError {
    /// Whether the caller may retry the failed operation as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Tree(err) => err.is_retryable(),
            Self::Config(_) => false,
        }
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
