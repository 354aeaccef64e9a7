use thiserror::Error;

/// Result alias for repository operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Result alias for secret-store client calls.
pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Faults raised by a secret-store client.
///
/// Clients classify their native failures into these buckets; the repository only
/// logs and propagates them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("access denied: {0}")]
    Unauthorized(String),
    #[error("request throttled: {0}")]
    Throttled(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("secret already exists: {0}")]
    AlreadyExists(String),
    #[error("secret not found: {0}")]
    NotFound(String),
    #[error("secret store error: {0}")]
    Other(String),
}

/// Failures reading or writing the textual form of a key document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("malformed key document: {0}")]
    Parse(String),
    #[error("key document could not be serialised: {0}")]
    Serialize(String),
}

/// Canonical repository error surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{field} must be provided")]
    InvalidArgument { field: &'static str },
    #[error("listing secrets tagged {prefix} failed: {source}")]
    Listing {
        prefix: String,
        #[source]
        source: StoreError,
    },
    #[error("fetching secret {name} failed: {source}")]
    Fetch {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("secret {name} does not hold a key document: {source}")]
    Parse {
        name: String,
        #[source]
        source: DocumentError,
    },
    #[error("key document for {name} could not be serialised: {source}")]
    Serialize {
        name: String,
        #[source]
        source: DocumentError,
    },
    #[error("creating secret {name} failed: {source}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("repository has been disposed")]
    Disposed,
}

impl Error {
    /// The store-side fault behind this error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Listing { source, .. } | Self::Fetch { source, .. } | Self::Store { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
