use thiserror::Error;

/// Failures raised by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query on {source_name} failed: {message}")]
    Query {
        source_name: String,
        message: String,
    },

    #[error("record store unavailable while reading {source_name}: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },

    #[error("fixture file {path}: {message}")]
    Fixture { path: String, message: String },
}

impl StoreError {
    /// Table (or fixture path) the failure originated from.
    pub fn source_name(&self) -> &str {
        match self {
            StoreError::Query { source_name, .. } | StoreError::Unavailable { source_name, .. } => {
                source_name
            }
            StoreError::Fixture { path, .. } => path,
        }
    }
}

/// Typed failure returned by the directory operations. An empty outcome is
/// never an error: it is an empty `Vec` or a `None` record.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream {source_name} unavailable: {message}")]
    UpstreamUnavailable {
        source_name: String,
        message: String,
    },
}

impl DirectoryError {
    pub fn kind(&self) -> &'static str {
        match self {
            DirectoryError::InvalidInput(_) => "invalid_input",
            DirectoryError::UpstreamUnavailable { .. } => "upstream_unavailable",
        }
    }
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        let source_name = err.source_name().to_string();
        let message = match err {
            StoreError::Query { message, .. }
            | StoreError::Unavailable { message, .. }
            | StoreError::Fixture { message, .. } => message,
        };
        DirectoryError::UpstreamUnavailable {
            source_name,
            message,
        }
    }
}
