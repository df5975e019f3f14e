//! Error types for the mart builder library.

use thiserror::Error;

/// Main error type for schema editing and SQL translation.
#[derive(Error, Debug)]
pub enum MartError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A structural edit would break a key/relation invariant.
    ///
    /// Raised before anything is modified, so the model is left untouched.
    #[error("Association error: {0}")]
    Association(String),

    /// An action could not be rendered by a dialect.
    #[error("Cannot translate {action} for {dialect}: {message}")]
    Construction {
        dialect: String,
        action: String,
        message: String,
    },

    /// Invariant violation inside the library (mis-wired collaborators).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Direct data access (sampling, probing) failed
    #[error("Data access error: {message}\n  Context: {context}")]
    DataAccess { context: String, message: String },

    /// PostgreSQL connection or query error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL connection or query error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] sqlx::Error),

    /// No registered dialect understands the given link
    #[error("No dialect understands {0}")]
    NoDialect(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for association errors.
pub const EXIT_ASSOCIATION_ERROR: u8 = 2;
/// Process exit code for translation errors.
pub const EXIT_CONSTRUCTION_ERROR: u8 = 3;
/// Process exit code for data access errors.
pub const EXIT_DATA_ACCESS_ERROR: u8 = 4;
/// Process exit code when no dialect matches a connection.
pub const EXIT_NO_DIALECT: u8 = 5;
/// Process exit code for internal errors.
pub const EXIT_INTERNAL_ERROR: u8 = 6;
/// Process exit code for IO errors.
pub const EXIT_IO_ERROR: u8 = 7;

impl MartError {
    /// Create a Construction error for an action rendered by a dialect.
    pub fn construction(
        dialect: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MartError::Construction {
            dialect: dialect.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    /// Create a DataAccess error with context about where it occurred
    pub fn data_access(context: impl Into<String>, message: impl Into<String>) -> Self {
        MartError::DataAccess {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Whether the error signals a programming error rather than a data condition.
    ///
    /// Fatal errors should abort the run; everything else may be reported
    /// to the user and the edit or statement retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MartError::Internal(_))
    }

    /// Map the error to a process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            MartError::Config(_) | MartError::Yaml(_) | MartError::Json(_) => EXIT_CONFIG_ERROR,
            MartError::Association(_) => EXIT_ASSOCIATION_ERROR,
            MartError::Construction { .. } => EXIT_CONSTRUCTION_ERROR,
            MartError::DataAccess { .. } | MartError::Postgres(_) => EXIT_DATA_ACCESS_ERROR,
            #[cfg(feature = "mysql")]
            MartError::Mysql(_) => EXIT_DATA_ACCESS_ERROR,
            MartError::NoDialect(_) => EXIT_NO_DIALECT,
            MartError::Internal(_) => EXIT_INTERNAL_ERROR,
            MartError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for mart builder operations.
pub type Result<T> = std::result::Result<T, MartError>;
