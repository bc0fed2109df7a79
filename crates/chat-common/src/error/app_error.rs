//! Application error types
//!
//! Errors raised while assembling and running the relay process: storage that
//! cannot be reached, a listener that cannot bind.

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
