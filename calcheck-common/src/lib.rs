//! Common types and utilities shared across Calcheck crates.
//!
//! This crate defines the shared error type and the observability helpers
//! used by the verification binary and integration tests. It is intentionally
//! lightweight so that all crates can depend on it without introducing heavy
//! transitive costs.
//!
//! - [`CalcheckError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation

use std::path::PathBuf;

pub mod observability;

/// Error types used across the verification runner.
#[derive(thiserror::Error, Debug)]
pub enum CalcheckError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The browser driver (WebDriver session, page, element) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// The screenshot artifact could not be written.
    #[error("Screenshot write failed for {path}: {source}")]
    Screenshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenient alias for results that use [`CalcheckError`].
pub type Result<T> = std::result::Result<T, CalcheckError>;
