//! Error types for Arrive.

use thiserror::Error;

/// A boxed error type for dynamic error handling.
///
/// Callbacks return this on failure; the dispatcher logs it and continues.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a registration was rejected.
///
/// "No matches yet" is never an error: a registration with nothing to report
/// simply waits for future batches.
#[derive(Error, Debug)]
pub enum RegisterError {
    /// The criteria specified no matchable test (e.g. an empty conjunction).
    #[error("criteria specifies no matchable test")]
    InvalidCriteria,

    /// The mutation source failed to start.
    ///
    /// Surfaced from the `register` call that triggered the lazy start, since
    /// the dispatcher cannot function without its observation primitive.
    #[error("mutation source failed to start")]
    Source(#[source] BoxError),
}
