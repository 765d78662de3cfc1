//! Error types for the low-rank imputer.

use thiserror::Error;

use crate::completion::Completion;

/// Errors raised by matrix completion.
///
/// Every variant except [`CompletionError::Convergence`] and
/// [`CompletionError::Decomposition`] is a precondition failure detected
/// before the first iteration.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// Malformed input or parameter (tolerance, iteration cap, matrix shape,
    /// non-finite observed values).
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of the offending parameter
        reason: String,
    },

    /// Requested rank lies outside `[1, min(n, p)]`.
    #[error("Invalid rank {rank}: must lie in [1, {max_rank}]")]
    InvalidRank { rank: usize, max_rank: usize },

    /// A column has no observed entry, so its initial fill is undefined.
    #[error("Insufficient data: column {column} has no observed entries")]
    InsufficientData { column: usize },

    /// The iteration cap was reached before the relative error fell to the
    /// tolerance.
    ///
    /// `partial` holds the estimate and trace at the moment the cap was hit.
    /// It is a best-effort diagnostic, not a converged result.
    #[error(
        "Did not converge within {iterations} iterations (last relative error {last_relative_error:e})"
    )]
    Convergence {
        iterations: usize,
        last_relative_error: f64,
        partial: Box<Completion>,
    },

    /// The SVD backend failed or produced non-finite output.
    #[error("Singular value decomposition failed: {reason}")]
    Decomposition {
        /// Backend error message
        reason: String,
    },
}

impl CompletionError {
    pub fn invalid_parameter<S: Into<String>>(reason: S) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    pub fn decomposition<S: Into<String>>(reason: S) -> Self {
        Self::Decomposition {
            reason: reason.into(),
        }
    }

    /// Best-effort result attached to a convergence failure.
    pub fn partial(&self) -> Option<&Completion> {
        match self {
            Self::Convergence { partial, .. } => Some(partial.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompletionError>;
