//! Error types for placement computation.

use cubecl::prelude::LaunchError;
use thiserror::Error as ErrorDerive;

/// Failure conditions surfaced by the placement pipeline and the disk sampler.
#[derive(Debug, ErrorDerive)]
pub enum Error {
    /// Input data is inconsistent or exceeds pipeline limits.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The dart-throwing budget ran out before a free position was found.
    #[error("no free position found within {attempts} attempts")]
    ExhaustedAttempts { attempts: u32 },

    /// GPU kernel compilation or dispatch failed.
    #[error("kernel launch failed: {0:?}")]
    Launch(#[from] LaunchError),
}
