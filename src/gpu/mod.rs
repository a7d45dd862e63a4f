//! GPU kernels for candidate generation, evaluation, and compaction.

pub(crate) mod constants;
mod kernels;

pub(crate) use kernels::*;
