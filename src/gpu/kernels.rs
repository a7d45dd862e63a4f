//! GPU kernel entrypoints.

mod compaction;
mod evaluation;
mod generation;
mod sampling;

pub(crate) use compaction::{
    copy_elements, copy_kernel, indexation_assign_kernel, indexation_count_kernel,
};
pub(crate) use evaluation::evaluation_kernel;
pub(crate) use generation::generation_kernel;
