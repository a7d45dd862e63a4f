//! proc-placement: GPU-driven scattering of objects over heightmapped terrain.
//!
//! Given a heightmapped world, one or more density maps, and a per-class
//! minimum separation ("footprint"), the crate computes non-overlapping point
//! placements on the GPU. A CPU-side Poisson-disk sampler produces a
//! toroidally tileable stencil; four CubeCL compute passes stamp it across
//! the requested region, assign classes by density-weighted selection, and
//! compact the survivors into class-contiguous output buffers.

mod error;
mod gpu;
mod pipeline;
mod stencil;
mod world;

pub use error::Error;
pub use pipeline::{ElementBuffer, Placement, PlacementPipeline};
pub use stencil::{DiskDistribution, DiskDistributionGenerator};
pub use world::{DensityMap, Element, LayerData, TextureData, WorldData};
