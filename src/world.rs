//! Input data model and the output element record.

use glam::Vec3;

use crate::error::Error;

/// Single-channel texture payload consumed by the placement kernels.
///
/// Decoding image files is the caller's concern; the pipeline takes raw
/// red-channel luminance in row-major order and uploads it as a storage
/// array. Sampling is bilinear with UVs clamped to the edge.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// Texture width in texels.
    pub width: u32,
    /// Texture height in texels.
    pub height: u32,
    /// Row-major red-channel values, length `width * height`.
    pub texels: Vec<f32>,
}

impl TextureData {
    /// Wrap a raw luminance grid.
    pub fn new(width: u32, height: u32, texels: Vec<f32>) -> Self {
        Self {
            width,
            height,
            texels,
        }
    }

    /// Uniform one-texel texture. A constant heightmap or density map.
    pub fn solid(value: f32) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![value],
        }
    }

    pub(crate) fn validate(&self, what: &str) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidArgument(format!(
                "{what} has a zero dimension ({}x{})",
                self.width, self.height
            )));
        }
        let expected = self.width as usize * self.height as usize;
        if self.texels.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "{what} holds {} texels, expected {expected} for {}x{}",
                self.texels.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// World extents and the heightmap they map onto.
///
/// A horizontal world position `(x, z)` maps to UV `(x / scale.x,
/// z / scale.z)`; heightmap values are multiplied by `scale.y`.
#[derive(Debug, Clone)]
pub struct WorldData {
    /// World dimensions mapped onto the heightmap's UV square.
    pub scale: Vec3,
    /// Terrain height field, red channel in `[0, 1]`.
    pub heightmap: TextureData,
}

impl WorldData {
    pub fn new(scale: Vec3, heightmap: TextureData) -> Self {
        Self { scale, heightmap }
    }
}

/// One placement class: a density texture and the probability mass assigned
/// to it.
#[derive(Debug, Clone)]
pub struct DensityMap {
    /// Per-location placement weight, red channel in `[0, 1]`.
    pub texture: TextureData,
    /// Share of the selection probability given to this class, in `[0, 1]`.
    pub scale: f32,
}

/// Per-layer placement parameters.
///
/// Density scales across all classes must sum to at most one; the remainder
/// is the probability that a candidate stays unplaced.
#[derive(Debug, Clone)]
pub struct LayerData {
    /// Minimum distance between any two placed points, in world units.
    pub footprint: f32,
    /// Ordered list of placement classes.
    pub densitymaps: Vec<DensityMap>,
}

impl LayerData {
    pub fn new(footprint: f32) -> Self {
        Self {
            footprint,
            densitymaps: Vec::new(),
        }
    }

    /// Append a class backed by `texture` with selection mass `scale`.
    pub fn with_densitymap(mut self, texture: TextureData, scale: f32) -> Self {
        self.densitymaps.push(DensityMap { texture, scale });
        self
    }
}

/// Compacted placement output record.
///
/// `position.y` is the sampled terrain height; the separation constraint
/// applies to the XZ plane only. The layout is `#[repr(C)]` and 16 bytes
/// (vec3 plus trailing scalar), matching std430 shader storage.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    /// World position, `(x, height, z)`.
    pub position: Vec3,
    /// Index into the layer's density map list.
    pub class_index: u32,
}

impl Element {
    /// Class index value marking a rejected or unassigned candidate.
    pub const INVALID_CLASS: u32 = u32::MAX;

    /// Whether this element was assigned to a class.
    pub fn is_valid(&self) -> bool {
        self.class_index != Self::INVALID_CLASS
    }
}
