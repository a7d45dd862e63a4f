//! GPU placement pipeline.

use cubecl::prelude::*;
use cubecl::wgpu::{WgpuDevice, WgpuRuntime};
use glam::{UVec2, Vec2};
use tracing::debug;

use crate::error::Error;
use crate::gpu;
use crate::gpu::constants::{
    INDEX_BLOCK, POSITION_STRIDE, STENCIL_POINTS, UV_STRIDE, WORK_GROUP_DIM,
};
use crate::stencil::DiskDistribution;
use crate::world::{LayerData, WorldData};

use super::result::{ElementBuffer, Placement};
use super::utils::div_ceil;

/// Acceleration cells per axis for the stencil tile.
const STENCIL_GRID: UVec2 = UVec2::new(24, 24);
/// Base RNG seed for stencil construction.
const STENCIL_SEED: u32 = 0;
/// Slack on the density scale sum check.
const SCALE_SUM_EPSILON: f32 = 1.0e-4;
/// Workgroups per dispatch dimension accepted by the WGPU backend.
const MAX_DISPATCH_DIM: u32 = 65_535;
/// 1D dispatch budget: workgroups per dimension times invocations per group.
const MAX_LINEAR_INVOCATIONS: u64 = MAX_DISPATCH_DIM as u64 * 256;

/// GPU placement pipeline over the WGPU runtime.
///
/// Owns the per-footprint stencil cache; kernels are compiled and cached by
/// the runtime on first launch. `compute_placement` takes `&mut self` and is
/// not reentrant; the caller serializes invocations.
pub struct PlacementPipeline {
    device: WgpuDevice,
    stencil: Option<(f32, DiskDistribution)>,
}

impl PlacementPipeline {
    /// Construct a pipeline on the default WGPU device.
    pub fn new() -> Self {
        Self::with_device(WgpuDevice::default())
    }

    /// Construct a pipeline with a caller-provided device.
    pub fn with_device(device: WgpuDevice) -> Self {
        Self {
            device,
            stencil: None,
        }
    }

    /// Allocate a device-side element buffer usable as a copy destination.
    pub fn create_element_buffer(&self, len: usize) -> ElementBuffer {
        ElementBuffer::new(&self.device, len)
    }

    /// Compute a placement over `[lower_bound, upper_bound)`.
    ///
    /// Launches are enqueued without waiting for completion; per-class count
    /// readbacks synchronize mid-call, the element payload only when the
    /// returned [`Placement`] is read. Zero- or negative-area regions yield
    /// an empty placement, not an error.
    pub fn compute_placement(
        &mut self,
        world: &WorldData,
        layer: &LayerData,
        lower_bound: Vec2,
        upper_bound: Vec2,
    ) -> Result<Placement, Error> {
        validate(world, layer)?;

        let num_classes = layer.densitymaps.len();
        if upper_bound.x <= lower_bound.x || upper_bound.y <= lower_bound.y {
            return Ok(Placement::empty(self.device.clone(), num_classes));
        }

        let stencil = self.stencil_for(layer.footprint)?;
        let stencil_bounds = stencil.bounds();

        let extent = upper_bound - lower_bound;
        let num_work_groups = UVec2::new(
            (extent.x / stencil_bounds.x).ceil() as u32,
            (extent.y / stencil_bounds.y).ceil() as u32,
        )
        .max(UVec2::ONE);
        if num_work_groups.x > MAX_DISPATCH_DIM || num_work_groups.y > MAX_DISPATCH_DIM {
            return Err(Error::InvalidArgument(format!(
                "placement region needs a {}x{} workgroup grid, above the dispatch limit of {MAX_DISPATCH_DIM}",
                num_work_groups.x, num_work_groups.y
            )));
        }
        let grid = num_work_groups * WORK_GROUP_DIM;
        let total = grid.x as u64 * grid.y as u64;
        if total > MAX_LINEAR_INVOCATIONS {
            return Err(Error::InvalidArgument(format!(
                "placement region needs {total} candidates, above the dispatch budget of {MAX_LINEAR_INVOCATIONS}"
            )));
        }
        let candidate_count = total as u32;
        let n = candidate_count as usize;

        debug!(
            work_groups_x = num_work_groups.x,
            work_groups_y = num_work_groups.y,
            candidate_count,
            num_classes,
            "dispatching placement"
        );

        let client = WgpuRuntime::client(&self.device);

        let stencil_data = stencil.flatten();
        let stencil_handle = client.create_from_slice(f32::as_bytes(&stencil_data));
        let heightmap_handle = client.create_from_slice(f32::as_bytes(&world.heightmap.texels));

        let pos_len = n * POSITION_STRIDE as usize;
        let uv_len = n * UV_STRIDE as usize;
        let positions_handle = client.empty(pos_len * core::mem::size_of::<f32>());
        let uvs_handle = client.empty(uv_len * core::mem::size_of::<f32>());
        let densities_handle = client.empty(n * core::mem::size_of::<f32>());
        let classes_handle = client.empty(n * core::mem::size_of::<u32>());
        let indices_handle = client.empty(n * core::mem::size_of::<u32>());
        let out_positions_handle = client.empty(pos_len * core::mem::size_of::<f32>());
        let out_classes_handle = client.empty(n * core::mem::size_of::<u32>());

        let block_count = div_ceil(candidate_count, INDEX_BLOCK);
        let block_totals_handle = client.empty(block_count as usize * core::mem::size_of::<u32>());

        let mut class_counts = Vec::with_capacity(num_classes);

        unsafe {
            let gen_dim = CubeDim::new_2d(WORK_GROUP_DIM, WORK_GROUP_DIM);
            let gen_count = CubeCount::new_2d(num_work_groups.x, num_work_groups.y);
            gpu::generation_kernel::launch_unchecked::<WgpuRuntime>(
                &client,
                gen_count,
                gen_dim,
                ArrayArg::from_raw_parts::<f32>(&stencil_handle, stencil_data.len(), 1),
                ArrayArg::from_raw_parts::<f32>(&heightmap_handle, world.heightmap.texels.len(), 1),
                ScalarArg::new(world.heightmap.width),
                ScalarArg::new(world.heightmap.height),
                ScalarArg::new(world.scale.x),
                ScalarArg::new(world.scale.y),
                ScalarArg::new(world.scale.z),
                ScalarArg::new(lower_bound.x),
                ScalarArg::new(lower_bound.y),
                ScalarArg::new(stencil_bounds.x),
                ScalarArg::new(stencil_bounds.y),
                ScalarArg::new(grid.x),
                ScalarArg::new(grid.y),
                ArrayArg::from_raw_parts::<f32>(&positions_handle, pos_len, 1),
                ArrayArg::from_raw_parts::<f32>(&uvs_handle, uv_len, 1),
                ArrayArg::from_raw_parts::<f32>(&densities_handle, n, 1),
                ArrayArg::from_raw_parts::<u32>(&classes_handle, n, 1),
            )
            .map_err(Error::Launch)?;

            let linear_dim = CubeDim::new_1d(256);
            let eval_count = CubeCount::new_1d(div_ceil(candidate_count, linear_dim.x));
            for (class, map) in layer.densitymaps.iter().enumerate() {
                let density_handle = client.create_from_slice(f32::as_bytes(&map.texture.texels));
                gpu::evaluation_kernel::launch_unchecked::<WgpuRuntime>(
                    &client,
                    eval_count.clone(),
                    linear_dim,
                    ArrayArg::from_raw_parts::<f32>(&positions_handle, pos_len, 1),
                    ArrayArg::from_raw_parts::<f32>(&uvs_handle, uv_len, 1),
                    ArrayArg::from_raw_parts::<f32>(&density_handle, map.texture.texels.len(), 1),
                    ScalarArg::new(map.texture.width),
                    ScalarArg::new(map.texture.height),
                    ScalarArg::new(candidate_count),
                    ScalarArg::new(class as u32),
                    ScalarArg::new(map.scale),
                    ScalarArg::new(lower_bound.x),
                    ScalarArg::new(lower_bound.y),
                    ScalarArg::new(upper_bound.x),
                    ScalarArg::new(upper_bound.y),
                    ArrayArg::from_raw_parts::<f32>(&densities_handle, n, 1),
                    ArrayArg::from_raw_parts::<u32>(&classes_handle, n, 1),
                )
                .map_err(Error::Launch)?;
            }

            // Compact class by class, chaining base offsets on the host so
            // each class lands in its own contiguous output range. Block
            // totals are scanned on the host, which keeps slot assignment a
            // pure function of candidate order.
            let index_count = CubeCount::new_1d(div_ceil(block_count, linear_dim.x));
            let copy_count = CubeCount::new_1d(div_ceil(candidate_count, linear_dim.x));
            let mut base = 0u32;
            for class in 0..num_classes {
                gpu::indexation_count_kernel::launch_unchecked::<WgpuRuntime>(
                    &client,
                    index_count.clone(),
                    linear_dim,
                    ArrayArg::from_raw_parts::<u32>(&classes_handle, n, 1),
                    ScalarArg::new(candidate_count),
                    ScalarArg::new(class as u32),
                    ArrayArg::from_raw_parts::<u32>(&block_totals_handle, block_count as usize, 1),
                )
                .map_err(Error::Launch)?;

                let totals_bytes = client.read_one(block_totals_handle.clone());
                let block_totals = u32::from_bytes(&totals_bytes);
                let mut block_bases = Vec::with_capacity(block_count as usize);
                let mut class_count = 0u32;
                for &total in &block_totals[..block_count as usize] {
                    block_bases.push(class_count);
                    class_count += total;
                }
                let block_bases_handle = client.create_from_slice(u32::as_bytes(&block_bases));

                gpu::indexation_assign_kernel::launch_unchecked::<WgpuRuntime>(
                    &client,
                    index_count.clone(),
                    linear_dim,
                    ArrayArg::from_raw_parts::<u32>(&classes_handle, n, 1),
                    ArrayArg::from_raw_parts::<u32>(&block_bases_handle, block_count as usize, 1),
                    ScalarArg::new(candidate_count),
                    ScalarArg::new(class as u32),
                    ArrayArg::from_raw_parts::<u32>(&indices_handle, n, 1),
                )
                .map_err(Error::Launch)?;

                gpu::copy_kernel::launch_unchecked::<WgpuRuntime>(
                    &client,
                    copy_count.clone(),
                    linear_dim,
                    ArrayArg::from_raw_parts::<f32>(&positions_handle, pos_len, 1),
                    ArrayArg::from_raw_parts::<u32>(&classes_handle, n, 1),
                    ArrayArg::from_raw_parts::<u32>(&indices_handle, n, 1),
                    ScalarArg::new(candidate_count),
                    ScalarArg::new(base),
                    ArrayArg::from_raw_parts::<f32>(&out_positions_handle, pos_len, 1),
                    ArrayArg::from_raw_parts::<u32>(&out_classes_handle, n, 1),
                )
                .map_err(Error::Launch)?;

                class_counts.push(class_count as usize);
                base += class_count;
            }
        }

        debug!(elements = class_counts.iter().sum::<usize>(), "placement complete");

        Ok(Placement::new(
            self.device.clone(),
            out_positions_handle,
            out_classes_handle,
            n,
            class_counts,
        ))
    }

    /// Reuse or rebuild the cached stencil for this footprint.
    fn stencil_for(&mut self, footprint: f32) -> Result<DiskDistribution, Error> {
        if let Some((cached, stencil)) = &self.stencil {
            if *cached == footprint {
                return Ok(stencil.clone());
            }
        }
        let stencil = DiskDistribution::generate(
            footprint,
            STENCIL_GRID,
            STENCIL_POINTS as usize,
            STENCIL_SEED,
        )?;
        self.stencil = Some((footprint, stencil.clone()));
        Ok(stencil)
    }
}

impl Default for PlacementPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(world: &WorldData, layer: &LayerData) -> Result<(), Error> {
    if !layer.footprint.is_finite() || layer.footprint <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "footprint must be positive and finite, got {}",
            layer.footprint
        )));
    }
    if !world.scale.is_finite() || world.scale.x <= 0.0 || world.scale.z <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "world scale must be finite with positive x and z, got {}",
            world.scale
        )));
    }
    world.heightmap.validate("heightmap")?;

    let mut scale_sum = 0.0f32;
    for (class, map) in layer.densitymaps.iter().enumerate() {
        if !map.scale.is_finite() || !(0.0..=1.0).contains(&map.scale) {
            return Err(Error::InvalidArgument(format!(
                "density scale for class {class} must lie in [0, 1], got {}",
                map.scale
            )));
        }
        map.texture.validate(&format!("density map {class}"))?;
        scale_sum += map.scale;
    }
    if scale_sum > 1.0 + SCALE_SUM_EPSILON {
        return Err(Error::InvalidArgument(format!(
            "density scales sum to {scale_sum}, must not exceed 1"
        )));
    }
    Ok(())
}
