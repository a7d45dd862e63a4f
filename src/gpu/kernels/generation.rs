//! Candidate generation kernel.

use cubecl::prelude::*;

use super::sampling::sample_bilinear_r;
use crate::gpu::constants::*;

/// Stamp the stencil across the workgroup grid, one candidate per invocation.
///
/// Each 8x8 workgroup owns one stencil tile; tiles abut at exactly the
/// stencil bounds, so the toroidal collision-freedom of the stencil carries
/// the footprint separation across workgroup seams. The kernel records the
/// world position with sampled terrain height, the world UV, a zeroed
/// selection accumulator, and an unassigned class.
#[cube(launch_unchecked)]
pub(crate) fn generation_kernel(
    stencil: &Array<f32>,
    heightmap: &Array<f32>,
    heightmap_width: u32,
    heightmap_height: u32,
    world_scale_x: f32,
    world_scale_y: f32,
    world_scale_z: f32,
    lower_x: f32,
    lower_y: f32,
    stencil_bounds_x: f32,
    stencil_bounds_y: f32,
    grid_x: u32,
    grid_y: u32,
    positions: &mut Array<f32>,
    world_uvs: &mut Array<f32>,
    densities: &mut Array<f32>,
    classes: &mut Array<u32>,
) {
    let gx = ABSOLUTE_POS_X;
    let gy = ABSOLUTE_POS_Y;
    if gx >= grid_x || gy >= grid_y {
        terminate!();
    }

    let lx = gx % WORK_GROUP_DIM;
    let ly = gy % WORK_GROUP_DIM;
    let wx = gx / WORK_GROUP_DIM;
    let wy = gy / WORK_GROUP_DIM;

    let stencil_base = ((ly * WORK_GROUP_DIM + lx) * STENCIL_STRIDE) as usize;
    let sx = stencil[stencil_base];
    let sy = stencil[stencil_base + 1];

    let x = lower_x + f32::cast_from(wx) * stencil_bounds_x + sx;
    let z = lower_y + f32::cast_from(wy) * stencil_bounds_y + sy;

    let u = x / world_scale_x;
    let v = z / world_scale_z;
    let height =
        sample_bilinear_r(heightmap, heightmap_width, heightmap_height, u, v) * world_scale_y;

    let idx = gy * grid_x + gx;
    let pos_base = (idx * POSITION_STRIDE) as usize;
    positions[pos_base] = x;
    positions[pos_base + 1] = height;
    positions[pos_base + 2] = z;

    let uv_base = (idx * UV_STRIDE) as usize;
    world_uvs[uv_base] = u;
    world_uvs[uv_base + 1] = v;

    densities[idx as usize] = f32::new(0.0);
    classes[idx as usize] = INVALID_CLASS;
}
