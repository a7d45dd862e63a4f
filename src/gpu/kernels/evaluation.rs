//! Class evaluation kernel.

use cubecl::prelude::*;

use super::sampling::{hash01, sample_bilinear_r};
use crate::gpu::constants::*;

/// Density-weighted class selection for one class over every candidate.
///
/// Runs once per class in layer order. The accumulator carries the selection
/// CDF lower bound across passes: a candidate is claimed by the first class
/// whose cumulative interval contains its position hash. An accumulator
/// above one marks a candidate outside the placement region; no later pass
/// can claim it.
#[cube(launch_unchecked)]
pub(crate) fn evaluation_kernel(
    positions: &Array<f32>,
    world_uvs: &Array<f32>,
    densitymap: &Array<f32>,
    densitymap_width: u32,
    densitymap_height: u32,
    candidate_count: u32,
    class_index: u32,
    class_scale: f32,
    lower_x: f32,
    lower_y: f32,
    upper_x: f32,
    upper_y: f32,
    densities: &mut Array<f32>,
    classes: &mut Array<u32>,
) {
    let idx = ABSOLUTE_POS;
    if idx >= candidate_count as usize {
        terminate!();
    }
    if classes[idx] != INVALID_CLASS {
        terminate!();
    }

    let candidate = idx as u32;
    let pos_base = (candidate * POSITION_STRIDE) as usize;
    let x = positions[pos_base];
    let z = positions[pos_base + 2];
    if x < lower_x || z < lower_y || x >= upper_x || z >= upper_y {
        densities[idx] = f32::new(REJECTED_ACC);
        terminate!();
    }

    let uv_base = (candidate * UV_STRIDE) as usize;
    let u = world_uvs[uv_base];
    let v = world_uvs[uv_base + 1];

    let r = hash01(u, v);
    let d = sample_bilinear_r(densitymap, densitymap_width, densitymap_height, u, v);
    let acc = densities[idx];
    let acc_next = acc + d * class_scale;
    if r >= acc && r < acc_next {
        classes[idx] = class_index;
    }
    densities[idx] = acc_next;
}
