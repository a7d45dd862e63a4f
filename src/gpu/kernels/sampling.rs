//! Texture fetch and position-hash helpers shared by the placement kernels.

use cubecl::prelude::*;

use crate::gpu::constants::*;

#[cube]
pub(super) fn clamp01(v: f32) -> f32 {
    let zero = f32::new(0.0);
    let one = f32::new(1.0);
    if v < zero {
        zero
    } else if v > one {
        one
    } else {
        v
    }
}

/// Bilinear fetch of the red channel with UVs clamped to the texture edge.
#[cube]
pub(super) fn sample_bilinear_r(
    texels: &Array<f32>,
    width: u32,
    height: u32,
    u: f32,
    v: f32,
) -> f32 {
    let half = f32::new(0.5);
    let zero = f32::new(0.0);

    // Texel centers sit at (i + 0.5) / extent; clamp into [0, extent - 1]
    // so the edge rows repeat outward.
    let max_x = f32::cast_from(width - 1);
    let max_y = f32::cast_from(height - 1);
    let mut fx = clamp01(u) * f32::cast_from(width) - half;
    let mut fy = clamp01(v) * f32::cast_from(height) - half;
    if fx < zero {
        fx = zero;
    } else if fx > max_x {
        fx = max_x;
    }
    if fy < zero {
        fy = zero;
    } else if fy > max_y {
        fy = max_y;
    }

    let x0i = fx.floor() as i32;
    let y0i = fy.floor() as i32;
    let x0 = x0i as u32;
    let y0 = y0i as u32;
    let tx = fx - f32::cast_from(x0);
    let ty = fy - f32::cast_from(y0);
    let mut x1 = x0 + 1;
    if x1 > width - 1 {
        x1 = width - 1;
    }
    let mut y1 = y0 + 1;
    if y1 > height - 1 {
        y1 = height - 1;
    }

    let t00 = texels[(y0 * width + x0) as usize];
    let t10 = texels[(y0 * width + x1) as usize];
    let t01 = texels[(y1 * width + x0) as usize];
    let t11 = texels[(y1 * width + x1) as usize];

    let a = t00 + (t10 - t00) * tx;
    let b = t01 + (t11 - t01) * tx;
    a + (b - a) * ty
}

/// Deterministic value in `[0, 1)` derived from a world UV.
///
/// The UV is snapped to a 1/65536 lattice, so the result is a pure function
/// of position: dispatch order and workgroup shape cannot affect it. Integer
/// arithmetic wraps on the GPU, which the avalanche relies on.
#[cube]
pub(super) fn hash01(u: f32, v: f32) -> f32 {
    let qui = (u * f32::new(HASH_LATTICE)).floor() as i32;
    let qvi = (v * f32::new(HASH_LATTICE)).floor() as i32;
    let qu = qui as u32;
    let qv = qvi as u32;
    let mut h = (qu * HASH_MIX_A) ^ (qv * HASH_MIX_B);
    h = h ^ (h >> 16);
    h = h * HASH_AVALANCHE_A;
    h = h ^ (h >> 15);
    h = h * HASH_AVALANCHE_B;
    h = h ^ (h >> 16);
    // 23-bit mantissa conversion keeps the result strictly below one.
    f32::cast_from(h >> 9) * f32::new(1.0 / 8_388_608.0)
}
