//! Compaction kernels: per-class index computation, scatter copy, and
//! element range copies for device-side result access.
//!
//! Compaction runs in two passes per class: a per-block match count, then a
//! slot assignment from exclusively scanned block bases. Slots depend only
//! on candidate order, never on workgroup scheduling, so identical inputs
//! compact identically.

use cubecl::prelude::*;

use crate::gpu::constants::*;

/// Count how many candidates in each 64-candidate block match the class.
#[cube(launch_unchecked)]
pub(crate) fn indexation_count_kernel(
    classes: &Array<u32>,
    candidate_count: u32,
    class_index: u32,
    block_totals: &mut Array<u32>,
) {
    let block = ABSOLUTE_POS;
    let num_blocks = (candidate_count + INDEX_BLOCK - 1) / INDEX_BLOCK;
    if block >= num_blocks as usize {
        terminate!();
    }

    let one = u32::new(1);
    let first = (block as u32) * INDEX_BLOCK;
    let mut last = first + INDEX_BLOCK;
    if last > candidate_count {
        last = candidate_count;
    }

    let mut total = u32::new(0);
    for i in first..last {
        if classes[i as usize] == class_index {
            total += one;
        }
    }
    block_totals[block] = total;
}

/// Assign compaction slots from precomputed block bases.
///
/// Each invocation owns one block: it walks the block in order, handing out
/// ascending slots starting at the block's base. Matching candidates get
/// unique, candidate-ordered slots; the rest get the sentinel.
#[cube(launch_unchecked)]
pub(crate) fn indexation_assign_kernel(
    classes: &Array<u32>,
    block_bases: &Array<u32>,
    candidate_count: u32,
    class_index: u32,
    indices: &mut Array<u32>,
) {
    let block = ABSOLUTE_POS;
    let num_blocks = (candidate_count + INDEX_BLOCK - 1) / INDEX_BLOCK;
    if block >= num_blocks as usize {
        terminate!();
    }

    let one = u32::new(1);
    let first = (block as u32) * INDEX_BLOCK;
    let mut last = first + INDEX_BLOCK;
    if last > candidate_count {
        last = candidate_count;
    }

    let mut cursor = block_bases[block];
    for i in first..last {
        if classes[i as usize] == class_index {
            indices[i as usize] = cursor;
            cursor += one;
        } else {
            indices[i as usize] = INVALID_CLASS;
        }
    }
}

/// Scatter one candidate into its compacted output slot.
///
/// Indices are unique by construction, so every write is address-disjoint.
#[cube(launch_unchecked)]
pub(crate) fn copy_kernel(
    positions: &Array<f32>,
    classes: &Array<u32>,
    indices: &Array<u32>,
    candidate_count: u32,
    output_base: u32,
    out_positions: &mut Array<f32>,
    out_classes: &mut Array<u32>,
) {
    let idx = ABSOLUTE_POS;
    if idx >= candidate_count as usize {
        terminate!();
    }
    let slot = indices[idx];
    if slot == INVALID_CLASS {
        terminate!();
    }

    let dst = output_base + slot;
    let src_base = ((idx as u32) * POSITION_STRIDE) as usize;
    let dst_base = (dst * POSITION_STRIDE) as usize;
    out_positions[dst_base] = positions[src_base];
    out_positions[dst_base + 1] = positions[src_base + 1];
    out_positions[dst_base + 2] = positions[src_base + 2];
    out_classes[dst as usize] = classes[idx];
}

/// Copy a contiguous element range between output buffers.
#[cube(launch_unchecked)]
pub(crate) fn copy_elements(
    src_positions: &Array<f32>,
    src_classes: &Array<u32>,
    element_count: u32,
    src_offset: u32,
    dst_offset: u32,
    dst_positions: &mut Array<f32>,
    dst_classes: &mut Array<u32>,
) {
    let idx = ABSOLUTE_POS;
    if idx >= element_count as usize {
        terminate!();
    }

    let src = src_offset + idx as u32;
    let dst = dst_offset + idx as u32;
    let src_base = (src * POSITION_STRIDE) as usize;
    let dst_base = (dst * POSITION_STRIDE) as usize;
    dst_positions[dst_base] = src_positions[src_base];
    dst_positions[dst_base + 1] = src_positions[src_base + 1];
    dst_positions[dst_base + 2] = src_positions[src_base + 2];
    dst_classes[dst as usize] = src_classes[src as usize];
}
