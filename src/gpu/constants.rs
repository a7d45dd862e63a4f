//! GPU data layout and kernel constants.

/// Candidate position record stride: `(x, height, z)`.
pub(crate) const POSITION_STRIDE: u32 = 3;
/// World UV record stride.
pub(crate) const UV_STRIDE: u32 = 2;
/// Stencil position record stride.
pub(crate) const STENCIL_STRIDE: u32 = 2;

/// Class index marking a rejected or unassigned candidate.
pub(crate) const INVALID_CLASS: u32 = 0xffff_ffff;

/// Generation workgroup extent per axis.
pub(crate) const WORK_GROUP_DIM: u32 = 8;
/// Stencil positions consumed per workgroup.
pub(crate) const STENCIL_POINTS: u32 = WORK_GROUP_DIM * WORK_GROUP_DIM;
/// Candidates owned by one indexation invocation.
pub(crate) const INDEX_BLOCK: u32 = 64;

/// Accumulator value marking a candidate outside the placement region.
/// Above any reachable selection threshold, so no later class can claim it.
pub(crate) const REJECTED_ACC: f32 = 2.0;

/// UV quantization lattice for the selection hash.
pub(crate) const HASH_LATTICE: f32 = 65536.0;
/// Lattice mixing constants.
pub(crate) const HASH_MIX_A: u32 = 0x85eb_ca6b;
pub(crate) const HASH_MIX_B: u32 = 0xc2b2_ae35;
/// Avalanche finisher constants.
pub(crate) const HASH_AVALANCHE_A: u32 = 0x7feb_352d;
pub(crate) const HASH_AVALANCHE_B: u32 = 0x846c_a68b;
