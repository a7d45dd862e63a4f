//! CPU-side Poisson-disk stencil generation.
//!
//! The generation kernel stamps a fixed set of disk-packed positions across
//! the placement region, one tile per workgroup. Tiles abut exactly, so the
//! stencil must keep the footprint distance under toroidal wrapping for the
//! separation invariant to survive tiling.

use glam::{UVec2, Vec2};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::error::Error;

/// Per-point dart budget if none is set.
const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Seeds tried before giving up on a full stencil.
const MAX_RESEEDS: u32 = 16;

/// Uniform float in `[0, 1)`.
#[inline]
fn rand01(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

/// Dart-throwing Poisson-disk sampler over a toroidal tile.
///
/// The acceleration grid sizes its cells so the diagonal equals the
/// footprint: a colliding pair must then fall within a 3x3 cell
/// neighborhood, wrapped at the tile edges. Points exactly one footprint
/// apart are permitted; rejection is strict less-than.
#[derive(Debug, Clone)]
pub struct DiskDistributionGenerator {
    footprint: f32,
    grid_size: UVec2,
    cell_size: f32,
    bounds: Vec2,
    cells: Vec<Vec<Vec2>>,
    positions: Vec<Vec2>,
    rng: ChaCha8Rng,
    max_attempts: u32,
}

impl DiskDistributionGenerator {
    /// `grid_size` is the number of acceleration cells per axis; the tile
    /// spans `grid_size * footprint / sqrt(2)`.
    pub fn new(footprint: f32, grid_size: UVec2) -> Result<Self, Error> {
        if !footprint.is_finite() || footprint <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "footprint must be positive and finite, got {footprint}"
            )));
        }
        if grid_size.x == 0 || grid_size.y == 0 {
            return Err(Error::InvalidArgument(
                "stencil grid needs at least one cell per axis".to_owned(),
            ));
        }
        let cell_size = footprint / std::f32::consts::SQRT_2;
        Ok(Self {
            footprint,
            grid_size,
            cell_size,
            bounds: grid_size.as_vec2() * cell_size,
            cells: vec![Vec::new(); (grid_size.x * grid_size.y) as usize],
            positions: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(0),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Reseed the RNG and discard every point placed so far.
    pub fn set_seed(&mut self, seed: u32) {
        self.rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
        for cell in &mut self.cells {
            cell.clear();
        }
        self.positions.clear();
    }

    /// Per-point dart budget for [`generate`](Self::generate).
    pub fn set_max_attempts(&mut self, max_attempts: u32) {
        self.max_attempts = max_attempts.max(1);
    }

    /// Tile dimensions.
    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// Points accepted so far, in placement order.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Throw darts until one lands at least a footprint away from every
    /// existing point under toroidal wrap, or the budget runs out.
    pub fn generate(&mut self) -> Result<Vec2, Error> {
        for _ in 0..self.max_attempts {
            let candidate = Vec2::new(
                rand01(&mut self.rng) * self.bounds.x,
                rand01(&mut self.rng) * self.bounds.y,
            );
            if self.is_free(candidate) {
                let cell = self.cell_index(candidate);
                self.cells[cell].push(candidate);
                self.positions.push(candidate);
                return Ok(candidate);
            }
        }
        Err(Error::ExhaustedAttempts {
            attempts: self.max_attempts,
        })
    }

    fn cell_coords(&self, p: Vec2) -> UVec2 {
        // Float rounding can land a coordinate exactly on the far edge.
        let x = ((p.x / self.cell_size) as u32).min(self.grid_size.x - 1);
        let y = ((p.y / self.cell_size) as u32).min(self.grid_size.y - 1);
        UVec2::new(x, y)
    }

    fn cell_index(&self, p: Vec2) -> usize {
        let c = self.cell_coords(p);
        (c.y * self.grid_size.x + c.x) as usize
    }

    fn is_free(&self, p: Vec2) -> bool {
        let c = self.cell_coords(p);
        let limit = self.footprint * self.footprint;
        for dy in -1..=1i32 {
            for dx in -1..=1i32 {
                let nx = (c.x as i32 + dx).rem_euclid(self.grid_size.x as i32) as u32;
                let ny = (c.y as i32 + dy).rem_euclid(self.grid_size.y as i32) as u32;
                let cell = (ny * self.grid_size.x + nx) as usize;
                for q in &self.cells[cell] {
                    if self.toroidal_distance_sq(p, *q) < limit {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Squared distance under the minimal toroidal image.
    fn toroidal_distance_sq(&self, a: Vec2, b: Vec2) -> f32 {
        let d = (a - b).abs();
        let dx = d.x.min(self.bounds.x - d.x);
        let dy = d.y.min(self.bounds.y - d.y);
        dx * dx + dy * dy
    }
}

/// Immutable tileable stencil consumed by the generation kernel.
#[derive(Debug, Clone)]
pub struct DiskDistribution {
    positions: Vec<Vec2>,
    bounds: Vec2,
}

impl DiskDistribution {
    /// Generate `count` points with the given generator settings, retrying
    /// with successive seeds when a dart budget runs out. Deterministic for
    /// a given `base_seed`.
    pub fn generate(
        footprint: f32,
        grid_size: UVec2,
        count: usize,
        base_seed: u32,
    ) -> Result<Self, Error> {
        let mut generator = DiskDistributionGenerator::new(footprint, grid_size)?;
        let mut last_error = Error::ExhaustedAttempts { attempts: 0 };
        for attempt in 0..MAX_RESEEDS {
            generator.set_seed(base_seed.wrapping_add(attempt));
            match (0..count).try_for_each(|_| generator.generate().map(|_| ())) {
                Ok(()) => {
                    return Ok(Self {
                        positions: generator.positions().to_vec(),
                        bounds: generator.bounds(),
                    });
                }
                Err(error) => {
                    warn!(
                        seed = base_seed.wrapping_add(attempt),
                        placed = generator.positions().len(),
                        count,
                        "stencil tile did not fill, reseeding"
                    );
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }

    /// Stencil positions, each in `[0, bounds)`.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Tile dimensions.
    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// Flat `(x, y)` pairs for upload as a storage array.
    pub(crate) fn flatten(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.positions.len() * 2);
        for p in &self.positions {
            data.push(p.x);
            data.push(p.y);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toroidal_min_distance(a: Vec2, b: Vec2, bounds: Vec2) -> f32 {
        let mut best = f32::MAX;
        for dy in -1..=1i32 {
            for dx in -1..=1i32 {
                let shifted = b + Vec2::new(dx as f32 * bounds.x, dy as f32 * bounds.y);
                best = best.min(a.distance(shifted));
            }
        }
        best
    }

    #[test]
    fn generator_reports_expected_bounds() {
        let generator = DiskDistributionGenerator::new(2.0, UVec2::new(8, 4)).unwrap();
        let expected = Vec2::new(8.0, 4.0) * 2.0 / std::f32::consts::SQRT_2;
        assert!((generator.bounds() - expected).length() < 1.0e-5);
    }

    #[test]
    fn rejects_non_positive_footprint() {
        assert!(DiskDistributionGenerator::new(0.0, UVec2::splat(8)).is_err());
        assert!(DiskDistributionGenerator::new(-1.0, UVec2::splat(8)).is_err());
        assert!(DiskDistributionGenerator::new(f32::NAN, UVec2::splat(8)).is_err());
    }

    #[test]
    fn points_stay_inside_bounds() {
        let mut generator = DiskDistributionGenerator::new(1.0, UVec2::splat(24)).unwrap();
        generator.set_seed(7);
        for _ in 0..64 {
            let p = generator.generate().unwrap();
            assert!(p.x >= 0.0 && p.x < generator.bounds().x);
            assert!(p.y >= 0.0 && p.y < generator.bounds().y);
        }
    }

    #[test]
    fn points_respect_footprint_under_toroidal_wrap() {
        let mut generator = DiskDistributionGenerator::new(1.0, UVec2::splat(24)).unwrap();
        generator.set_seed(3);
        for _ in 0..64 {
            generator.generate().unwrap();
        }
        let points = generator.positions();
        let bounds = generator.bounds();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = toroidal_min_distance(points[i], points[j], bounds);
                assert!(
                    d >= 1.0 - 1.0e-4,
                    "points {i} and {j} are only {d} apart"
                );
            }
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_points() {
        let mut a = DiskDistributionGenerator::new(0.5, UVec2::splat(16)).unwrap();
        let mut b = DiskDistributionGenerator::new(0.5, UVec2::splat(16)).unwrap();
        a.set_seed(42);
        b.set_seed(42);
        for _ in 0..32 {
            assert_eq!(a.generate().unwrap(), b.generate().unwrap());
        }
    }

    #[test]
    fn reseeding_clears_accumulated_state() {
        let mut generator = DiskDistributionGenerator::new(1.0, UVec2::splat(16)).unwrap();
        generator.set_seed(1);
        for _ in 0..8 {
            generator.generate().unwrap();
        }
        assert_eq!(generator.positions().len(), 8);
        generator.set_seed(1);
        assert!(generator.positions().is_empty());
        let first = generator.generate().unwrap();
        generator.set_seed(1);
        assert_eq!(generator.generate().unwrap(), first);
    }

    #[test]
    fn overpacked_tile_exhausts_the_budget() {
        // A 2x2 grid tile holds at most a couple of points at this footprint.
        let mut generator = DiskDistributionGenerator::new(1.0, UVec2::splat(2)).unwrap();
        generator.set_seed(0);
        let placed = (0..32).take_while(|_| generator.generate().is_ok()).count();
        assert!(placed < 32, "expected exhaustion on a tiny tile");
        assert!(matches!(
            generator.generate(),
            Err(Error::ExhaustedAttempts { attempts: 100 })
        ));
    }

    #[test]
    fn distribution_retries_seeds_and_stays_deterministic() {
        let a = DiskDistribution::generate(1.0, UVec2::splat(24), 64, 0).unwrap();
        let b = DiskDistribution::generate(1.0, UVec2::splat(24), 64, 0).unwrap();
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.positions().len(), 64);
        let bounds = a.bounds();
        for i in 0..64 {
            for j in (i + 1)..64 {
                let d = toroidal_min_distance(a.positions()[i], a.positions()[j], bounds);
                assert!(d >= 1.0 - 1.0e-4);
            }
        }
    }
}
