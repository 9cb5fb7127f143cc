//! Regular sampling lattice and per-vertex edge classification

use crate::field::ScalarField;
use meld_core::{LatticeConfig, MeldError, Result, Vec3};
use rayon::prelude::*;

/// Direction of a forward lattice edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Order in which edges of one lattice vertex receive ids
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub const fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// Lattice extent and iso-threshold
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeParams {
    /// Cells per axis; the lattice has `resolution + 1` points per axis
    pub resolution: [u32; 3],
    pub half_extent: f32,
    pub threshold: f32,
}

impl LatticeParams {
    pub fn new(resolution: [u32; 3], half_extent: f32, threshold: f32) -> Result<Self> {
        let params = Self {
            resolution,
            half_extent,
            threshold,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn from_config(config: &LatticeConfig) -> Result<Self> {
        Self::new(config.resolution, config.half_extent, config.threshold)
    }

    pub fn validate(&self) -> Result<()> {
        for (axis, &n) in ["x", "y", "z"].iter().zip(&self.resolution) {
            if n == 0 {
                return Err(MeldError::ValueOutOfRange {
                    field: format!("resolution.{}", axis),
                    min: 1.0,
                    max: u32::MAX as f64,
                    value: 0.0,
                });
            }
        }
        let points = self.resolution.iter().try_fold(1usize, |total, &n| {
            (n as usize).checked_add(1).and_then(|p| total.checked_mul(p))
        });
        if points.is_none() {
            let requested: f64 = self.resolution.iter().map(|&n| n as f64 + 1.0).product();
            return Err(MeldError::ValueOutOfRange {
                field: "resolution".to_string(),
                min: 1.0,
                max: usize::MAX as f64,
                value: requested,
            });
        }
        if !(self.half_extent > 0.0 && self.half_extent.is_finite()) {
            return Err(MeldError::ConfigError(format!(
                "half extent must be positive, got {}",
                self.half_extent
            )));
        }
        if !self.threshold.is_finite() {
            return Err(MeldError::ConfigError(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Lattice points per axis
    pub fn points(&self) -> [usize; 3] {
        [
            self.resolution[0] as usize + 1,
            self.resolution[1] as usize + 1,
            self.resolution[2] as usize + 1,
        ]
    }

    pub fn point_count(&self) -> usize {
        let [px, py, pz] = self.points();
        px * py * pz
    }

    pub fn cell_count(&self) -> usize {
        self.resolution.iter().map(|&n| n as usize).product()
    }

    /// Spacing between neighbouring lattice points on each axis
    pub fn step(&self) -> Vec3 {
        let span = 2.0 * self.half_extent;
        Vec3::new(
            span / self.resolution[0] as f32,
            span / self.resolution[1] as f32,
            span / self.resolution[2] as f32,
        )
    }

    /// Flat index, x fastest then y then z
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let [px, py, _] = self.points();
        x as usize + px * (y as usize + py * z as usize)
    }

    pub fn coords(&self, index: usize) -> [u32; 3] {
        let [px, py, _] = self.points();
        [
            (index % px) as u32,
            ((index / px) % py) as u32,
            (index / (px * py)) as u32,
        ]
    }

    pub fn position(&self, x: u32, y: u32, z: u32) -> Vec3 {
        let step = self.step();
        let r = self.half_extent;
        Vec3::new(
            -r + x as f32 * step.x,
            -r + y as f32 * step.y,
            -r + z as f32 * step.z,
        )
    }

    /// Flat-index distance to the next point along `axis`
    pub fn stride(&self, axis: Axis) -> usize {
        let [px, py, _] = self.points();
        match axis {
            Axis::X => 1,
            Axis::Y => px,
            Axis::Z => px * py,
        }
    }
}

/// Field values at every lattice point plus the forward-edge crossing flags.
///
/// Bit `axis.bit()` of `edge_flags[i]` is set when the edge from point `i`
/// along `axis` has one endpoint inside (value >= threshold) and one outside.
/// Edges that would leave the lattice are never flagged.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledLattice {
    params: LatticeParams,
    values: Vec<f32>,
    edge_flags: Vec<u8>,
}

impl SampledLattice {
    /// Classify edges for values produced elsewhere
    pub fn from_values(params: LatticeParams, values: Vec<f32>) -> Result<Self> {
        if values.len() != params.point_count() {
            return Err(MeldError::BuildError(format!(
                "expected {} lattice values, got {}",
                params.point_count(),
                values.len()
            )));
        }
        let edge_flags = (0..values.len())
            .into_par_iter()
            .map(|i| classify_point(&params, &values, i))
            .collect();
        Ok(Self {
            params,
            values,
            edge_flags,
        })
    }

    /// Accept values and flags computed by a device kernel, checking them against each other
    pub fn from_parts(params: LatticeParams, values: Vec<f32>, edge_flags: Vec<u8>) -> Result<Self> {
        let lattice = Self::from_values(params, values)?;
        if lattice.edge_flags != edge_flags {
            let first = lattice
                .edge_flags
                .iter()
                .zip(&edge_flags)
                .position(|(a, b)| a != b)
                .unwrap_or(lattice.edge_flags.len().min(edge_flags.len()));
            return Err(MeldError::BuildError(format!(
                "edge flags disagree with lattice values at point {}",
                first
            )));
        }
        Ok(lattice)
    }

    pub fn params(&self) -> &LatticeParams {
        &self.params
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn edge_flags(&self) -> &[u8] {
        &self.edge_flags
    }

    pub fn value(&self, index: usize) -> f32 {
        self.values[index]
    }

    pub fn is_inside(&self, index: usize) -> bool {
        self.values[index] >= self.params.threshold
    }

    pub fn edge_active(&self, index: usize, axis: Axis) -> bool {
        self.edge_flags[index] & axis.bit() != 0
    }

    pub fn active_edge_count(&self) -> usize {
        self.edge_flags
            .iter()
            .map(|f| f.count_ones() as usize)
            .sum()
    }
}

fn classify_point(params: &LatticeParams, values: &[f32], index: usize) -> u8 {
    let coords = params.coords(index);
    let inside = values[index] >= params.threshold;
    let mut flags = 0u8;
    for axis in Axis::ALL {
        if coords[axis.index()] >= params.resolution[axis.index()] {
            continue;
        }
        let other = values[index + params.stride(axis)] >= params.threshold;
        if inside != other {
            flags |= axis.bit();
        }
    }
    flags
}

/// Samples a scalar field over a lattice, one independent evaluation per point
pub struct LatticeSampler<'a> {
    field: ScalarField<'a>,
}

impl<'a> LatticeSampler<'a> {
    pub fn new(field: ScalarField<'a>) -> Self {
        Self { field }
    }

    pub fn sample(&self, params: &LatticeParams) -> Result<SampledLattice> {
        params.validate()?;
        let values: Vec<f32> = (0..params.point_count())
            .into_par_iter()
            .map(|i| {
                let [x, y, z] = params.coords(i);
                self.field.evaluate(params.position(x, y, z))
            })
            .collect();
        SampledLattice::from_values(params.clone(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PointSource;

    #[test]
    fn index_and_coords_agree() {
        let params = LatticeParams::new([3, 4, 2], 1.0, 0.5).unwrap();
        assert_eq!(params.point_count(), 4 * 5 * 3);
        for i in 0..params.point_count() {
            let [x, y, z] = params.coords(i);
            assert_eq!(params.index(x, y, z), i);
        }
        assert_eq!(params.index(1, 0, 0), 1);
        assert_eq!(params.index(0, 1, 0), 4);
        assert_eq!(params.index(0, 0, 1), 20);
    }

    #[test]
    fn positions_span_the_extent() {
        let params = LatticeParams::new([4, 2, 8], 0.5, 0.0).unwrap();
        assert_eq!(params.position(0, 0, 0), Vec3::splat(-0.5));
        let far = params.position(4, 2, 8);
        assert!((far - Vec3::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn zero_resolution_rejected() {
        assert!(LatticeParams::new([2, 0, 2], 1.0, 0.5).is_err());
        assert!(LatticeParams::new([2, 2, 2], 0.0, 0.5).is_err());
        assert!(LatticeParams::new([2, 2, 2], 1.0, f32::NAN).is_err());
    }

    #[test]
    fn unaddressable_point_count_rejected() {
        match LatticeParams::new([u32::MAX; 3], 1.0, 0.5) {
            Err(MeldError::ValueOutOfRange { field, .. }) => assert_eq!(field, "resolution"),
            other => panic!("unexpected result: {:?}", other),
        }
        let params = LatticeParams::new([255, 255, 255], 1.0, 0.5).unwrap();
        assert_eq!(params.point_count(), 256 * 256 * 256);
    }

    #[test]
    fn no_sources_no_active_edges() {
        let params = LatticeParams::new([4, 4, 4], 1.0, 0.1).unwrap();
        let lattice = LatticeSampler::new(ScalarField::new(&[]))
            .sample(&params)
            .unwrap();
        assert!(lattice.values().iter().all(|&v| v == 0.0));
        assert_eq!(lattice.active_edge_count(), 0);
    }

    #[test]
    fn single_source_membership() {
        // Unit power at the origin with threshold 1: inside iff distance <= 1
        let sources = [PointSource::new(Vec3::ZERO, 1.0)];
        let params = LatticeParams::new([2, 2, 2], 1.0, 1.0).unwrap();
        let lattice = LatticeSampler::new(ScalarField::new(&sources))
            .sample(&params)
            .unwrap();

        assert!(lattice.is_inside(params.index(1, 1, 1)));
        // Face centers sit exactly on the threshold and count as inside
        assert!(lattice.is_inside(params.index(0, 1, 1)));
        assert!(lattice.is_inside(params.index(1, 2, 1)));
        // Edge midpoints and corners are outside
        assert!(!lattice.is_inside(params.index(0, 0, 1)));
        assert!(!lattice.is_inside(params.index(2, 2, 2)));
        assert!(!lattice.is_inside(params.index(0, 0, 0)));

        let inside = (0..params.point_count())
            .filter(|&i| lattice.is_inside(i))
            .count();
        assert_eq!(inside, 7);
    }

    #[test]
    fn single_cell_all_corners_outside() {
        let sources = [PointSource::new(Vec3::ZERO, 1.0)];
        let params = LatticeParams::new([1, 1, 1], 1.0, 1.0).unwrap();
        let lattice = LatticeSampler::new(ScalarField::new(&sources))
            .sample(&params)
            .unwrap();
        assert_eq!(lattice.values().len(), 8);
        assert!((0..8).all(|i| !lattice.is_inside(i)));
        assert_eq!(lattice.active_edge_count(), 0);
    }

    #[test]
    fn boundary_edges_never_flagged() {
        let sources = [PointSource::new(Vec3::new(0.9, 0.9, 0.9), 1.0)];
        let params = LatticeParams::new([3, 3, 3], 1.0, 2.0).unwrap();
        let lattice = LatticeSampler::new(ScalarField::new(&sources))
            .sample(&params)
            .unwrap();
        assert!(lattice.active_edge_count() > 0);
        for i in 0..params.point_count() {
            let c = params.coords(i);
            for axis in Axis::ALL {
                if c[axis.index()] == params.resolution[axis.index()] {
                    assert!(!lattice.edge_active(i, axis));
                }
            }
        }
    }

    #[test]
    fn flags_match_memberships() {
        let sources = [
            PointSource::new(Vec3::new(0.3, 0.0, 0.1), 0.2),
            PointSource::new(Vec3::new(-0.4, 0.2, -0.1), 0.3),
        ];
        let params = LatticeParams::new([6, 5, 7], 1.0, 0.6).unwrap();
        let lattice = LatticeSampler::new(ScalarField::new(&sources))
            .sample(&params)
            .unwrap();
        for i in 0..params.point_count() {
            let c = params.coords(i);
            for axis in Axis::ALL {
                if c[axis.index()] < params.resolution[axis.index()] {
                    let j = i + params.stride(axis);
                    assert_eq!(
                        lattice.edge_active(i, axis),
                        lattice.is_inside(i) != lattice.is_inside(j)
                    );
                }
            }
        }
    }

    #[test]
    fn from_parts_rejects_mismatched_flags() {
        let params = LatticeParams::new([1, 1, 1], 1.0, 0.5).unwrap();
        let values = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let good = SampledLattice::from_values(params.clone(), values.clone()).unwrap();
        assert_eq!(good.edge_flags()[0], 0b111);

        let err = SampledLattice::from_parts(params.clone(), values.clone(), vec![0; 8]).unwrap_err();
        assert!(matches!(err, MeldError::BuildError(_)));
        assert!(SampledLattice::from_parts(params, values, good.edge_flags().to_vec()).is_ok());
    }
}
