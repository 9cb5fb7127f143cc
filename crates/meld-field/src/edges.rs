//! Surface vertices on crossing lattice edges

use crate::field::ScalarField;
use crate::lattice::{Axis, SampledLattice};
use meld_core::{MeldError, Result, Vec3};
use rayon::prelude::*;

/// Dense vertex ids for every crossing edge, with interpolated positions and normals.
///
/// `positions[id]` and `normals[id]` belong to the edge that received `id`.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeVertices {
    ids: Vec<[Option<u32>; 3]>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl EdgeVertices {
    /// Id of the vertex on the edge leaving lattice point `index` along `axis`
    pub fn id(&self, index: usize, axis: Axis) -> Option<u32> {
        self.ids.get(index).and_then(|slot| slot[axis.index()])
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Where along an edge with endpoint values `v0`, `v1` the field reaches `threshold`
pub fn crossing_parameter(v0: f32, v1: f32, threshold: f32) -> f32 {
    let dv = v1 - v0;
    if dv.abs() <= f32::EPSILON {
        return 0.5;
    }
    ((threshold - v0) / dv).clamp(0.0, 1.0)
}

pub struct EdgeVertexBuilder<'a> {
    field: ScalarField<'a>,
}

impl<'a> EdgeVertexBuilder<'a> {
    pub fn new(field: ScalarField<'a>) -> Self {
        Self { field }
    }

    /// Assign ids in scan order (x fastest, then y, then z; per point the
    /// x, y, z edges in turn), then place every vertex.
    pub fn build(&self, lattice: &SampledLattice) -> Result<EdgeVertices> {
        let params = lattice.params();
        let mut ids = vec![[None; 3]; params.point_count()];
        let mut crossings: Vec<(usize, Axis)> = Vec::with_capacity(lattice.active_edge_count());

        for (index, slot) in ids.iter_mut().enumerate() {
            for axis in Axis::ALL {
                if !lattice.edge_active(index, axis) {
                    continue;
                }
                let id = u32::try_from(crossings.len()).map_err(|_| {
                    MeldError::BuildError("more than u32::MAX surface vertices".into())
                })?;
                slot[axis.index()] = Some(id);
                crossings.push((index, axis));
            }
        }

        let placed: Vec<(Vec3, Vec3)> = crossings
            .par_iter()
            .map(|&(index, axis)| {
                let other = index + params.stride(axis);
                let [x0, y0, z0] = params.coords(index);
                let [x1, y1, z1] = params.coords(other);
                let p0 = params.position(x0, y0, z0);
                let p1 = params.position(x1, y1, z1);
                let t = crossing_parameter(
                    lattice.value(index),
                    lattice.value(other),
                    params.threshold,
                );
                let position = p0.lerp(&p1, t);
                (position, self.field.normal(position))
            })
            .collect();

        let (positions, normals) = placed.into_iter().unzip();
        Ok(EdgeVertices {
            ids,
            positions,
            normals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{LatticeParams, LatticeSampler};
    use crate::source::PointSource;

    fn build(sources: &[PointSource], params: &LatticeParams) -> (SampledLattice, EdgeVertices) {
        let field = ScalarField::new(sources);
        let lattice = LatticeSampler::new(field).sample(params).unwrap();
        let verts = EdgeVertexBuilder::new(field).build(&lattice).unwrap();
        (lattice, verts)
    }

    #[test]
    fn crossing_parameter_clamps() {
        assert_eq!(crossing_parameter(0.0, 1.0, 0.25), 0.25);
        assert_eq!(crossing_parameter(1.0, 0.0, 0.25), 0.75);
        assert_eq!(crossing_parameter(0.0, 1.0, 2.0), 1.0);
        assert_eq!(crossing_parameter(0.5, 0.5, 0.5), 0.5);
    }

    #[test]
    fn ids_are_dense_and_match_active_edges() {
        let sources = [
            PointSource::new(Vec3::new(0.1, 0.0, 0.0), 0.05),
            PointSource::new(Vec3::new(-0.2, 0.1, 0.1), 0.03),
        ];
        let params = LatticeParams::new([12, 10, 9], 0.5, 0.4).unwrap();
        let (lattice, verts) = build(&sources, &params);

        assert!(verts.len() > 0);
        assert_eq!(verts.len(), lattice.active_edge_count());

        let mut seen = vec![false; verts.len()];
        let mut expected = 0u32;
        for i in 0..params.point_count() {
            for axis in Axis::ALL {
                match verts.id(i, axis) {
                    Some(id) => {
                        assert!(lattice.edge_active(i, axis));
                        assert_eq!(id, expected, "ids follow scan order");
                        expected += 1;
                        assert!(!seen[id as usize]);
                        seen[id as usize] = true;
                    }
                    None => assert!(!lattice.edge_active(i, axis)),
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn vertices_lie_on_the_surface() {
        let sources = [PointSource::new(Vec3::new(0.02, -0.01, 0.03), 0.1)];
        let params = LatticeParams::new([16, 16, 16], 1.0, 0.2).unwrap();
        let (_, verts) = build(&sources, &params);
        // Inside radius is power / threshold
        for (p, n) in verts.positions.iter().zip(&verts.normals) {
            let d = p.distance(&sources[0].position);
            assert!((d - 0.5).abs() < 0.05, "distance {}", d);
            assert!((n.length() - 1.0).abs() < 1e-5);
            let outward = (*p - sources[0].position).normalized();
            assert!(n.dot(&outward) > 0.99);
        }
    }

    #[test]
    fn empty_lattice_gives_no_vertices() {
        let params = LatticeParams::new([3, 3, 3], 1.0, 0.5).unwrap();
        let (_, verts) = build(&[], &params);
        assert!(verts.is_empty());
        assert_eq!(verts.id(0, Axis::X), None);
    }
}
