//! Per-cell triangulation through the marching-cubes case table

use crate::edges::EdgeVertices;
use crate::lattice::SampledLattice;
use crate::tables::{triangles_for, CORNER_OFFSETS, EDGE_LATTICE};
use meld_core::{MeldError, Result};
use rayon::prelude::*;

pub struct CellTriangulator<'a> {
    lattice: &'a SampledLattice,
    vertices: &'a EdgeVertices,
}

impl<'a> CellTriangulator<'a> {
    pub fn new(lattice: &'a SampledLattice, vertices: &'a EdgeVertices) -> Self {
        Self { lattice, vertices }
    }

    /// 8-bit corner configuration of the cell whose lowest corner is `(x, y, z)`.
    /// Bit `c` is set when corner `c` is outside the surface.
    pub fn configuration(&self, x: u32, y: u32, z: u32) -> u8 {
        let params = self.lattice.params();
        let mut config = 0u8;
        for (c, [dx, dy, dz]) in CORNER_OFFSETS.iter().enumerate() {
            let index = params.index(x + dx, y + dy, z + dz);
            if !self.lattice.is_inside(index) {
                config |= 1 << c;
            }
        }
        config
    }

    /// Append the triangles of one cell to `out`
    pub fn triangulate_cell(&self, x: u32, y: u32, z: u32, out: &mut Vec<[u32; 3]>) -> Result<()> {
        let config = self.configuration(x, y, z);
        let params = self.lattice.params();
        for tri in triangles_for(config) {
            let mut ids = [0u32; 3];
            for (slot, &edge) in ids.iter_mut().zip(&tri) {
                let ([ox, oy, oz], axis) = EDGE_LATTICE[edge as usize];
                let index = params.index(x + ox, y + oy, z + oz);
                *slot = self.vertices.id(index, axis).ok_or_else(|| {
                    MeldError::BuildError(format!(
                        "cell ({}, {}, {}) with configuration {:#04x} needs edge {} but it has no vertex",
                        x, y, z, config, edge
                    ))
                })?;
            }
            out.push(ids);
        }
        Ok(())
    }

    /// Triangulate every cell. Z-slabs run in parallel and are concatenated in
    /// slab order, so the result does not depend on scheduling.
    pub fn triangulate(&self) -> Result<Vec<[u32; 3]>> {
        let [nx, ny, nz] = self.lattice.params().resolution;
        let slabs: Vec<Vec<[u32; 3]>> = (0..nz)
            .into_par_iter()
            .map(|z| {
                let mut slab = Vec::new();
                for y in 0..ny {
                    for x in 0..nx {
                        self.triangulate_cell(x, y, z, &mut slab)?;
                    }
                }
                Ok(slab)
            })
            .collect::<Result<_>>()?;
        Ok(slabs.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::EdgeVertexBuilder;
    use crate::field::ScalarField;
    use crate::lattice::{LatticeParams, LatticeSampler};
    use crate::source::PointSource;
    use meld_core::Vec3;

    fn lattice_from(params: LatticeParams, values: Vec<f32>) -> (SampledLattice, EdgeVertices) {
        let lattice = SampledLattice::from_values(params, values).unwrap();
        let verts = EdgeVertexBuilder::new(ScalarField::new(&[]))
            .build(&lattice)
            .unwrap();
        (lattice, verts)
    }

    #[test]
    fn uniform_cells_emit_nothing() {
        let params = LatticeParams::new([1, 1, 1], 1.0, 0.5).unwrap();

        let (lattice, verts) = lattice_from(params.clone(), vec![1.0; 8]);
        let tri = CellTriangulator::new(&lattice, &verts);
        assert_eq!(tri.configuration(0, 0, 0), 0);
        assert!(tri.triangulate().unwrap().is_empty());

        let (lattice, verts) = lattice_from(params, vec![0.0; 8]);
        let tri = CellTriangulator::new(&lattice, &verts);
        assert_eq!(tri.configuration(0, 0, 0), 255);
        assert!(tri.triangulate().unwrap().is_empty());
    }

    #[test]
    fn single_inside_corner_gives_one_triangle() {
        let params = LatticeParams::new([1, 1, 1], 1.0, 0.5).unwrap();
        let mut values = vec![0.0; 8];
        values[params.index(0, 0, 0)] = 1.0;
        let (lattice, verts) = lattice_from(params, values);
        assert_eq!(verts.len(), 3);

        let tri = CellTriangulator::new(&lattice, &verts);
        assert_eq!(tri.configuration(0, 0, 0), 0xFE);
        let tris = tri.triangulate().unwrap();
        assert_eq!(tris.len(), 1);
        let mut ids = tris[0].to_vec();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn missing_vertex_is_a_build_error() {
        let params = LatticeParams::new([1, 1, 1], 1.0, 0.5).unwrap();
        let mut values = vec![0.0; 8];
        values[0] = 1.0;
        let (lattice, _) = lattice_from(params.clone(), values);
        // Vertices built for a lattice with no crossings
        let (_, empty) = lattice_from(params, vec![0.0; 8]);
        let err = CellTriangulator::new(&lattice, &empty)
            .triangulate()
            .unwrap_err();
        assert!(matches!(err, MeldError::BuildError(_)));
    }

    #[test]
    fn triangles_face_away_from_the_source() {
        let center = Vec3::new(0.01, 0.02, -0.015);
        let sources = [PointSource::new(center, 0.1)];
        let field = ScalarField::new(&sources);
        let params = LatticeParams::new([14, 14, 14], 1.0, 0.2).unwrap();
        let lattice = LatticeSampler::new(field).sample(&params).unwrap();
        let verts = EdgeVertexBuilder::new(field).build(&lattice).unwrap();
        let tris = CellTriangulator::new(&lattice, &verts).triangulate().unwrap();
        assert!(!tris.is_empty());

        for t in &tris {
            let [a, b, c] = t.map(|i| verts.positions[i as usize]);
            let face = (b - a).cross(&(c - a));
            if face.length() < 1e-9 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            assert!(face.dot(&(centroid - center)) > 0.0, "triangle {:?} winds inward", t);
        }
    }
}
