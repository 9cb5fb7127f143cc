//! Packs surface vertices and triangles into a `MeshData`

use crate::edges::EdgeVertices;
use meld_core::{Color, MeshData, MeshVertex, Result};

pub struct MeshAssembler {
    color: Color,
}

impl MeshAssembler {
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    /// Fails with a build error if any index is out of range; nothing is
    /// returned half-built.
    pub fn assemble(&self, vertices: EdgeVertices, triangles: Vec<[u32; 3]>) -> Result<MeshData> {
        let packed = vertices
            .positions
            .into_iter()
            .zip(vertices.normals)
            .map(|(position, normal)| MeshVertex {
                position,
                normal,
                color: self.color,
            })
            .collect();
        MeshData::from_parts(packed, triangles)
    }
}

impl Default for MeshAssembler {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::EdgeVertexBuilder;
    use crate::field::ScalarField;
    use crate::lattice::{LatticeParams, SampledLattice};
    use meld_core::MeldError;

    fn corner_vertices() -> EdgeVertices {
        let params = LatticeParams::new([1, 1, 1], 1.0, 0.5).unwrap();
        let mut values = vec![0.0; 8];
        values[0] = 1.0;
        let lattice = SampledLattice::from_values(params, values).unwrap();
        EdgeVertexBuilder::new(ScalarField::new(&[]))
            .build(&lattice)
            .unwrap()
    }

    #[test]
    fn assembles_colored_vertices() {
        let color = Color::new(0.2, 0.4, 0.6);
        let mesh = MeshAssembler::new(color)
            .assemble(corner_vertices(), vec![[0, 2, 1]])
            .unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.vertices.iter().all(|v| v.color == color));
    }

    #[test]
    fn rejects_index_past_vertex_count() {
        let err = MeshAssembler::default()
            .assemble(corner_vertices(), vec![[0, 1, 3]])
            .unwrap_err();
        assert!(matches!(err, MeldError::BuildError(_)));
    }
}
