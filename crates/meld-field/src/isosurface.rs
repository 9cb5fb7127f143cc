//! End-to-end isosurface extraction

use crate::assemble::MeshAssembler;
use crate::edges::EdgeVertexBuilder;
use crate::field::ScalarField;
use crate::lattice::{LatticeParams, LatticeSampler, SampledLattice};
use crate::source::PointSource;
use crate::triangulate::CellTriangulator;
use meld_core::{Color, MeshData, Result};
use std::time::Instant;

/// Sample the field of `sources` on the CPU and extract its isosurface
pub fn build_isosurface(
    sources: &[PointSource],
    params: &LatticeParams,
    color: Color,
) -> Result<MeshData> {
    let start = Instant::now();
    let field = ScalarField::new(sources);
    let lattice = LatticeSampler::new(field).sample(params)?;
    log::debug!(
        "sampled {} lattice points in {:.2?}",
        params.point_count(),
        start.elapsed()
    );
    extract_from_lattice(sources, &lattice, color)
}

/// Extract the isosurface from an already sampled lattice.
///
/// The lattice may come from a device kernel; vertex normals still use the
/// analytic gradient of `sources`.
pub fn extract_from_lattice(
    sources: &[PointSource],
    lattice: &SampledLattice,
    color: Color,
) -> Result<MeshData> {
    let start = Instant::now();
    let field = ScalarField::new(sources);

    let vertices = EdgeVertexBuilder::new(field).build(lattice)?;
    let triangles = CellTriangulator::new(lattice, &vertices).triangulate()?;
    let mesh = MeshAssembler::new(color).assemble(vertices, triangles)?;

    log::debug!(
        "isosurface: {} cells, {} vertices, {} triangles in {:.2?}",
        lattice.params().cell_count(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        start.elapsed()
    );
    Ok(mesh)
}
