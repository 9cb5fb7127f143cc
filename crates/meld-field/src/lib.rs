//! Meld Field - point-source scalar fields and marching-cubes extraction
//!
//! The stages run in order and each one only reads the output of the last:
//! - `ScalarField` sums inverse-distance potentials of `PointSource`s
//! - `LatticeSampler` evaluates the field on a regular grid (in parallel) and
//!   flags the forward edges that cross the threshold
//! - `EdgeVertexBuilder` hands out dense vertex ids in scan order and places
//!   each vertex by linear interpolation, with the gradient as its normal
//! - `CellTriangulator` looks up every cell in the case table
//! - `MeshAssembler` packs the result into a `MeshData`
//!
//! Does not depend on meld-render; the renderer uploads the finished mesh.

pub mod assemble;
pub mod edges;
pub mod field;
pub mod isosurface;
pub mod lattice;
pub mod rng;
pub mod source;
pub mod tables;
pub mod triangulate;

pub use assemble::MeshAssembler;
pub use edges::{EdgeVertexBuilder, EdgeVertices};
pub use field::ScalarField;
pub use isosurface::{build_isosurface, extract_from_lattice};
pub use lattice::{Axis, LatticeParams, LatticeSampler, SampledLattice};
pub use rng::FieldRng;
pub use source::{orbit_position, resize_lights, resize_sources, Light, PointSource};
pub use triangulate::CellTriangulator;
