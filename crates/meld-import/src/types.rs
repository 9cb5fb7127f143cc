//! Import result types

use meld_core::MeshData;

/// Result of importing an OBJ file
#[derive(Debug, Clone)]
pub struct ObjImport {
    /// Deduplicated, triangulated mesh
    pub mesh: MeshData,
    /// Texture coordinate per mesh vertex, `[0, 0]` where the file gave none
    pub uvs: Vec<[f32; 2]>,
    /// False when normals were recomputed because at least one corner had none
    pub had_normals: bool,
    /// Statements the reader does not understand
    pub skipped_lines: usize,
}
