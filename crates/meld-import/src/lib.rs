//! Meld Import - mesh file formats
//!
//! Reads and writes the geometry subset of Wavefront OBJ. Imported meshes
//! share `MeshData` with the isosurface builder, so decoration models and the
//! extracted surface go through the same upload path.

mod obj;
mod types;

pub use obj::{load_obj, parse_obj, save_obj, write_obj};
pub use types::ObjImport;
