//! Meld Core - Foundational types for the Meld isosurface renderer
//!
//! This crate provides the types that all other Meld crates depend on:
//! - `Vec3`, `Color`, and column-major matrix helpers
//! - `MeshData` - the indexed triangle mesh handed to the renderer
//! - `SceneConfig` - TOML scene configuration
//! - Error types and Result alias

mod config;
mod error;
mod mesh;
mod types;

pub use config::{
    ComputeBackend, DisplayMode, LatticeConfig, LightConfig, RenderConfig, SceneConfig,
    SourceConfig,
};
pub use error::{MeldError, Result};
pub use mesh::{MeshData, MeshStats, MeshVertex};
pub use types::{mat4_mul, transform_point, translate_scale, Color, Mat4, Vec3, MAT4_IDENTITY};
