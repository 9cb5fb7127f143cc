//! Scene configuration loaded from TOML

use crate::error::{MeldError, Result};
use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the frame is shaded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Forward shading with every light bound as a uniform
    #[default]
    Scene,
    /// G-buffer pass followed by additive light volumes
    DeferredLights,
}

impl DisplayMode {
    pub const ALL: [&'static str; 2] = ["scene", "deferred_lights"];

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "scene" => Ok(DisplayMode::Scene),
            "deferred" | "deferred_lights" => Ok(DisplayMode::DeferredLights),
            other => Err(MeldError::InvalidEnumValue {
                value: other.to_string(),
                allowed: Self::ALL.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

/// Where lattice sampling runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeBackend {
    #[default]
    Cpu,
    Gpu,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Cells along x, y, z
    pub resolution: [u32; 3],
    /// The lattice spans `[-half_extent, half_extent]` on every axis
    pub half_extent: f32,
    pub threshold: f32,
    pub backend: ComputeBackend,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            resolution: [40, 40, 40],
            half_extent: 0.4,
            threshold: 0.2,
            backend: ComputeBackend::Cpu,
        }
    }
}

impl LatticeConfig {
    /// Range checks shared by config loading and runtime resolution changes
    pub fn validate(&self) -> Result<()> {
        let max_res = SceneConfig::MAX_RESOLUTION as f64;
        for (axis, &n) in ["x", "y", "z"].iter().zip(&self.resolution) {
            check_range(
                &format!("lattice.resolution.{}", axis),
                n as f64,
                1.0,
                max_res,
            )?;
        }
        check_range("lattice.half_extent", self.half_extent as f64, 1e-6, 1e6)?;
        if !self.threshold.is_finite() {
            return Err(MeldError::ConfigError(
                "lattice.threshold must be a finite number".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub count: u32,
    pub seed: u32,
    /// Distance of the orbit from the origin
    pub orbit_radius: f32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            count: 3,
            seed: 1,
            orbit_radius: 0.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub count: u32,
    pub seed: u32,
    pub power: f32,
    /// Light-volume radius; the light has no effect beyond it
    pub radius: f32,
    pub orbit_radius: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            count: 4,
            seed: 7,
            power: 0.04,
            radius: 0.1,
            orbit_radius: 0.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub display_mode: DisplayMode,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Camera distance used for navigation step sizes
    pub view_range: f32,
    pub ambient: Color,
    pub background: Color,
    pub surface_color: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            display_mode: DisplayMode::Scene,
            fov: 60.0,
            near: 0.005,
            far: 100.0,
            view_range: 0.2,
            ambient: Color::new(0.08, 0.08, 0.1),
            background: Color::new(0.02, 0.02, 0.03),
            surface_color: Color::from_hex(0xC8D2E6),
        }
    }
}

/// Everything needed to build and draw a scene
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub lattice: LatticeConfig,
    pub sources: SourceConfig,
    pub lights: LightConfig,
    pub render: RenderConfig,
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(MeldError::ValueOutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        })
    }
}

impl SceneConfig {
    pub const MAX_RESOLUTION: u32 = 256;
    pub const MAX_SOURCES: u32 = 64;
    pub const MAX_LIGHTS: u32 = 256;

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SceneConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.lattice.validate()?;
        check_range(
            "sources.count",
            self.sources.count as f64,
            0.0,
            Self::MAX_SOURCES as f64,
        )?;
        check_range(
            "lights.count",
            self.lights.count as f64,
            0.0,
            Self::MAX_LIGHTS as f64,
        )?;
        check_range("lights.power", self.lights.power as f64, 0.0, 1e6)?;
        check_range("lights.radius", self.lights.radius as f64, 1e-6, 1e6)?;
        check_range("render.width", self.render.width as f64, 1.0, 8192.0)?;
        check_range("render.height", self.render.height as f64, 1.0, 8192.0)?;
        check_range("render.fov", self.render.fov as f64, 1.0, 179.0)?;
        if !(self.render.near > 0.0 && self.render.far > self.render.near) {
            return Err(MeldError::ConfigError(format!(
                "render.near ({}) must be positive and below render.far ({})",
                self.render.near, self.render.far
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.lattice.resolution, [40, 40, 40]);
        assert_eq!(config.render.display_mode, DisplayMode::Scene);
    }

    #[test]
    fn test_partial_document() {
        let config = SceneConfig::from_toml_str(
            r#"
[lattice]
resolution = [8, 16, 4]
threshold = 0.5
backend = "gpu"

[render]
display_mode = "deferred_lights"
"#,
        )
        .unwrap();
        assert_eq!(config.lattice.resolution, [8, 16, 4]);
        assert_eq!(config.lattice.threshold, 0.5);
        assert_eq!(config.lattice.backend, ComputeBackend::Gpu);
        assert_eq!(config.lattice.half_extent, 0.4);
        assert_eq!(config.render.display_mode, DisplayMode::DeferredLights);
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let err = SceneConfig::from_toml_str("[lattice]\nresolution = [0, 4, 4]\n").unwrap_err();
        match err {
            MeldError::ValueOutOfRange { field, .. } => assert_eq!(field, "lattice.resolution.x"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolution_above_max_rejected() {
        let mut lattice = LatticeConfig::default();
        lattice.resolution = [8, SceneConfig::MAX_RESOLUTION + 1, 8];
        match lattice.validate().unwrap_err() {
            MeldError::ValueOutOfRange { field, max, .. } => {
                assert_eq!(field, "lattice.resolution.y");
                assert_eq!(max, SceneConfig::MAX_RESOLUTION as f64);
            }
            other => panic!("unexpected error: {}", other),
        }
        lattice.resolution = [SceneConfig::MAX_RESOLUTION; 3];
        assert!(lattice.validate().is_ok());
    }

    #[test]
    fn test_bad_near_far_rejected() {
        let err = SceneConfig::from_toml_str("[render]\nnear = 2.0\nfar = 1.0\n").unwrap_err();
        assert!(matches!(err, MeldError::ConfigError(_)));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = SceneConfig::default();
        config.sources.count = 9;
        config.render.display_mode = DisplayMode::DeferredLights;
        let text = config.to_toml_string().unwrap();
        assert_eq!(SceneConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_display_mode_parse() {
        assert_eq!(DisplayMode::parse("deferred").unwrap(), DisplayMode::DeferredLights);
        assert!(matches!(
            DisplayMode::parse("wireframe"),
            Err(MeldError::InvalidEnumValue { .. })
        ));
    }
}
