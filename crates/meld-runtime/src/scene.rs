//! Mutable scene state: sources, lights, lattice parameters, and pending work

use crate::clock::AnimationClock;
use crate::event::{EventQueue, SceneEvent};
use meld_core::{MeldError, MeshData, Result, SceneConfig};
use meld_field::{
    build_isosurface, resize_lights, resize_sources, FieldRng, LatticeParams, Light, PointSource,
};

/// Everything the host window owns between frames.
///
/// Parameter changes and animation ticks only raise requests; the host
/// decides when to act on them via [`take_rebuild_request`](Self::take_rebuild_request)
/// and [`take_redraw_request`](Self::take_redraw_request).
pub struct Scene {
    pub config: SceneConfig,
    pub sources: Vec<PointSource>,
    pub lights: Vec<Light>,
    pub clock: AnimationClock,
    source_rng: FieldRng,
    light_rng: FieldRng,
    rebuild_requested: bool,
    redraw_requested: bool,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Result<Self> {
        config.validate()?;
        let mut scene = Self {
            source_rng: FieldRng::new(config.sources.seed),
            light_rng: FieldRng::new(config.lights.seed),
            config,
            sources: Vec::new(),
            lights: Vec::new(),
            clock: AnimationClock::new(),
            rebuild_requested: true,
            redraw_requested: true,
        };
        scene.resize_sources(scene.config.sources.count);
        scene.resize_lights(scene.config.lights.count);
        scene.animate();
        Ok(scene)
    }

    pub fn lattice_params(&self) -> Result<LatticeParams> {
        LatticeParams::from_config(&self.config.lattice)
    }

    fn resize_sources(&mut self, count: u32) {
        resize_sources(
            &mut self.sources,
            count as usize,
            &mut self.source_rng,
            self.config.sources.orbit_radius,
        );
        self.config.sources.count = count;
    }

    fn resize_lights(&mut self, count: u32) {
        let lc = &self.config.lights;
        let (power, radius, orbit) = (lc.power, lc.radius, lc.orbit_radius);
        resize_lights(
            &mut self.lights,
            count as usize,
            &mut self.light_rng,
            power,
            radius,
            orbit,
        );
        self.config.lights.count = count;
    }

    /// Move sources and lights to the clock's current progress
    fn animate(&mut self) {
        let progress = self.clock.progress as f32;
        for s in &mut self.sources {
            s.advance(progress);
        }
        for l in &mut self.lights {
            l.advance(progress);
        }
    }

    /// Apply one parameter change. Invalid values are rejected and leave the
    /// scene untouched.
    pub fn apply(&mut self, event: SceneEvent) -> Result<()> {
        let geometry = event.affects_geometry();
        match event {
            SceneEvent::ResolutionChanged(resolution) => {
                let mut lattice = self.config.lattice.clone();
                lattice.resolution = resolution;
                lattice.validate()?;
                LatticeParams::from_config(&lattice)?;
                self.config.lattice = lattice;
            }
            SceneEvent::ThresholdChanged(threshold) => {
                if !threshold.is_finite() {
                    return Err(MeldError::ConfigError(format!(
                        "threshold must be finite, got {}",
                        threshold
                    )));
                }
                self.config.lattice.threshold = threshold;
            }
            SceneEvent::SourceCountChanged(count) => {
                check_count("sources.count", count, SceneConfig::MAX_SOURCES)?;
                self.resize_sources(count);
                self.animate();
            }
            SceneEvent::LightCountChanged(count) => {
                check_count("lights.count", count, SceneConfig::MAX_LIGHTS)?;
                self.resize_lights(count);
                self.animate();
            }
            SceneEvent::DisplayModeChanged(mode) => {
                self.config.render.display_mode = mode;
            }
            SceneEvent::AnimationToggled(running) => {
                self.clock.set_running(running);
            }
            SceneEvent::AnimationReset => {
                self.clock.reset();
                self.animate();
            }
        }
        if geometry {
            self.rebuild_requested = true;
        }
        self.redraw_requested = true;
        Ok(())
    }

    /// Apply every queued event in order, stopping at the first invalid one
    pub fn apply_all(&mut self, queue: &mut EventQueue) -> Result<()> {
        for event in queue.drain() {
            self.apply(event)?;
        }
        Ok(())
    }

    /// Advance the animation to timestamp `now_us` (microseconds)
    pub fn tick(&mut self, now_us: i64) {
        if self.clock.tick(now_us) {
            self.animate();
            if !self.sources.is_empty() {
                self.rebuild_requested = true;
            }
            self.redraw_requested = true;
        }
    }

    /// Jump straight to a progress value, used for stills
    pub fn set_progress(&mut self, progress: f64) {
        self.clock.progress = progress;
        self.animate();
        self.rebuild_requested = true;
        self.redraw_requested = true;
    }

    pub fn take_rebuild_request(&mut self) -> bool {
        std::mem::take(&mut self.rebuild_requested)
    }

    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Synchronously extract the isosurface for the current state
    pub fn build_mesh(&self) -> Result<MeshData> {
        let params = self.lattice_params()?;
        build_isosurface(&self.sources, &params, self.config.render.surface_color)
    }
}

fn check_count(field: &str, count: u32, max: u32) -> Result<()> {
    if count > max {
        return Err(MeldError::ValueOutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: max as f64,
            value: count as f64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meld_core::DisplayMode;

    fn small_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.lattice.resolution = [12, 12, 12];
        config.sources.count = 2;
        config.lights.count = 3;
        config
    }

    #[test]
    fn new_scene_populates_and_requests_build() {
        let mut scene = Scene::new(small_config()).unwrap();
        assert_eq!(scene.sources.len(), 2);
        assert_eq!(scene.lights.len(), 3);
        assert!(scene.take_rebuild_request());
        assert!(!scene.take_rebuild_request());
        assert!(scene.take_redraw_request());
    }

    #[test]
    fn same_seed_same_sources() {
        let a = Scene::new(small_config()).unwrap();
        let b = Scene::new(small_config()).unwrap();
        assert_eq!(a.sources, b.sources);
        assert_eq!(a.lights, b.lights);
    }

    #[test]
    fn geometry_events_request_rebuild() {
        let mut scene = Scene::new(small_config()).unwrap();
        scene.take_rebuild_request();
        scene.take_redraw_request();

        scene
            .apply(SceneEvent::DisplayModeChanged(DisplayMode::DeferredLights))
            .unwrap();
        assert!(!scene.take_rebuild_request());
        assert!(scene.take_redraw_request());
        assert_eq!(scene.config.render.display_mode, DisplayMode::DeferredLights);

        scene.apply(SceneEvent::ThresholdChanged(0.5)).unwrap();
        assert!(scene.take_rebuild_request());
        assert_eq!(scene.config.lattice.threshold, 0.5);
    }

    #[test]
    fn invalid_resolution_leaves_scene_untouched() {
        let mut scene = Scene::new(small_config()).unwrap();
        scene.take_rebuild_request();
        assert!(scene.apply(SceneEvent::ResolutionChanged([0, 4, 4])).is_err());
        assert_eq!(scene.config.lattice.resolution, [12, 12, 12]);
        assert!(!scene.take_rebuild_request());
    }

    #[test]
    fn resolution_beyond_config_limit_is_rejected() {
        let mut scene = Scene::new(small_config()).unwrap();
        scene.take_rebuild_request();
        let err = scene
            .apply(SceneEvent::ResolutionChanged([100_000; 3]))
            .unwrap_err();
        assert!(matches!(err, MeldError::ValueOutOfRange { .. }));
        assert_eq!(scene.config.lattice.resolution, [12, 12, 12]);
        assert!(scene.config.validate().is_ok());
        assert!(!scene.take_rebuild_request());

        let max = SceneConfig::MAX_RESOLUTION;
        scene
            .apply(SceneEvent::ResolutionChanged([max, 1, 1]))
            .unwrap();
        assert!(scene.config.validate().is_ok());
    }

    #[test]
    fn source_count_change_keeps_existing_sources() {
        let mut scene = Scene::new(small_config()).unwrap();
        let first = scene.sources[0];
        scene.apply(SceneEvent::SourceCountChanged(5)).unwrap();
        assert_eq!(scene.sources.len(), 5);
        assert_eq!(scene.sources[0], first);
        assert_eq!(scene.config.sources.count, 5);

        assert!(scene
            .apply(SceneEvent::SourceCountChanged(SceneConfig::MAX_SOURCES + 1))
            .is_err());
    }

    #[test]
    fn ticking_moves_sources() {
        let mut scene = Scene::new(small_config()).unwrap();
        let before = scene.sources[0].position;
        scene.apply(SceneEvent::AnimationToggled(true)).unwrap();
        scene.take_rebuild_request();

        scene.tick(1_000_000);
        assert!(!scene.take_rebuild_request(), "first tick only anchors");
        scene.tick(2_000_000);
        assert!(scene.take_rebuild_request());
        assert_ne!(scene.sources[0].position, before);
    }

    #[test]
    fn queued_events_apply_in_order() {
        let mut scene = Scene::new(small_config()).unwrap();
        let mut queue = EventQueue::new();
        queue.push(SceneEvent::LightCountChanged(0));
        queue.push(SceneEvent::LightCountChanged(4));
        scene.apply_all(&mut queue).unwrap();
        assert_eq!(scene.lights.len(), 4);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_sources_build_an_empty_mesh() {
        let mut config = small_config();
        config.sources.count = 0;
        let scene = Scene::new(config).unwrap();
        let mesh = scene.build_mesh().unwrap();
        assert!(mesh.is_empty());
    }
}
