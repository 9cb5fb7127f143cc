//! Moving point sources and point lights

use crate::rng::FieldRng;
use meld_core::{Color, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Height of every orbit's center above the origin
pub const ORBIT_LIFT: f32 = 0.15;

/// Position along the orbit at animation progress `progress`.
///
/// The path winds around the vertical axis three times per revolution of the
/// elevation angle, which stays within +-30 degrees.
pub fn orbit_position(orbit_radius: f32, speed: f32, progress: f32) -> Vec3 {
    let angle = (progress * speed).rem_euclid(2.0 * PI);
    let a = angle.cos() * PI / 6.0;
    let b = angle * 3.0 * speed;
    Vec3::new(
        orbit_radius * a.cos() * b.sin(),
        orbit_radius * a.sin() + ORBIT_LIFT,
        orbit_radius * a.cos() * b.cos(),
    )
}

/// A potential source contributing `power / distance` to the field
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    pub position: Vec3,
    pub power: f32,
    /// Orbit radius
    pub radius: f32,
    /// Angular speed in radians per unit of progress
    pub speed: f32,
}

impl PointSource {
    pub fn new(position: Vec3, power: f32) -> Self {
        Self {
            position,
            power,
            radius: 0.0,
            speed: 0.0,
        }
    }

    pub fn random(rng: &mut FieldRng, orbit_radius: f32) -> Self {
        let power = rng.next_f32() * 0.02;
        let speed = (rng.next_f32() * 4.0 + 8.0) * PI / 5.0;
        Self {
            position: orbit_position(orbit_radius, speed, 0.0),
            power,
            radius: orbit_radius,
            speed,
        }
    }

    pub fn advance(&mut self, progress: f32) {
        self.position = orbit_position(self.radius, self.speed, progress);
    }
}

/// A point light with a bounded influence volume
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub color: Color,
    pub power: f32,
    /// Distance beyond which the light contributes nothing
    pub radius: f32,
    pub orbit_radius: f32,
    pub speed: f32,
}

impl Light {
    pub fn new(position: Vec3, color: Color, power: f32, radius: f32) -> Self {
        Self {
            position,
            color,
            power,
            radius,
            orbit_radius: 0.0,
            speed: 0.0,
        }
    }

    pub fn random(rng: &mut FieldRng, power: f32, radius: f32, orbit_radius: f32) -> Self {
        let color = Color::new(
            rng.range(0.3, 1.0),
            rng.range(0.3, 1.0),
            rng.range(0.3, 1.0),
        );
        let speed = (rng.next_f32() * 2.0 + 2.0) * PI / 5.0;
        Self {
            position: orbit_position(orbit_radius, speed, 0.0),
            color,
            power,
            radius,
            orbit_radius,
            speed,
        }
    }

    /// Stationary lights (zero orbit radius) keep their position
    pub fn advance(&mut self, progress: f32) {
        if self.orbit_radius > 0.0 {
            self.position = orbit_position(self.orbit_radius, self.speed, progress);
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.1, 0.5), Color::WHITE, 0.04, 0.1)
    }
}

/// Grow or shrink `sources` to `count`, keeping the existing prefix
pub fn resize_sources(
    sources: &mut Vec<PointSource>,
    count: usize,
    rng: &mut FieldRng,
    orbit_radius: f32,
) {
    sources.truncate(count);
    while sources.len() < count {
        sources.push(PointSource::random(rng, orbit_radius));
    }
}

/// Grow or shrink `lights` to `count`, keeping the existing prefix
pub fn resize_lights(
    lights: &mut Vec<Light>,
    count: usize,
    rng: &mut FieldRng,
    power: f32,
    radius: f32,
    orbit_radius: f32,
) {
    lights.truncate(count);
    while lights.len() < count {
        lights.push(Light::random(rng, power, radius, orbit_radius));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_stays_on_sphere_around_lift() {
        let center = Vec3::new(0.0, ORBIT_LIFT, 0.0);
        for i in 0..50 {
            let p = orbit_position(0.2, 7.5, i as f32 * 0.037);
            assert!((p.distance(&center) - 0.2).abs() < 1e-5);
        }
    }

    #[test]
    fn orbit_elevation_bounded() {
        for i in 0..200 {
            let p = orbit_position(1.0, 5.0, i as f32 * 0.01);
            let elevation = (p.y - ORBIT_LIFT).asin();
            assert!(elevation.abs() <= PI / 6.0 + 1e-4);
        }
    }

    #[test]
    fn random_source_ranges() {
        let mut rng = FieldRng::new(11);
        for _ in 0..100 {
            let s = PointSource::random(&mut rng, 0.2);
            assert!((0.0..0.02).contains(&s.power));
            assert!(s.speed >= 8.0 * PI / 5.0 && s.speed <= 12.0 * PI / 5.0);
            assert_eq!(s.radius, 0.2);
        }
    }

    #[test]
    fn resize_keeps_prefix() {
        let mut rng = FieldRng::new(3);
        let mut sources = Vec::new();
        resize_sources(&mut sources, 4, &mut rng, 0.2);
        let first = sources[..2].to_vec();
        resize_sources(&mut sources, 2, &mut rng, 0.2);
        assert_eq!(sources, first);
        resize_sources(&mut sources, 5, &mut rng, 0.2);
        assert_eq!(sources.len(), 5);
        assert_eq!(&sources[..2], &first[..]);
    }

    #[test]
    fn stationary_light_does_not_move() {
        let mut light = Light::default();
        light.advance(0.7);
        assert_eq!(light.position, Vec3::new(0.0, 0.1, 0.5));
    }
}
