//! Host reference of the shading both render paths perform

use meld_core::{Color, Vec3};
use meld_field::Light;

/// Distance below which the falloff stops growing
pub const MIN_LIGHT_DISTANCE: f32 = 0.01;

fn modulate(a: Color, b: Color) -> Color {
    Color::new(a.r * b.r, a.g * b.g, a.b * b.b)
}

/// Light reflected toward the viewer from one point light.
///
/// Diffuse only, with a smooth falloff that reaches zero at the light radius.
/// A light with zero power adds exactly nothing.
pub fn point_light_contribution(albedo: Color, normal: Vec3, position: Vec3, light: &Light) -> Color {
    let to_light = light.position - position;
    let d = to_light.length();
    if d >= light.radius {
        return Color::BLACK;
    }
    let l = to_light / d.max(1e-6);
    let lambert = normal.dot(&l).max(0.0);
    let falloff = (1.0 - d / light.radius) * (1.0 - d / light.radius);
    modulate(albedo, light.color).scaled(light.power * lambert * falloff / d.max(MIN_LIGHT_DISTANCE))
}

/// Ambient term plus every light
pub fn shade(albedo: Color, normal: Vec3, position: Vec3, ambient: Color, lights: &[Light]) -> Color {
    lights.iter().fold(modulate(albedo, ambient), |acc, light| {
        acc + point_light_contribution(albedo, normal, position, light)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_above(power: f32) -> Light {
        Light::new(Vec3::new(0.0, 0.05, 0.0), Color::WHITE, power, 0.1)
    }

    #[test]
    fn no_lights_is_ambient_only() {
        let albedo = Color::new(0.5, 0.6, 0.7);
        let ambient = Color::new(0.1, 0.2, 0.3);
        let c = shade(albedo, Vec3::UP, Vec3::ZERO, ambient, &[]);
        assert_eq!(c, modulate(albedo, ambient));
    }

    #[test]
    fn zero_power_light_adds_nothing() {
        let albedo = Color::new(0.5, 0.6, 0.7);
        let ambient = Color::new(0.1, 0.2, 0.3);
        let lit = shade(albedo, Vec3::UP, Vec3::ZERO, ambient, &[light_above(0.0)]);
        assert_eq!(lit, shade(albedo, Vec3::UP, Vec3::ZERO, ambient, &[]));
        assert_eq!(
            point_light_contribution(albedo, Vec3::UP, Vec3::ZERO, &light_above(0.0)),
            Color::BLACK
        );
    }

    #[test]
    fn light_reaches_only_its_radius() {
        let light = light_above(0.04);
        let inside = point_light_contribution(Color::WHITE, Vec3::UP, Vec3::ZERO, &light);
        assert!(inside.r > 0.0);
        let outside =
            point_light_contribution(Color::WHITE, Vec3::UP, Vec3::new(0.0, -0.06, 0.0), &light);
        assert_eq!(outside, Color::BLACK);
    }

    #[test]
    fn surfaces_facing_away_are_unlit() {
        let c = point_light_contribution(Color::WHITE, -Vec3::UP, Vec3::ZERO, &light_above(0.04));
        assert_eq!(c, Color::BLACK);
    }

    #[test]
    fn closer_is_brighter() {
        let light = light_above(0.04);
        let near = point_light_contribution(Color::WHITE, Vec3::UP, Vec3::new(0.0, 0.03, 0.0), &light);
        let far = point_light_contribution(Color::WHITE, Vec3::UP, Vec3::ZERO, &light);
        assert!(near.r > far.r);
    }
}
