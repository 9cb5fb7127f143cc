//! Inverse-distance scalar field

use crate::source::PointSource;
use meld_core::Vec3;

/// Distances below this are clamped so a sample on top of a source stays finite
pub const MIN_DISTANCE: f32 = 1e-4;

/// Sum of `power / distance` over a set of point sources.
///
/// Borrowing the sources keeps the field a read-only snapshot for the duration
/// of a build, so it can be shared across sampling threads.
#[derive(Clone, Copy, Debug)]
pub struct ScalarField<'a> {
    sources: &'a [PointSource],
}

impl<'a> ScalarField<'a> {
    pub fn new(sources: &'a [PointSource]) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &'a [PointSource] {
        self.sources
    }

    pub fn evaluate(&self, p: Vec3) -> f32 {
        self.sources
            .iter()
            .map(|s| s.power / p.distance(&s.position).max(MIN_DISTANCE))
            .sum()
    }

    /// Analytic gradient of [`evaluate`](Self::evaluate).
    ///
    /// Sources closer than [`MIN_DISTANCE`] sit on the clamped plateau and
    /// contribute nothing.
    pub fn gradient(&self, p: Vec3) -> Vec3 {
        let mut g = Vec3::ZERO;
        for s in self.sources {
            let d = p - s.position;
            let r = d.length();
            if r > MIN_DISTANCE {
                g += d * (-s.power / (r * r * r));
            }
        }
        g
    }

    /// Unit surface normal at `p`, pointing away from the high-value region.
    ///
    /// Where the gradient vanishes (between balanced sources) the direction
    /// from the power-weighted source centroid is used instead.
    pub fn normal(&self, p: Vec3) -> Vec3 {
        let n = (-self.gradient(p)).normalized();
        if n != Vec3::ZERO {
            return n;
        }
        let total: f32 = self.sources.iter().map(|s| s.power).sum();
        if total > 0.0 {
            let centroid = self
                .sources
                .iter()
                .fold(Vec3::ZERO, |acc, s| acc + s.position * s.power)
                / total;
            let away = (p - centroid).normalized();
            if away != Vec3::ZERO {
                return away;
            }
        }
        Vec3::UP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_is_zero() {
        let field = ScalarField::new(&[]);
        assert_eq!(field.evaluate(Vec3::new(0.3, -1.0, 2.0)), 0.0);
        assert_eq!(field.gradient(Vec3::ONE), Vec3::ZERO);
    }

    #[test]
    fn single_source_inverse_distance() {
        let sources = [PointSource::new(Vec3::ZERO, 2.0)];
        let field = ScalarField::new(&sources);
        assert!((field.evaluate(Vec3::new(0.5, 0.0, 0.0)) - 4.0).abs() < 1e-6);
        assert!((field.evaluate(Vec3::new(0.0, 0.0, 4.0)) - 0.5).abs() < 1e-6);
        assert_eq!(field.evaluate(Vec3::ZERO), 2.0 / MIN_DISTANCE);
    }

    #[test]
    fn field_decreases_with_distance() {
        let sources = [PointSource::new(Vec3::new(0.1, 0.2, 0.3), 0.01)];
        let field = ScalarField::new(&sources);
        let mut last = f32::INFINITY;
        for i in 1..20 {
            let v = field.evaluate(Vec3::new(0.1 + i as f32 * 0.05, 0.2, 0.3));
            assert!(v < last);
            last = v;
        }
    }

    #[test]
    fn more_power_never_lowers_the_field() {
        let mut sources = vec![
            PointSource::new(Vec3::new(0.2, 0.0, 0.0), 0.01),
            PointSource::new(Vec3::new(-0.2, 0.1, 0.0), 0.02),
        ];
        let at = sources[0].position;
        let before = ScalarField::new(&sources).evaluate(at);
        sources[0].power *= 1.5;
        let after = ScalarField::new(&sources).evaluate(at);
        assert!(after >= before);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let sources = [
            PointSource::new(Vec3::new(0.0, 0.1, 0.0), 0.01),
            PointSource::new(Vec3::new(0.2, -0.1, 0.05), 0.015),
        ];
        let field = ScalarField::new(&sources);
        let p = Vec3::new(0.1, 0.3, -0.2);
        let h = 1e-3;
        let central = |dir: Vec3| {
            (field.evaluate(p + dir * h) - field.evaluate(p - dir * h)) / (2.0 * h)
        };
        let fd = Vec3::new(
            central(Vec3::new(1.0, 0.0, 0.0)),
            central(Vec3::new(0.0, 1.0, 0.0)),
            central(Vec3::new(0.0, 0.0, 1.0)),
        );
        let g = field.gradient(p);
        assert!((g - fd).length() < 1e-3 * g.length().max(1.0), "{:?} vs {:?}", g, fd);
    }

    #[test]
    fn normal_points_away_from_source() {
        let sources = [PointSource::new(Vec3::ZERO, 1.0)];
        let field = ScalarField::new(&sources);
        let n = field.normal(Vec3::new(0.0, 0.0, 2.0));
        assert!((n - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn normal_between_two_sources() {
        let sources = [
            PointSource::new(Vec3::new(-1.0, 0.0, 0.0), 1.0),
            PointSource::new(Vec3::new(1.0, 0.0, 0.0), 1.0),
        ];
        let field = ScalarField::new(&sources);
        let n = field.normal(Vec3::new(0.0, 0.5, 0.0));
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.y > 0.99);

        // The gradient cancels exactly at the midpoint
        assert_eq!(field.gradient(Vec3::ZERO), Vec3::ZERO);
        assert_eq!(field.normal(Vec3::ZERO), Vec3::UP);
    }
}
