//! Orbit camera around the isosurface

use meld_core::{mat4_mul, Mat4, RenderConfig, Vec3, MAT4_IDENTITY};

/// A perspective camera orbiting a target point
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,

    pub distance: f32,
    /// Horizontal angle in radians
    pub yaw: f32,
    /// Vertical angle in radians
    pub pitch: f32,
    /// Distance covered by one navigation step
    pub step: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl Camera {
    pub fn from_config(config: &RenderConfig) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::new(0.0, 0.15, 0.0),
            up: Vec3::UP,
            fov: config.fov,
            near: config.near,
            far: config.far,
            aspect: config.width as f32 / config.height.max(1) as f32,
            distance: 0.65,
            yaw: 0.0,
            pitch: 0.35,
            step: config.view_range / 20.0,
        };
        camera.update_orbit();
        camera
    }

    /// Place the camera on its orbit from distance, yaw, and pitch
    pub fn update_orbit(&mut self) {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.position = self.target + Vec3::new(x, y, z);
    }

    pub fn orbit_horizontal(&mut self, delta: f32) {
        self.yaw = (self.yaw + delta).rem_euclid(std::f32::consts::TAU);
        self.update_orbit();
    }

    pub fn orbit_vertical(&mut self, delta: f32) {
        self.pitch = (self.pitch + delta).clamp(-1.56, 1.56);
        self.update_orbit();
    }

    /// Move toward the target by `steps` navigation steps (negative backs away)
    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance - steps * self.step).clamp(self.near * 2.0, self.far * 0.5);
        self.update_orbit();
    }

    /// View matrix (column-major)
    pub fn view_matrix(&self) -> Mat4 {
        let f = (self.target - self.position).normalized();
        let s = f.cross(&self.up).normalized();
        let u = s.cross(&f);

        [
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [
                -s.dot(&self.position),
                -u.dot(&self.position),
                f.dot(&self.position),
                1.0,
            ],
        ]
    }

    /// Perspective projection (column-major) mapping the near plane to depth
    /// 0 and the far plane to depth 1
    pub fn projection_matrix(&self) -> Mat4 {
        let f = 1.0 / (self.fov.to_radians() / 2.0).tan();
        let range = self.near - self.far;
        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, self.far / range, -1.0],
            [0.0, 0.0, self.near * self.far / range, 0.0],
        ]
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        mat4_mul(&self.projection_matrix(), &self.view_matrix())
    }

    /// Inverse of the view-projection, for rebuilding world positions from depth
    pub fn inverse_view_projection_matrix(&self) -> Mat4 {
        mat4_inverse(&self.view_projection_matrix()).unwrap_or(MAT4_IDENTITY)
    }
}

/// Invert a column-major matrix by Gauss-Jordan elimination in f64.
/// Returns `None` for a singular matrix.
pub fn mat4_inverse(m: &Mat4) -> Option<Mat4> {
    // Row-major working copy, augmented with the identity
    let mut a = [[0.0f64; 8]; 4];
    for (row, r) in a.iter_mut().enumerate() {
        for col in 0..4 {
            r[col] = m[col][row] as f64;
        }
        r[4 + row] = 1.0;
    }

    for col in 0..4 {
        let pivot = (col..4).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        let p = a[col][col];
        for v in a[col].iter_mut() {
            *v /= p;
        }
        for row in 0..4 {
            if row != col {
                let factor = a[row][col];
                if factor != 0.0 {
                    for k in 0..8 {
                        a[row][k] -= factor * a[col][k];
                    }
                }
            }
        }
    }

    let mut inv = [[0.0f32; 4]; 4];
    for (row, r) in a.iter().enumerate() {
        for col in 0..4 {
            inv[col][row] = r[4 + col] as f32;
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meld_core::transform_point;

    #[test]
    fn target_projects_to_screen_center() {
        let camera = Camera::default();
        let p = transform_point(&camera.view_projection_matrix(), camera.target);
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
        assert!(p.z > 0.0 && p.z < 1.0);
    }

    #[test]
    fn near_and_far_planes_map_to_depth_range() {
        let camera = Camera::default();
        let forward = (camera.target - camera.position).normalized();
        let vp = camera.view_projection_matrix();
        let near = transform_point(&vp, camera.position + forward * camera.near);
        let far = transform_point(&vp, camera.position + forward * camera.far);
        assert!(near.z.abs() < 1e-3, "near depth {}", near.z);
        assert!((far.z - 1.0).abs() < 1e-3, "far depth {}", far.z);
    }

    #[test]
    fn inverse_undoes_view_projection() {
        let camera = Camera::default();
        let vp = camera.view_projection_matrix();
        let inv = camera.inverse_view_projection_matrix();
        let world = Vec3::new(0.05, 0.1, -0.08);
        let back = transform_point(&inv, transform_point(&vp, world));
        assert!(back.distance(&world) < 1e-3, "got {:?}", back);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(mat4_inverse(&[[0.0; 4]; 4]).is_none());
        assert_eq!(mat4_inverse(&MAT4_IDENTITY), Some(MAT4_IDENTITY));
    }

    #[test]
    fn zoom_moves_by_navigation_steps() {
        let mut camera = Camera::default();
        let before = camera.distance;
        camera.zoom(2.0);
        assert!((before - camera.distance - 2.0 * camera.step).abs() < 1e-6);
        assert!((camera.position.distance(&camera.target) - camera.distance).abs() < 1e-5);
    }
}
