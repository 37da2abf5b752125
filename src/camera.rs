use glam::{DMat4, DVec2, DVec3, Mat4, Vec3};

/// Perspective camera that circles the scene's vertical axis.
///
/// Position math runs in f64 so the orbit stays on its circle over long sessions;
/// matrices are narrowed to f32 only when handed to the GPU.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    position: DVec3,
    target: DVec3,
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl OrbitCamera {
    pub fn new(position: [f32; 3], target: [f32; 3], fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::from_array(position).as_dvec3(),
            target: Vec3::from_array(target).as_dvec3(),
            fov_degrees,
            aspect,
            near,
            far,
        }
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn target(&self) -> DVec3 {
        self.target
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Distance from the vertical axis through the origin.
    pub fn horizontal_distance(&self) -> f64 {
        DVec2::new(self.position.x, self.position.z).length()
    }

    /// Rotates the position about the Y axis by `angle`, recomputed from the current
    /// position, then shifts X and Z by `drift`. Y is left alone.
    pub fn orbit_step(&mut self, angle: f32, drift: f32) {
        let (sin, cos) = f64::from(angle).sin_cos();
        let drift = f64::from(drift);
        let x = self.position.x;
        let z = self.position.z;
        self.position.x = x * cos + z * sin + drift;
        self.position.z = z * cos - x * sin + drift;
    }

    /// Fixed point of [`orbit_step`](Self::orbit_step) in the XZ plane.
    ///
    /// The step is a rotation plus a constant offset, so repeated steps trace a circle
    /// around this point. `None` when `angle` is a multiple of a full turn (the step is
    /// then a pure translation).
    pub fn orbit_center(angle: f32, drift: f32) -> Option<DVec2> {
        let (sin, cos) = f64::from(angle).sin_cos();
        let one_minus_cos = 1.0 - cos;
        let det = one_minus_cos * one_minus_cos + sin * sin;
        if det <= f64::EPSILON {
            return None;
        }
        let drift = f64::from(drift);
        Some(DVec2::new(
            (one_minus_cos * drift + sin * drift) / det,
            (one_minus_cos * drift - sin * drift) / det,
        ))
    }

    /// Returns `false` and leaves the camera untouched for a degenerate size.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect = width as f32 / height as f32;
        true
    }

    pub fn view_matrix(&self) -> Mat4 {
        DMat4::look_at_rh(self.position, self.target, DVec3::Y).as_mat4()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CAMERA_START, CAMERA_TARGET, ORBIT_DRIFT, ROTATION_SPEED};

    fn stock_camera() -> OrbitCamera {
        OrbitCamera::new(CAMERA_START, CAMERA_TARGET, 55.0, 1.5, 1.0, 400_000.0)
    }

    #[test]
    fn orbit_step_matches_rotation_formula() {
        let mut camera = stock_camera();
        camera.orbit_step(ROTATION_SPEED, ORBIT_DRIFT);

        let (sin, cos) = f64::from(ROTATION_SPEED).sin_cos();
        let expected_x = 0.0 * cos + 10_000.0 * sin - 10.0;
        let expected_z = 10_000.0 * cos - 0.0 * sin - 10.0;
        assert!((camera.position().x - expected_x).abs() < 1e-9);
        assert!((camera.position().z - expected_z).abs() < 1e-9);
        assert_eq!(camera.position().y, 10_000.0);
    }

    #[test]
    fn orbit_center_is_a_fixed_point() {
        let center = OrbitCamera::orbit_center(ROTATION_SPEED, ORBIT_DRIFT).unwrap();
        let mut camera = OrbitCamera::new(
            [center.x as f32, 0.0, center.y as f32],
            [0.0; 3],
            55.0,
            1.0,
            1.0,
            10.0,
        );
        camera.orbit_step(ROTATION_SPEED, ORBIT_DRIFT);
        // The f32 round trip of the start position limits precision here.
        assert!((camera.position().x - center.x).abs() < 0.1);
        assert!((camera.position().z - center.y).abs() < 0.1);
    }

    #[test]
    fn orbit_distance_stays_bounded_over_many_frames() {
        let mut camera = stock_camera();
        let center = OrbitCamera::orbit_center(ROTATION_SPEED, ORBIT_DRIFT).unwrap();
        let start = DVec2::new(camera.position().x, camera.position().z);
        let radius = (start - center).length();
        let min = (center.length() - radius).abs() - 1.0;
        let max = center.length() + radius + 1.0;

        for _ in 0..20_000 {
            camera.orbit_step(ROTATION_SPEED, ORBIT_DRIFT);
            let distance = camera.horizontal_distance();
            assert!(distance >= min && distance <= max, "distance {distance} outside [{min}, {max}]");
            let from_center = (DVec2::new(camera.position().x, camera.position().z) - center).length();
            assert!((from_center - radius).abs() < 1e-3);
        }
    }

    #[test]
    fn zero_angle_has_no_orbit_center() {
        assert!(OrbitCamera::orbit_center(0.0, -10.0).is_none());
    }

    #[test]
    fn viewport_sets_aspect() {
        let mut camera = stock_camera();
        assert!(camera.set_viewport(1920, 1080));
        assert_eq!(camera.aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn degenerate_viewport_is_ignored() {
        let mut camera = stock_camera();
        assert!(!camera.set_viewport(800, 0));
        assert!(!camera.set_viewport(0, 600));
        assert_eq!(camera.aspect(), 1.5);
    }

    #[test]
    fn view_matrix_looks_at_target() {
        let camera = stock_camera();
        let view = camera.view_matrix();
        let target = view.transform_point3(Vec3::from(CAMERA_TARGET));
        // Target lands on the view axis, in front of the camera.
        assert!(target.x.abs() < 1e-2);
        assert!(target.y.abs() < 1e-2);
        assert!(target.z < 0.0);
    }
}
