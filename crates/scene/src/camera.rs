use glam::{EulerRot, Mat4, Quat, Vec3};

/// Perspective camera with optional orbit controls around a target point.
///
/// While controls are disabled the camera keeps whatever pose the scene gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneCamera {
    pub position: Vec3,
    pub rotation: Quat,
    pub target: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    controls_enabled: bool,
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self::looking_at(Vec3::new(0.0, 10.0, 15.0), Vec3::ZERO)
    }
}

impl SceneCamera {
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            rotation: look_rotation(position, target),
            target,
            fov: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            sensitivity: 0.005,
            zoom_speed: 0.95,
            controls_enabled: false,
        }
    }

    /// Camera at `position` rotated by intrinsic XYZ Euler angles; orbits the origin.
    pub fn with_euler_xyz(position: Vec3, x: f32, y: f32, z: f32) -> Self {
        Self {
            rotation: Quat::from_euler(EulerRot::XYZ, x, y, z),
            ..Self::looking_at(position, Vec3::ZERO)
        }
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    /// Turning controls on snaps the camera to face its target.
    pub fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
        if enabled {
            self.rotation = look_rotation(self.position, self.target);
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Rotate around the target by a mouse delta in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        if !self.controls_enabled {
            return;
        }
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let theta = offset.x.atan2(offset.z) - dx * self.sensitivity;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() - dy * self.sensitivity)
            .clamp(0.01, std::f32::consts::PI - 0.01);

        self.position = self.target
            + radius * Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());
        self.rotation = look_rotation(self.position, self.target);
    }

    /// Move toward (positive steps) or away from the target.
    pub fn zoom(&mut self, steps: f32) {
        if !self.controls_enabled {
            return;
        }
        let offset = self.position - self.target;
        let radius = (offset.length() * self.zoom_speed.powf(steps)).clamp(1.0, self.far * 0.5);
        self.position = self.target + offset.normalize_or(Vec3::Z) * radius;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

fn look_rotation(position: Vec3, target: Vec3) -> Quat {
    let (_, rotation, _) = Mat4::look_at_rh(position, target, Vec3::Y)
        .inverse()
        .to_scale_rotation_translation();
    rotation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_at_faces_target() {
        let cam = SceneCamera::looking_at(Vec3::new(-15.0, 7.0, 15.0), Vec3::ZERO);
        let expected = (Vec3::ZERO - cam.position).normalize();
        assert!((cam.forward() - expected).length() < 1e-4);
        assert!(!cam.view_projection().col(0).x.is_nan());
    }

    #[test]
    fn orbit_requires_controls() {
        let mut cam = SceneCamera::default();
        let start = cam.position;
        cam.orbit(100.0, 0.0);
        assert_eq!(cam.position, start);

        cam.set_controls_enabled(true);
        cam.orbit(100.0, 20.0);
        assert_ne!(cam.position, start);
        assert!((cam.position.length() - start.length()).abs() < 1e-3);
    }

    #[test]
    fn zoom_keeps_minimum_distance() {
        let mut cam = SceneCamera::default();
        cam.set_controls_enabled(true);
        cam.zoom(1000.0);
        assert!((cam.position - cam.target).length() >= 1.0 - 1e-4);
    }
}
