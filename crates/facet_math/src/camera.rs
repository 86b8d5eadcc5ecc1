use glam::{Mat4, Vec3};

/// Smallest allowed gap between the camera pitch and the poles.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Orbit camera for 3D rendering.
///
/// The eye sits on a sphere of radius `distance` around `target`. `yaw` is
/// measured around +Y from the +Z axis and `pitch` is the elevation above the
/// XZ plane, both in radians.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, target: Vec3, aspect: f32) -> Self {
        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            aspect,
            near: 1.0,
            far: 5000.0,
            yaw: 0.0,
            pitch: 0.0,
            distance: 1.0,
            min_distance: 0.5,
            max_distance: 2000.0,
        };
        camera.update_angles_from_position();
        camera
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix (camera → clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get the combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio (e.g., on window resize)
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Rotate around the target.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_position_from_angles();
    }

    /// Move toward (negative) or away from (positive) the target.
    ///
    /// The step is proportional to the current distance so zooming feels the
    /// same close up and far away.
    pub fn dolly(&mut self, amount: f32) {
        let scale = (1.0 + amount * 0.001).max(0.1);
        self.distance = (self.distance * scale).clamp(self.min_distance, self.max_distance);
        self.update_position_from_angles();
    }

    /// Translate eye and target together in the view plane.
    pub fn pan(&mut self, delta_right: f32, delta_up: f32) {
        let forward = (self.target - self.position).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);

        let offset = (right * delta_right + up * delta_up) * self.distance;
        self.target += offset;
        self.position += offset;
    }

    /// Recompute `position` from target, yaw, pitch and distance.
    pub fn update_position_from_angles(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw);
        self.position = self.target + offset * self.distance;
    }

    /// Recompute yaw, pitch and distance from `position` and `target`.
    pub fn update_angles_from_position(&mut self) {
        let offset = self.position - self.target;
        self.distance = offset.length().max(f32::EPSILON);
        self.yaw = offset.x.atan2(offset.z);
        self.pitch = (offset.y / self.distance).clamp(-1.0, 1.0).asin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(Vec3::new(8.0, 8.0, 8.0), Vec3::ZERO, 16.0 / 9.0);

        assert_eq!(camera.position, Vec3::new(8.0, 8.0, 8.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert_eq!(camera.aspect, 16.0 / 9.0);
        assert!((camera.distance - 8.0 * 3.0_f32.sqrt()).abs() < 1e-4);
        assert!((camera.yaw - std::f32::consts::FRAC_PI_4).abs() < 1e-5);
    }

    #[test]
    fn test_angles_round_trip_position() {
        let mut camera = Camera::new(Vec3::new(8.0, 8.0, 8.0), Vec3::ZERO, 1.0);
        camera.update_position_from_angles();
        assert!((camera.position - Vec3::new(8.0, 8.0, 8.0)).length() < 1e-4);
    }

    #[test]
    fn test_view_matrix() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);

        let view = camera.view_matrix();
        // View matrix should translate camera to origin
        assert!(view.w_axis.z < 0.0);
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::new(Vec3::new(8.0, 8.0, 8.0), Vec3::ZERO, 1.0);
        let distance = camera.distance;
        camera.orbit(0.7, -0.3);
        assert!(((camera.position - camera.target).length() - distance).abs() < 1e-3);
    }

    #[test]
    fn test_orbit_clamps_pitch() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);
        camera.orbit(0.0, 10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.position.y > 4.9);
    }

    #[test]
    fn test_dolly_clamps_distance() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);
        camera.dolly(-100_000.0);
        assert_eq!(camera.distance, camera.min_distance);
        camera.dolly(1.0e9);
        assert_eq!(camera.distance, camera.max_distance);
    }

    #[test]
    fn test_pan_moves_target_and_eye() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);
        camera.pan(0.1, 0.0);
        // Looking down -Z, right is +X
        assert!(camera.target.x > 0.0);
        assert!((camera.position - camera.target - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn test_aspect_update() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 1.0);

        camera.set_aspect(16.0 / 9.0);
        assert_eq!(camera.aspect, 16.0 / 9.0);
    }
}
