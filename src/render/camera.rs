use crate::config::CameraConfig;
use glam::{Mat4, Vec2, Vec3};

const MIN_POLAR: f32 = 1e-4;
const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 50.0;

/// Orthographic camera with a fixed view volume.
///
/// The configured frustum is the view at aspect `base_aspect`; other aspects
/// widen or narrow the horizontal extent so the image is never stretched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    pub zoom: f32,
    pub aspect: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl OrthographicCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            left: config.left,
            right: config.right,
            top: config.top,
            bottom: config.bottom,
            near: config.near,
            far: config.far,
            zoom: 1.0,
            aspect,
            position: Vec3::from_array(config.position),
            target: Vec3::from_array(config.target),
            up: Vec3::Y,
        }
    }

    pub fn base_aspect(&self) -> f32 {
        let height = self.top - self.bottom;
        if height.abs() > f32::EPSILON {
            (self.right - self.left) / height
        } else {
            1.0
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Visible world-space width and height at the current zoom.
    pub fn view_extent(&self) -> Vec2 {
        let zoom = self.zoom.max(f32::EPSILON);
        let height = (self.top - self.bottom) / zoom;
        let width = (self.right - self.left) / zoom * (self.aspect / self.base_aspect());
        Vec2::new(width, height)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let extent = self.view_extent() * 0.5;
        let cx = (self.left + self.right) * 0.5;
        let cy = (self.top + self.bottom) * 0.5;
        Mat4::orthographic_rh(
            cx - extent.x,
            cx + extent.x,
            cy - extent.y,
            cy + extent.y,
            self.near,
            self.far,
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).try_normalize().unwrap_or(Vec3::NEG_Z)
    }
}

/// Drag input in physical pixels, already routed past the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerDrag {
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
}

/// Orbit controller around a target point with inertial damping.
///
/// Input accumulates into pending deltas; [`OrbitControls::update`] applies a
/// damped share of them each frame and keeps the remainder for later frames.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    theta_delta: f32,
    phi_delta: f32,
    pan_offset: Vec3,
}

impl OrbitControls {
    pub fn new(target: Vec3, enable_damping: bool, damping_factor: f32) -> Self {
        Self {
            target,
            enable_damping,
            damping_factor: damping_factor.clamp(0.0, 1.0),
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            theta_delta: 0.0,
            phi_delta: 0.0,
            pan_offset: Vec3::ZERO,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            Vec3::from_array(config.target),
            config.damping,
            config.damping_factor,
        )
    }

    pub fn is_settled(&self) -> bool {
        self.theta_delta.abs() < 1e-6 && self.phi_delta.abs() < 1e-6 && self.pan_offset.length() < 1e-6
    }

    /// A full-height drag turns the camera once around the target.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        let turn = std::f32::consts::TAU * self.rotate_speed / height;
        self.theta_delta -= dx * turn;
        self.phi_delta -= dy * turn;
    }

    /// Moves the target in the camera plane so the scene follows the pointer.
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &OrthographicCamera, viewport: Vec2) {
        let extent = camera.view_extent();
        let per_pixel = Vec2::new(
            extent.x / viewport.x.max(1.0),
            extent.y / viewport.y.max(1.0),
        ) * self.pan_speed;
        let forward = camera.forward();
        let right = forward.cross(camera.up).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        self.pan_offset += -right * dx * per_pixel.x + up * dy * per_pixel.y;
    }

    /// Wheel zoom. Positive `steps` zoom in.
    pub fn zoom(&mut self, steps: f32, camera: &mut OrthographicCamera) {
        let scale = 0.95f32.powf(self.zoom_speed * steps.abs());
        let zoom = if steps > 0.0 {
            camera.zoom / scale
        } else {
            camera.zoom * scale
        };
        camera.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Applies pending input to `camera`. `dt` scales damping so the decay
    /// rate matches a 60 Hz display regardless of the actual frame rate.
    /// Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut OrthographicCamera, dt: f32) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON || self.is_settled() {
            camera.target = self.target;
            return false;
        }

        let share = if self.enable_damping {
            1.0 - (1.0 - self.damping_factor).powf(dt.max(0.0) * 60.0)
        } else {
            1.0
        };

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        theta += self.theta_delta * share;
        phi = (phi + self.phi_delta * share).clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        self.target += self.pan_offset * share;

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let previous = camera.position;
        camera.position = self.target + new_offset;
        camera.target = self.target;

        let keep = 1.0 - share;
        self.theta_delta *= keep;
        self.phi_delta *= keep;
        self.pan_offset *= keep;
        if self.is_settled() {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vec3::ZERO;
        }

        (camera.position - previous).length_squared() > 1e-12
    }
}

/// Discrete "step further out" control. Each click advances an accumulator
/// by a fixed increment and places the camera at `base + axis * accumulator`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraStepper {
    base: Vec3,
    axis: Vec3,
    increment: f32,
    accumulated: f32,
}

impl CameraStepper {
    pub fn new(base: Vec3, axis: Vec3, increment: f32) -> Self {
        Self {
            base,
            axis,
            increment,
            accumulated: 0.0,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            Vec3::from_array(config.step_base),
            Vec3::from_array(config.step_axis),
            config.step_increment,
        )
    }

    #[cfg(test)]
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    pub fn step(&mut self, camera: &mut OrthographicCamera) -> Vec3 {
        self.accumulated += self.increment;
        camera.position = self.base + self.axis * self.accumulated;
        log::debug!("Camera stepped to {:?}", camera.position);
        camera.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrthographicCamera {
        OrthographicCamera::from_config(&CameraConfig::default(), 800.0 / 600.0)
    }

    #[test]
    fn projection_keeps_square_pixels() {
        let mut camera = camera();
        camera.set_aspect(2.0);
        let extent = camera.view_extent();
        assert!((extent.x / extent.y - 2.0).abs() < 1e-5);

        camera.zoom = 2.0;
        let zoomed = camera.view_extent();
        assert!((zoomed.y - 7.0).abs() < 1e-5);
    }

    #[test]
    fn invalid_aspect_is_ignored() {
        let mut camera = camera();
        camera.set_aspect(0.0);
        camera.set_aspect(f32::NAN);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn idle_update_keeps_position() {
        let mut camera = camera();
        let mut controls = OrbitControls::from_config(&CameraConfig::default());
        let before = camera.position;
        let moved = controls.update(&mut camera, 1.0 / 60.0);
        assert!(!moved);
        assert!((camera.position - before).length() < 1e-3);
    }

    #[test]
    fn damping_keeps_moving_after_release_and_decays() {
        let mut camera = camera();
        let mut controls = OrbitControls::from_config(&CameraConfig::default());
        controls.rotate(120.0, 0.0, 600.0);

        let mut steps = Vec::new();
        for _ in 0..20 {
            let before = camera.position;
            assert!(controls.update(&mut camera, 1.0 / 60.0));
            steps.push((camera.position - before).length());
        }
        for pair in steps.windows(2) {
            assert!(pair[1] < pair[0]);
        }
        assert!(!controls.is_settled());
    }

    #[test]
    fn orbit_preserves_distance_to_target() {
        let mut camera = camera();
        let mut controls = OrbitControls::from_config(&CameraConfig::default());
        let radius = (camera.position - controls.target).length();
        controls.rotate(300.0, -80.0, 600.0);
        for _ in 0..200 {
            controls.update(&mut camera, 1.0 / 60.0);
        }
        assert!(((camera.position - controls.target).length() - radius).abs() < 1e-2);
        assert_eq!(camera.target, controls.target);
    }

    #[test]
    fn undamped_controls_apply_input_at_once() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, false, 0.05);
        controls.rotate(50.0, 0.0, 600.0);
        controls.update(&mut camera, 1.0 / 60.0);
        assert!(controls.is_settled());
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, false, 0.05);
        controls.rotate(0.0, 10_000.0, 600.0);
        controls.update(&mut camera, 1.0 / 60.0);
        assert!(camera.position.y > 0.0);
        assert!(camera.position.is_finite());
    }

    #[test]
    fn pan_moves_target_with_camera() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, false, 0.05);
        let offset_before = camera.position - controls.target;
        controls.pan(40.0, 0.0, &camera, Vec2::new(800.0, 600.0));
        controls.update(&mut camera, 1.0 / 60.0);
        assert!(controls.target.length() > 0.0);
        assert!(((camera.position - controls.target) - offset_before).length() < 1e-2);
    }

    #[test]
    fn wheel_zoom_is_clamped() {
        let mut camera = camera();
        let mut controls = OrbitControls::from_config(&CameraConfig::default());
        controls.zoom(1.0, &mut camera);
        assert!(camera.zoom > 1.0);
        for _ in 0..1000 {
            controls.zoom(1.0, &mut camera);
        }
        assert_eq!(camera.zoom, MAX_ZOOM);
        for _ in 0..2000 {
            controls.zoom(-1.0, &mut camera);
        }
        assert_eq!(camera.zoom, MIN_ZOOM);
    }

    #[test]
    fn each_step_moves_one_increment_further() {
        let mut camera = camera();
        let mut stepper = CameraStepper::from_config(&CameraConfig::default());
        assert_eq!(stepper.step(&mut camera), Vec3::new(170.0, 110.0, -55.0));
        assert_eq!(stepper.step(&mut camera), Vec3::new(180.0, 110.0, -55.0));
        assert_eq!(stepper.accumulated(), 20.0);
    }

    #[test]
    fn dragging_never_touches_the_step_accumulator() {
        let mut camera = camera();
        let mut controls = OrbitControls::from_config(&CameraConfig::default());
        let mut stepper = CameraStepper::from_config(&CameraConfig::default());

        stepper.step(&mut camera);
        controls.rotate(200.0, 30.0, 600.0);
        for _ in 0..10 {
            controls.update(&mut camera, 1.0 / 60.0);
        }
        assert_eq!(stepper.accumulated(), 10.0);

        let position = stepper.step(&mut camera);
        assert_eq!(stepper.accumulated(), 20.0);
        assert_eq!(position, Vec3::new(180.0, 110.0, -55.0));
        assert_eq!(camera.position, position);
    }
}
