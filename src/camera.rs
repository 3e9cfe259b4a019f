//! Camera, projection and orbit controls.
//!
//! The camera looks from `position` at `target`. [`OrbitController`] moves it
//! on a sphere around the target in response to mouse drags and the scroll
//! wheel. Input only accumulates deltas; [`OrbitController::update`] applies a
//! fraction of them every frame so the motion eases out.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const EPS: f32 = 0.000001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Unit vector pointing to the right of the view direction.
    pub fn right(&self) -> Vector3<f32> {
        (self.target - self.position).cross(self.up).normalize()
    }
}

/// Perspective projection. `fovy` is the vertical field of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    // The sprite shader reads the camera's right and up axes from here
    view: [[f32; 4]; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        let view = camera.calc_matrix();
        self.view = view.into();
        self.view_proj = (projection.calc_matrix() * view).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// What a mouse drag currently does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
    Dolly,
}

/// Damped orbit controls around `Camera::target`.
#[derive(Debug)]
pub struct OrbitController {
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vector3<f32>,
    drag: Option<DragMode>,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
}

impl OrbitController {
    pub fn new(damping_factor: f32) -> Self {
        Self {
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: EPS,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            drag: None,
            cursor: None,
            viewport_height: 1.0,
        }
    }

    /// Drag distances are measured relative to the viewport height.
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    pub fn drag_mode(&self) -> Option<DragMode> {
        self.drag
    }

    /// Turn around the target. Positive `dx` swings the camera left.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.delta_theta -= 2.0 * PI * dx / self.viewport_height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy / self.viewport_height * self.rotate_speed;
    }

    /// Move the target across the ground plane. The drag is scaled so that
    /// the point under the cursor roughly follows it.
    pub fn pan(&mut self, camera: &Camera, projection: &Projection, dx: f32, dy: f32) {
        let distance = (camera.position - camera.target).magnitude() * (projection.fovy.0 / 2.0).tan();
        let right = camera.right();
        let ahead = camera.up.cross(right);
        let left = -2.0 * dx * distance / self.viewport_height * self.pan_speed;
        let forward = 2.0 * dy * distance / self.viewport_height * self.pan_speed;
        self.pan_offset += right * left + ahead * forward;
    }

    /// Positive `steps` zoom in.
    pub fn dolly(&mut self, steps: f32) {
        let zoom = 0.95f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= zoom;
        } else if steps < 0.0 {
            self.scale /= zoom;
        }
    }

    /// Track mouse buttons, cursor motion and the wheel. Cursor motion needs
    /// the camera for panning, so it is applied through [`Self::handle_cursor`].
    ///
    /// Returns `true` if the event was used.
    pub fn handle_window_events(
        &mut self,
        event: &WindowEvent,
        camera: &Camera,
        projection: &Projection,
    ) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => Some(DragMode::Rotate),
                    (ElementState::Pressed, MouseButton::Right) => Some(DragMode::Pan),
                    (ElementState::Pressed, MouseButton::Middle) => Some(DragMode::Dolly),
                    (ElementState::Released, _) => None,
                    _ => self.drag,
                };
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(*position, camera, projection);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.drag = None;
                self.cursor = None;
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / 100.0) as f32,
                };
                self.dolly(steps);
                true
            }
            WindowEvent::Resized(size) => {
                self.set_viewport_height(size.height);
                false
            }
            _ => false,
        }
    }

    pub fn handle_cursor(
        &mut self,
        position: PhysicalPosition<f64>,
        camera: &Camera,
        projection: &Projection,
    ) {
        let previous = self.cursor.replace(position);
        let (Some(previous), Some(mode)) = (previous, self.drag) else {
            return;
        };
        let dx = (position.x - previous.x) as f32;
        let dy = (position.y - previous.y) as f32;
        match mode {
            DragMode::Rotate => self.rotate(dx, dy),
            DragMode::Pan => self.pan(camera, projection, dx, dy),
            // dragging up zooms in
            DragMode::Dolly => self.dolly(-dy / 10.0),
        }
    }

    /// Apply a damped share of the pending motion to `camera`.
    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        theta += self.delta_theta * self.damping_factor;
        phi += self.delta_phi * self.damping_factor;
        phi = phi.clamp(EPS, PI - EPS);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.target += self.pan_offset * self.damping_factor;

        let sin_phi_radius = phi.sin() * radius;
        let offset = Vector3::new(
            sin_phi_radius * theta.sin(),
            phi.cos() * radius,
            sin_phi_radius * theta.cos(),
        );
        camera.position = camera.target + offset;

        let keep = 1.0 - self.damping_factor;
        self.delta_theta *= keep;
        self.delta_phi *= keep;
        self.pan_offset *= keep;
        self.scale = 1.0;
    }

    /// Rotation still waiting to be applied, in radians.
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.delta_theta, self.delta_phi)
    }
}

/// Camera state together with its GPU uniform.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn write_to_buffer(&mut self, projection: &Projection, queue: &wgpu::Queue) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn camera_from_config(config: &CameraConfig) -> Camera {
    Camera::new(config.position, config.target)
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, MetricSpace};

    use super::*;

    fn setup() -> (Camera, Projection, OrbitController) {
        let camera = camera_from_config(&CameraConfig::default());
        let projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        let mut controller = OrbitController::new(0.25);
        controller.set_viewport_height(600);
        (camera, projection, controller)
    }

    #[test]
    fn resize_sets_exact_aspect() {
        let (_, mut projection, _) = setup();
        projection.resize(1920, 1080);
        assert_eq!(projection.aspect, 1920.0 / 1080.0);
        projection.resize(333, 777);
        assert_eq!(projection.aspect, 333.0 / 777.0);
    }

    #[test]
    fn idle_update_keeps_camera_still() {
        let (mut camera, _, mut controller) = setup();
        let before = camera;
        controller.update(&mut camera);
        assert!(camera.position.distance(before.position) < 1e-4);
        assert_eq!(camera.target, before.target);
    }

    #[test]
    fn rotation_is_damped_and_keeps_distance() {
        let (mut camera, _, mut controller) = setup();
        let radius = camera.position.distance(camera.target);
        controller.rotate(100.0, 0.0);
        let (initial, _) = controller.pending_rotation();
        assert!(initial < 0.0);

        controller.update(&mut camera);
        let (remaining, _) = controller.pending_rotation();
        assert!((remaining - initial * 0.75).abs() < 1e-6);

        for _ in 0..100 {
            controller.update(&mut camera);
        }
        let (remaining, _) = controller.pending_rotation();
        assert!(remaining.abs() < 1e-6);
        assert!((camera.position.distance(camera.target) - radius).abs() < 1e-3);
        assert!(camera.position.x.abs() > 1.0);
    }

    fn polar_angle(camera: &Camera) -> f32 {
        let offset = camera.position - camera.target;
        (offset.y / offset.magnitude()).clamp(-1.0, 1.0).acos()
    }

    #[test]
    fn polar_angle_is_clamped() {
        let (mut camera, _, mut controller) = setup();
        let radius = camera.position.distance(camera.target);

        // dragging far down swings the camera over the top, where it stops
        controller.rotate(0.0, 100_000.0);
        for _ in 0..50 {
            controller.update(&mut camera);
            let phi = polar_angle(&camera);
            assert!((0.0..=PI).contains(&phi));
        }
        assert!(polar_angle(&camera) < 1e-3);
        assert!(camera.position.y > camera.target.y);
        assert!((camera.position.distance(camera.target) - radius).abs() < 1e-3);

        // and dragging far up stops it right below the target
        controller.rotate(0.0, -200_000.0);
        for _ in 0..50 {
            controller.update(&mut camera);
        }
        assert!(polar_angle(&camera) > PI - 1e-3);
        assert!(camera.position.y < camera.target.y);
        assert!((camera.position.distance(camera.target) - radius).abs() < 1e-3);
    }

    #[test]
    fn wheel_up_zooms_in() {
        let (mut camera, _, mut controller) = setup();
        let radius = camera.position.distance(camera.target);
        controller.dolly(1.0);
        controller.update(&mut camera);
        let zoomed = camera.position.distance(camera.target);
        assert!((zoomed - radius * 0.95).abs() < 1e-3);
        controller.dolly(-1.0);
        controller.update(&mut camera);
        assert!((camera.position.distance(camera.target) - radius).abs() < 1e-3);
    }

    #[test]
    fn pan_moves_target_in_ground_plane() {
        let (mut camera, projection, mut controller) = setup();
        controller.pan(&camera, &projection, 50.0, 20.0);
        for _ in 0..100 {
            controller.update(&mut camera);
        }
        assert_eq!(camera.target.y, 0.0);
        // dragging right moves the scene with the cursor, i.e. the target left
        assert!(camera.target.x < 0.0);
    }

    #[test]
    fn drag_without_button_does_nothing() {
        let (camera, projection, mut controller) = setup();
        controller.handle_cursor((10.0, 10.0).into(), &camera, &projection);
        controller.handle_cursor((200.0, 10.0).into(), &camera, &projection);
        assert_eq!(controller.pending_rotation(), (0.0, 0.0));
        assert_eq!(controller.drag_mode(), None);
    }
}
