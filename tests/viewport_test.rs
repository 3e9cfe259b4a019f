use cgmath::{Deg, MetricSpace, Point3};
use starship_snow::{
    SceneConfig,
    camera::{OrbitController, Projection, camera_from_config},
    context::resize_viewport,
};

fn surface_config(width: u32, height: u32) -> wgpu::SurfaceConfiguration {
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        width,
        height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    }
}

#[test]
fn resize_sets_aspect_and_surface_size() {
    let mut config = surface_config(640, 480);
    let mut projection = Projection::new(640, 480, Deg(75.0), 0.1, 1000.0);
    for (width, height) in [(1920, 1080), (333, 777), (1, 1)] {
        assert!(resize_viewport(&mut config, &mut projection, width, height));
        assert_eq!(projection.aspect, width as f32 / height as f32);
        assert_eq!((config.width, config.height), (width, height));
    }
}

#[test]
fn orbit_rotation_eases_out_and_keeps_distance() {
    let scene = SceneConfig::default();
    let mut camera = camera_from_config(&scene.camera);
    let mut controller = OrbitController::new(scene.camera.damping_factor);
    controller.set_viewport_height(600);
    let target = Point3::new(0.0, 0.0, 0.0);
    let distance = camera.position.distance(target);

    controller.rotate(30.0, 10.0);
    let (mut theta, mut phi) = controller.pending_rotation();
    for _ in 0..20 {
        controller.update(&mut camera);
        let (next_theta, next_phi) = controller.pending_rotation();
        assert!((next_theta - theta * 0.75).abs() < 1e-6);
        assert!((next_phi - phi * 0.75).abs() < 1e-6);
        (theta, phi) = (next_theta, next_phi);
        assert!((camera.position.distance(target) - distance).abs() < 1e-3);
    }
    assert!(theta.abs() < 0.01 && phi.abs() < 0.01);
}
