//! Progressive render of a Cornell-box style sphere scene.
//!
//! Renders with an increasing sample count and saves a PNG after each
//! pass, so the image sharpens while the process runs. Pass a path to a
//! Radiance `.hdr` panorama as the first argument to light the scene
//! with it.

use std::time::{Duration, Instant};

use ember_renderer::{
    Camera, Color, DVec3, EnvironmentMap, Material, PngSaver, RenderConfig, Renderer, Sphere,
    SphereScene, ThrottledSink,
};

fn main() {
    env_logger::init();

    let scene = build_scene();

    let camera = Camera::new()
        .with_resolution(640, 480)
        .with_position(
            DVec3::new(50.0, 52.0, 220.0),
            DVec3::new(0.0, -0.04, -1.0),
            DVec3::Y,
        )
        .with_screen(30.0, 40.0);

    let config = RenderConfig {
        min_samples: 4,
        max_samples: 64,
        step_samples: 4,
        supersamples: 2,
    };

    let mut renderer = Renderer::new(camera, config)
        .expect("render configuration")
        .with_sink(ThrottledSink::new(
            PngSaver::new("cornell"),
            Duration::from_secs(10),
        ));

    if let Some(path) = std::env::args().nth(1) {
        let environment = EnvironmentMap::from_hdr_file(&path).expect("environment map");
        renderer = renderer.with_environment(environment);
    }

    println!(
        "Rendering {}x{} up to {} samples/pixel...",
        renderer.camera().width,
        renderer.camera().height,
        config.max_samples
    );

    let start = Instant::now();
    renderer.render(&scene);
    println!("Rendered in {:?}", start.elapsed());
    println!("{}", renderer.progress_summary());
}

fn build_scene() -> SphereScene {
    let mut scene = SphereScene::new();

    let white = Material::diffuse(Color::new(0.75, 0.75, 0.75));

    // Walls as giant spheres
    scene.add(Sphere::new(
        DVec3::new(1e5 + 1.0, 40.8, 81.6),
        1e5,
        Material::diffuse(Color::new(0.75, 0.25, 0.25)),
    ));
    scene.add(Sphere::new(
        DVec3::new(-1e5 + 99.0, 40.8, 81.6),
        1e5,
        Material::diffuse(Color::new(0.25, 0.25, 0.75)),
    ));
    scene.add(Sphere::new(DVec3::new(50.0, 40.8, 1e5), 1e5, white));
    scene.add(Sphere::new(
        DVec3::new(50.0, 40.8, -1e5 + 250.0),
        1e5,
        Material::diffuse(Color::ZERO),
    ));
    scene.add(Sphere::new(DVec3::new(50.0, 1e5, 81.6), 1e5, white));
    scene.add(Sphere::new(DVec3::new(50.0, -1e5 + 81.6, 81.6), 1e5, white));

    // A diffuse ball, a mirror ball and a glass ball
    scene.add(Sphere::new(
        DVec3::new(65.0, 20.0, 20.0),
        16.5,
        Material::diffuse(Color::new(0.25, 0.75, 0.25)),
    ));
    scene.add(Sphere::new(
        DVec3::new(27.0, 16.5, 47.0),
        16.5,
        Material::mirror(Color::new(0.99, 0.99, 0.99)),
    ));
    scene.add(Sphere::new(
        DVec3::new(77.0, 16.5, 78.0),
        16.5,
        Material::dielectric(Color::new(0.99, 0.99, 0.99), 1.5),
    ));

    // Ceiling light
    scene.add(Sphere::new(
        DVec3::new(50.0, 90.0, 81.6),
        15.0,
        Material::emitter(Color::new(36.0, 36.0, 36.0)),
    ));

    scene
}
