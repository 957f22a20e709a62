//! The recursive radiance estimator.
//!
//! Estimates the light arriving along a ray by sampling one scattering
//! direction per bounce (two for shallow dielectric hits), weighting
//! the recursive estimate by the material response, and letting Russian
//! roulette decide termination.

use std::f64::consts::PI;

use ember_math::{DVec3, Ray};

use crate::environment::Environment;
use crate::material::{Color, ScatterKind};
use crate::random::XorShift128;
use crate::scene::{Intersection, Scene};
use crate::stats::RenderStats;

/// Depth at or below which roulette never terminates a path.
pub const MIN_DEPTH: u32 = 5;

/// Depth past which the survival probability decays toward zero, so
/// even near-white surfaces terminate eventually.
pub const MAX_DEPTH: u32 = 64;

// Refractive index of the medium surrounding all objects.
const VACUUM_INDEX: f64 = 1.0;

// Guards the helper-axis choice when building a surface basis.
const BASIS_EPSILON: f64 = 1e-6;

/// Read-only context shared by every ray of a pass.
#[derive(Clone, Copy)]
pub struct TraceContext<'a> {
    pub scene: &'a dyn Scene,
    pub environment: Option<&'a dyn Environment>,
    pub stats: &'a RenderStats,
}

/// Estimate the radiance arriving at `ray.origin` from `ray.direction`.
///
/// A miss is a defined outcome: the environment contribution (or black)
/// comes back, never an error. `depth` counts bounces from the eye and
/// only ever grows; all other recursion state lives in `rng`.
pub fn radiance(ctx: &TraceContext, ray: &Ray, rng: &mut XorShift128, depth: u32) -> Color {
    ctx.stats.count_intersection_test();
    let Some(hit) = ctx.scene.check_intersection(ray) else {
        return match ctx.environment {
            Some(environment) => environment.sample(ray.direction),
            None => Color::ZERO,
        };
    };

    // Face the normal against the incoming ray
    let normal = if hit.normal.dot(ray.direction) < 0.0 {
        hit.normal
    } else {
        -hit.normal
    };

    let survival = survival_probability(hit.material.albedo, depth);
    if depth > MIN_DEPTH && rng.next_f64() >= survival {
        // Terminated: the indirect contribution is dropped on purpose
        // and only the surface emission survives.
        if hit.material.emission.length_squared() == 0.0 {
            ctx.stats.count_absorbed();
        }
        return hit.material.emission;
    }

    match hit.material.kind {
        ScatterKind::Diffuse => diffuse_income(ctx, &hit, normal, rng, depth, survival),
        ScatterKind::Mirror => mirror_income(ctx, ray, &hit, normal, rng, depth, survival),
        ScatterKind::Dielectric => dielectric_income(ctx, ray, &hit, normal, rng, depth, survival),
    }
}

/// Roulette survival probability for a surface with `albedo` hit at
/// `depth`. Forced to 1 at shallow depth so every path reaches a
/// minimum length; decays geometrically past [`MAX_DEPTH`].
pub fn survival_probability(albedo: Color, depth: u32) -> f64 {
    if depth <= MIN_DEPTH {
        return 1.0;
    }
    let p = albedo.max_element();
    if depth > MAX_DEPTH {
        p * 0.5f64.powi((depth - MAX_DEPTH) as i32)
    } else {
        p
    }
}

fn diffuse_income(
    ctx: &TraceContext,
    hit: &Intersection,
    normal: DVec3,
    rng: &mut XorShift128,
    depth: u32,
    survival: f64,
) -> Color {
    let (u, v, w) = orthonormal_basis(normal);
    let direction = cosine_sample(u, v, w, rng.next_f64(), rng.next_f64());

    // The cosine factor of the rendering equation and the cosine/pi pdf
    // cancel, leaving just albedo over the survival probability.
    let weight = hit.material.albedo / survival;
    let income = radiance(ctx, &Ray::new(hit.position, direction), rng, depth + 1);
    hit.material.emission + weight * income
}

fn mirror_income(
    ctx: &TraceContext,
    ray: &Ray,
    hit: &Intersection,
    normal: DVec3,
    rng: &mut XorShift128,
    depth: u32,
    survival: f64,
) -> Color {
    let direction = reflect(ray.direction, normal);
    let weight = hit.material.albedo / survival;
    let income = radiance(ctx, &Ray::new(hit.position, direction), rng, depth + 1);
    hit.material.emission + weight * income
}

fn dielectric_income(
    ctx: &TraceContext,
    ray: &Ray,
    hit: &Intersection,
    normal: DVec3,
    rng: &mut XorShift128,
    depth: u32,
    survival: f64,
) -> Color {
    let material = hit.material;
    let entering = hit.normal.dot(normal) > 0.0;
    let reflect_dir = reflect(ray.direction, normal);

    let n_object = material.refractive_index;
    let n_ratio = if entering {
        VACUUM_INDEX / n_object
    } else {
        n_object / VACUUM_INDEX
    };

    let d_dot_n = ray.direction.dot(normal);
    // Squared cosine of the refraction angle via Snell's law
    let cos2t = 1.0 - n_ratio * n_ratio * (1.0 - d_dot_n * d_dot_n);

    if cos2t < 0.0 {
        // Total internal reflection: all energy stays on the reflected
        // side, no refracted branch exists
        let income = radiance(ctx, &Ray::new(hit.position, reflect_dir), rng, depth + 1);
        return material.emission + material.albedo / survival * income;
    }

    let refract_dir =
        ((ray.direction - normal * d_dot_n) * n_ratio - normal * cos2t.sqrt()).normalize();
    let refract_ray = Ray::new(hit.position, refract_dir);

    // Schlick's approximation of the Fresnel reflectance
    let f0 = (n_object - VACUUM_INDEX).powi(2) / (n_object + VACUUM_INDEX).powi(2);
    let cos_theta = if entering {
        -d_dot_n
    } else {
        -refract_dir.dot(normal)
    };
    let fr = f0 + (1.0 - f0) * (1.0 - cos_theta).powi(5);
    // Radiance compression across the interface
    let tr = (1.0 - fr) * n_ratio * n_ratio;

    let (weight, income) = if depth > 2 {
        // Deep in the path: follow one side only, picked in proportion
        // to the Fresnel split, which bounds the ray count
        let reflect_prob = 0.1 + 0.8 * fr;
        if rng.next_f64() < reflect_prob {
            let income = radiance(ctx, &Ray::new(hit.position, reflect_dir), rng, depth + 1) * fr;
            (material.albedo / (survival * reflect_prob), income)
        } else {
            let income = radiance(ctx, &refract_ray, rng, depth + 1) * tr;
            (material.albedo / (survival * (1.0 - reflect_prob)), income)
        }
    } else {
        // Shallow: follow both sides to tame variance near glass
        let income = radiance(ctx, &Ray::new(hit.position, reflect_dir), rng, depth + 1) * fr
            + radiance(ctx, &refract_ray, rng, depth + 1) * tr;
        (material.albedo / survival, income)
    };

    material.emission + weight * income
}

/// Mirror `direction` about the unit normal `normal`.
fn reflect(direction: DVec3, normal: DVec3) -> DVec3 {
    (direction - normal * (2.0 * direction.dot(normal))).normalize()
}

/// Orthonormal basis `(u, v, w)` around the unit vector `w`.
///
/// The helper axis switches away from (1,0,0) when `w` leans along x,
/// so the cross product never degenerates.
fn orthonormal_basis(w: DVec3) -> (DVec3, DVec3, DVec3) {
    let u = if w.x.abs() > BASIS_EPSILON {
        DVec3::Y.cross(w)
    } else {
        DVec3::X.cross(w)
    }
    .normalize();
    (u, w.cross(u), w)
}

/// Cosine-weighted direction over the hemisphere around `w`, from two
/// uniform variates.
fn cosine_sample(u: DVec3, v: DVec3, w: DVec3, u1: f64, u2: f64) -> DVec3 {
    let phi = 2.0 * PI * u1;
    let cos_theta = u2.sqrt();
    let sin_theta = (1.0 - u2).sqrt();
    (u * (sin_theta * phi.cos()) + v * (sin_theta * phi.sin()) + w * cos_theta).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::scene::SphereScene;
    use std::sync::Mutex;

    struct ConstEnvironment(Color);

    impl Environment for ConstEnvironment {
        fn sample(&self, _direction: DVec3) -> Color {
            self.0
        }
    }

    // Scene that replays scripted intersections and records every
    // queried ray.
    struct ScriptedScene {
        hits: Vec<(DVec3, DVec3, Material)>,
        queries: Mutex<Vec<Ray>>,
    }

    impl ScriptedScene {
        fn new(hits: Vec<(DVec3, DVec3, Material)>) -> Self {
            Self {
                hits,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }

        fn query(&self, index: usize) -> Ray {
            self.queries.lock().unwrap()[index]
        }
    }

    impl Scene for ScriptedScene {
        fn check_intersection(&self, ray: &Ray) -> Option<Intersection<'_>> {
            let mut queries = self.queries.lock().unwrap();
            let index = queries.len();
            queries.push(*ray);
            self.hits
                .get(index)
                .map(|(position, normal, material)| Intersection {
                    position: *position,
                    normal: *normal,
                    distance: 1.0,
                    material,
                })
        }
    }

    fn trace<'a>(scene: &'a dyn Scene, environment: Option<&'a dyn Environment>) -> TraceContext<'a> {
        // Leaking keeps the stats alive for the borrow in the context;
        // fine for a handful of tests.
        let stats: &'a RenderStats = Box::leak(Box::new(RenderStats::new()));
        TraceContext {
            scene,
            environment,
            stats,
        }
    }

    #[test]
    fn test_miss_returns_black_without_environment() {
        let scene = SphereScene::new();
        let ctx = trace(&scene, None);
        let ray = Ray::new(DVec3::ZERO, DVec3::NEG_Z);

        for depth in [0, 3, 10, 100] {
            let mut rng = XorShift128::new(depth);
            assert_eq!(radiance(&ctx, &ray, &mut rng, depth), Color::ZERO);
        }
    }

    #[test]
    fn test_miss_returns_environment_lookup() {
        let scene = SphereScene::new();
        let sky = ConstEnvironment(Color::new(0.25, 0.5, 2.0));
        let ctx = trace(&scene, Some(&sky));
        let ray = Ray::new(DVec3::ZERO, DVec3::Y);

        for depth in [0, 7, 80] {
            let mut rng = XorShift128::new(1);
            assert_eq!(radiance(&ctx, &ray, &mut rng, depth), sky.0);
        }
    }

    #[test]
    fn test_survival_forced_at_shallow_depth() {
        let albedo = Color::new(0.1, 0.2, 0.3);
        for depth in 0..=MIN_DEPTH {
            assert_eq!(survival_probability(albedo, depth), 1.0);
        }
        // Beyond the floor it is the largest albedo channel
        assert_eq!(survival_probability(albedo, MIN_DEPTH + 1), 0.3);
    }

    #[test]
    fn test_survival_decays_past_max_depth() {
        let albedo = Color::ONE;
        assert_eq!(survival_probability(albedo, MAX_DEPTH), 1.0);
        assert_eq!(survival_probability(albedo, MAX_DEPTH + 1), 0.5);
        assert_eq!(survival_probability(albedo, MAX_DEPTH + 3), 0.125);
        assert!(survival_probability(albedo, MAX_DEPTH + 60) > 0.0);
    }

    #[test]
    fn test_shallow_depth_always_scatters() {
        // Black albedo would terminate instantly past the floor, but at
        // shallow depth the path must scatter anyway: two scene queries.
        let emission = Color::new(2.0, 3.0, 4.0);
        let material = Material {
            emission,
            ..Material::diffuse(Color::ZERO)
        };
        let scene = ScriptedScene::new(vec![(DVec3::ZERO, DVec3::Y, material)]);
        let ctx = trace(&scene, None);
        let mut rng = XorShift128::new(9);

        let ray = Ray::new(DVec3::new(0.0, 1.0, 0.0), DVec3::NEG_Y);
        let result = radiance(&ctx, &ray, &mut rng, MIN_DEPTH);

        assert_eq!(scene.query_count(), 2);
        // Weight is zero, so only the emission term remains
        assert_eq!(result, emission);
    }

    #[test]
    fn test_deep_black_surface_terminates_with_emission() {
        let emission = Color::new(2.0, 3.0, 4.0);
        let material = Material {
            emission,
            ..Material::diffuse(Color::ZERO)
        };
        let scene = ScriptedScene::new(vec![(DVec3::ZERO, DVec3::Y, material)]);
        let ctx = trace(&scene, None);
        let mut rng = XorShift128::new(9);

        let ray = Ray::new(DVec3::new(0.0, 1.0, 0.0), DVec3::NEG_Y);
        let result = radiance(&ctx, &ray, &mut rng, MIN_DEPTH + 1);

        // Roulette fires immediately (survival 0): one query, emission only
        assert_eq!(scene.query_count(), 1);
        assert_eq!(result, emission);
    }

    #[test]
    fn test_mirror_law() {
        let d = DVec3::new(1.0, -1.0, 0.0).normalize();
        let n = DVec3::Y;
        let r = reflect(d, n);

        let expected = d - n * (2.0 * d.dot(n));
        assert!((r - expected.normalize()).length() < 1e-12);
        assert!((r.length() - 1.0).abs() < 1e-12);
        // 45 degree incidence flips the y component
        assert!((r - DVec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-12);
    }

    #[test]
    fn test_mirror_traces_reflected_direction() {
        let material = Material::mirror(Color::ONE);
        let scene = ScriptedScene::new(vec![(DVec3::ZERO, DVec3::Y, material)]);
        let ctx = trace(&scene, None);
        let mut rng = XorShift128::new(3);

        let d = DVec3::new(1.0, -1.0, 0.0).normalize();
        radiance(&ctx, &Ray::new(DVec3::new(-1.0, 1.0, 0.0), d), &mut rng, 0);

        assert_eq!(scene.query_count(), 2);
        let bounced = scene.query(1);
        assert!((bounced.direction - DVec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-12);
    }

    #[test]
    fn test_total_internal_reflection_traces_single_branch() {
        // Grazing exit from glass: sin(theta) = 0.9 > 1/1.5, so the
        // refraction discriminant is negative.
        let material = Material::dielectric(Color::ONE, 1.5);
        let normal = DVec3::Y;
        let direction = DVec3::new(0.9, 0.19f64.sqrt(), 0.0);
        let scene = ScriptedScene::new(vec![(DVec3::ZERO, normal, material)]);
        let ctx = trace(&scene, None);
        let mut rng = XorShift128::new(5);

        let emission_free = radiance(&ctx, &Ray::new(DVec3::ZERO, direction), &mut rng, 0);

        // Primary query plus exactly one reflected branch
        assert_eq!(scene.query_count(), 2);
        let bounced = scene.query(1);
        let expected = DVec3::new(0.9, -(0.19f64.sqrt()), 0.0);
        assert!((bounced.direction - expected).length() < 1e-9);
        // The single branch missed everything, so nothing comes back
        assert_eq!(emission_free, Color::ZERO);
    }

    #[test]
    fn test_shallow_dielectric_traces_both_branches() {
        // Head-on entry refracts; at depth <= 2 both sides are traced.
        let material = Material::dielectric(Color::ONE, 1.5);
        let scene = ScriptedScene::new(vec![(DVec3::ZERO, DVec3::Y, material)]);
        let ctx = trace(&scene, None);
        let mut rng = XorShift128::new(5);

        radiance(&ctx, &Ray::new(DVec3::new(0.0, 1.0, 0.0), DVec3::NEG_Y), &mut rng, 0);

        assert_eq!(scene.query_count(), 3);
    }

    #[test]
    fn test_deep_dielectric_traces_single_branch() {
        let material = Material::dielectric(Color::ONE, 1.5);
        let scene = ScriptedScene::new(vec![(DVec3::ZERO, DVec3::Y, material)]);
        let ctx = trace(&scene, None);
        let mut rng = XorShift128::new(5);

        radiance(&ctx, &Ray::new(DVec3::new(0.0, 1.0, 0.0), DVec3::NEG_Y), &mut rng, 3);

        assert_eq!(scene.query_count(), 2);
    }

    #[test]
    fn test_orthonormal_basis() {
        for w in [
            DVec3::Y,
            DVec3::X,
            DVec3::NEG_Z,
            DVec3::new(1.0, 2.0, -3.0).normalize(),
        ] {
            let (u, v, w) = orthonormal_basis(w);
            assert!((u.length() - 1.0).abs() < 1e-12);
            assert!((v.length() - 1.0).abs() < 1e-12);
            assert!(u.dot(v).abs() < 1e-12);
            assert!(u.dot(w).abs() < 1e-12);
            assert!(v.dot(w).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cosine_sample_stays_in_hemisphere() {
        let (u, v, w) = orthonormal_basis(DVec3::new(0.3, 0.8, -0.1).normalize());
        let mut rng = XorShift128::new(21);
        for _ in 0..1_000 {
            let d = cosine_sample(u, v, w, rng.next_f64(), rng.next_f64());
            assert!((d.length() - 1.0).abs() < 1e-12);
            assert!(d.dot(w) >= 0.0);
        }
    }

    #[test]
    fn test_closed_diffuse_scene_stays_bounded() {
        // Viewer inside a large emissive diffuse sphere: the geometric
        // series emission / (1 - albedo) bounds the estimate.
        let mut material = Material::diffuse(Color::new(0.5, 0.5, 0.5));
        material.emission = Color::new(1.0, 1.0, 1.0);
        let mut scene = SphereScene::new();
        scene.add(crate::sphere::Sphere::new(DVec3::ZERO, 1.0e4, material));
        let ctx = trace(&scene, None);

        let mut rng = XorShift128::new(77);
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        let mut total = Color::ZERO;
        let samples = 200;
        for _ in 0..samples {
            let estimate = radiance(&ctx, &ray, &mut rng, 0);
            assert!(estimate.x.is_finite() && estimate.y.is_finite() && estimate.z.is_finite());
            total += estimate;
        }
        let mean = total / f64::from(samples);
        assert!(mean.x > 1.0 && mean.x < 10.0);
    }
}
