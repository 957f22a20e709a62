//! Scene abstraction consumed by the radiance estimator.

use ember_math::{DVec3, Interval, Ray};

use crate::material::Material;
use crate::sphere::Sphere;

/// Minimum hit distance; keeps secondary rays from immediately
/// re-hitting the surface they left.
pub(crate) const HIT_EPSILON: f64 = 1e-6;

/// Record of the nearest surface hit along a ray.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    /// World-space hit point
    pub position: DVec3,
    /// Unit surface normal as the geometry defines it, not flipped
    /// toward the ray
    pub normal: DVec3,
    /// Ray parameter of the hit
    pub distance: f64,
    /// Surface response at the hit point
    pub material: &'a Material,
}

/// Source of ray-scene intersections.
///
/// Queried concurrently from multiple row workers, so implementations
/// must be read-only during rendering.
pub trait Scene: Send + Sync {
    /// Nearest intersection along `ray`, if any. A miss is a normal
    /// outcome, not an error.
    fn check_intersection(&self, ray: &Ray) -> Option<Intersection<'_>>;
}

/// Flat list of spheres scanned for the nearest hit.
///
/// Deliberately minimal: intersection acceleration belongs to external
/// scene providers, this one exists so the renderer is usable and
/// testable on its own.
#[derive(Default)]
pub struct SphereScene {
    spheres: Vec<Sphere>,
}

impl SphereScene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sphere to the scene.
    pub fn add(&mut self, sphere: Sphere) {
        self.spheres.push(sphere);
    }

    /// Get the number of spheres.
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    /// Check if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }
}

impl Scene for SphereScene {
    fn check_intersection(&self, ray: &Ray) -> Option<Intersection<'_>> {
        let mut range = Interval::new(HIT_EPSILON, f64::INFINITY);
        let mut nearest = None;

        for sphere in &self.spheres {
            if let Some(hit) = sphere.hit(ray, range) {
                range.max = hit.distance;
                nearest = Some(hit);
            }
        }

        nearest
    }
}
