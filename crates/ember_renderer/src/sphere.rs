//! Sphere primitive for the built-in scene.

use ember_math::{DVec3, Interval, Ray};

use crate::material::Material;
use crate::scene::Intersection;

/// An analytic sphere.
pub struct Sphere {
    center: DVec3,
    radius: f64,
    material: Material,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: DVec3, radius: f64, material: Material) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            material,
        }
    }

    /// Get the surface material.
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Nearest intersection with `ray` whose distance lies strictly
    /// inside `range`.
    pub fn hit(&self, ray: &Ray, range: Interval) -> Option<Intersection<'_>> {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !range.surrounds(root) {
            root = (h + sqrtd) / a;
            if !range.surrounds(root) {
                return None;
            }
        }

        let position = ray.at(root);
        Some(Intersection {
            position,
            normal: (position - self.center) / self.radius,
            distance: root,
            material: &self.material,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Color;

    fn unit_range() -> Interval {
        Interval::new(1e-6, f64::INFINITY)
    }

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(
            DVec3::new(0.0, 0.0, -1.0),
            0.5,
            Material::diffuse(Color::new(0.5, 0.5, 0.5)),
        );

        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0));
        let hit = sphere.hit(&ray, unit_range()).unwrap();

        assert!((hit.distance - 0.5).abs() < 1e-9);
        // Normal faces back along the ray and is unit length
        assert!((hit.normal - DVec3::Z).length() < 1e-9);
        assert!((hit.normal.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(
            DVec3::new(0.0, 0.0, -1.0),
            0.5,
            Material::diffuse(Color::new(0.5, 0.5, 0.5)),
        );

        // Ray pointing away from the sphere
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 1.0, 0.0));
        assert!(sphere.hit(&ray, unit_range()).is_none());
    }

    #[test]
    fn test_hit_from_inside() {
        let sphere = Sphere::new(DVec3::ZERO, 2.0, Material::dielectric(Color::ONE, 1.5));

        // From the center, the first root is behind the origin; the far
        // root at the surface must be reported
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        let hit = sphere.hit(&ray, unit_range()).unwrap();

        assert!((hit.distance - 2.0).abs() < 1e-9);
        // Geometry normal still points outward
        assert!((hit.normal - DVec3::X).length() < 1e-9);
    }
}
