//! Pinhole camera for primary-ray generation.

use ember_math::{DVec3, Ray};

/// Maps screen positions to world-space rays.
///
/// Purely geometric: the camera owns no render state and the mapping
/// has no side effects, so it is shared freely across row workers.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub width: u32,
    pub height: u32,

    // Camera positioning
    position: DVec3,
    direction: DVec3,
    up: DVec3,

    // Physical screen placed in front of the eye
    screen_height: f64,
    screen_distance: f64,

    // Cached computed values (set by initialize())
    screen_center: DVec3,
    screen_x: DVec3,
    screen_y: DVec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            width: 640,
            height: 480,
            position: DVec3::ZERO,
            direction: DVec3::NEG_Z,
            up: DVec3::Y,
            screen_height: 2.0,
            screen_distance: 1.0,
            screen_center: DVec3::ZERO,
            screen_x: DVec3::X,
            screen_y: DVec3::Y,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set eye position and viewing direction.
    pub fn with_position(mut self, position: DVec3, direction: DVec3, up: DVec3) -> Self {
        self.position = position;
        self.direction = direction;
        self.up = up;
        self
    }

    /// Set the world-space screen height and its distance from the eye.
    pub fn with_screen(mut self, screen_height: f64, screen_distance: f64) -> Self {
        self.screen_height = screen_height;
        self.screen_distance = screen_distance;
        self
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        let dir = self.direction.normalize();
        let screen_width = self.screen_height * f64::from(self.width) / f64::from(self.height);

        self.screen_x = dir.cross(self.up).normalize() * screen_width;
        self.screen_y = self.screen_x.cross(dir).normalize() * self.screen_height;
        self.screen_center = self.position + dir * self.screen_distance;
        self.direction = dir;
    }

    /// Eye position in world space.
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// World-space center of the screen rectangle.
    pub fn screen_center(&self) -> DVec3 {
        self.screen_center
    }

    /// Screen basis vector spanning the full screen width.
    pub fn screen_axis_x(&self) -> DVec3 {
        self.screen_x
    }

    /// Screen basis vector spanning the full screen height, pointing up.
    pub fn screen_axis_y(&self) -> DVec3 {
        self.screen_y
    }

    /// Build the primary ray through pixel `(x, y)` at the sub-pixel
    /// offset `(rx, ry)` in [0, 1].
    ///
    /// `y` counts up from the bottom screen row.
    pub fn primary_ray(&self, x: u32, y: u32, rx: f64, ry: f64) -> Ray {
        let u = (f64::from(x) + rx) / f64::from(self.width) - 0.5;
        let v = (f64::from(y) + ry) / f64::from(self.height) - 0.5;

        let target = self.screen_center + self.screen_x * u + self.screen_y * v;
        Ray::new(self.position, (target - self.position).normalize())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        let mut camera = Camera::new()
            .with_resolution(100, 100)
            .with_position(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y)
            .with_screen(2.0, 1.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_screen_axes_orthogonal() {
        let camera = test_camera();

        assert!(camera.screen_axis_x().dot(camera.screen_axis_y()).abs() < 1e-12);
        assert!(camera.screen_axis_x().dot(DVec3::NEG_Z).abs() < 1e-12);
        // y axis points up for an upright camera
        assert!(camera.screen_axis_y().y > 0.0);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let camera = test_camera();

        // Center of the middle pixel aims straight down the view axis
        let ray = camera.primary_ray(49, 49, 1.0, 1.0);
        assert!((ray.direction - DVec3::NEG_Z).length() < 1e-9);
    }

    #[test]
    fn test_primary_rays_are_normalized() {
        let camera = test_camera();

        for (x, y) in [(0, 0), (0, 99), (99, 0), (99, 99), (13, 77)] {
            let ray = camera.primary_ray(x, y, 0.5, 0.5);
            assert!((ray.direction.length() - 1.0).abs() < 1e-12);
            assert_eq!(ray.origin, camera.position());
        }
    }

    #[test]
    fn test_bottom_row_aims_down() {
        let camera = test_camera();

        let low = camera.primary_ray(50, 0, 0.5, 0.5);
        let high = camera.primary_ray(50, 99, 0.5, 0.5);
        assert!(low.direction.y < 0.0);
        assert!(high.direction.y > 0.0);
    }
}
