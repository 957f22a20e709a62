//! Image-based environment lighting.
//!
//! Rays that leave the scene pick up radiance from an equirectangular
//! HDR panorama instead of plain black.

use std::f64::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ember_math::DVec3;
use image::codecs::hdr::HdrDecoder;
use thiserror::Error;

use crate::material::Color;

/// Errors that can occur while loading an environment map.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel count {count} does not match {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        count: usize,
    },
}

/// Source of radiance for rays that leave the scene.
///
/// Sampled concurrently from row workers on every ray miss.
pub trait Environment: Send + Sync {
    /// Radiance arriving from the unit direction `direction`.
    fn sample(&self, direction: DVec3) -> Color;
}

/// Equirectangular radiance image.
///
/// Longitude maps to the horizontal axis, colatitude to the vertical
/// axis; lookups are bilinear.
pub struct EnvironmentMap {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl EnvironmentMap {
    /// Create a map from raw linear radiance pixels in row-major order,
    /// row 0 at the zenith.
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixels: Vec<Color>,
    ) -> Result<Self, EnvironmentError> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return Err(EnvironmentError::SizeMismatch {
                width,
                height,
                count: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Load a Radiance `.hdr` panorama.
    pub fn from_hdr_file(path: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let decoder = HdrDecoder::new(reader)?;
        let metadata = decoder.metadata();
        let (width, height) = (metadata.width, metadata.height);

        let pixels = decoder
            .read_image_hdr()?
            .into_iter()
            .map(|p| Color::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
            .collect();

        let map = Self::from_pixels(width, height, pixels)?;
        log::debug!(
            "Loaded environment map {} ({}x{})",
            path.display(),
            width,
            height
        );
        Ok(map)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Color {
        let index = (y * self.width + x) as usize;
        self.pixels.get(index).copied().unwrap_or(Color::ZERO)
    }
}

impl Environment for EnvironmentMap {
    fn sample(&self, direction: DVec3) -> Color {
        // Direction to equirectangular coordinates
        let theta = direction.y.clamp(-1.0, 1.0).acos();
        let mut phi = direction.z.atan2(direction.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        let u = phi / (2.0 * PI);
        let v = theta / PI;

        // Bilinear interpolation
        let x = u * f64::from(self.width - 1);
        let y = v * f64::from(self.height - 1);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let top = self.get_pixel(x0, y0) * (1.0 - fx) + self.get_pixel(x1, y0) * fx;
        let bottom = self.get_pixel(x0, y1) * (1.0 - fx) + self.get_pixel(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}
