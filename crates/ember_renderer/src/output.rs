//! Pass-completion sinks and LDR conversion.
//!
//! After every completed sample pass the driver hands the pixel buffer
//! to a sink. Sinks run synchronously on the driver thread: the next
//! checkpoint does not start until the sink returns.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::material::Color;

// Display gamma applied when quantizing to 8-bit output.
const DISPLAY_GAMMA: f64 = 2.2;

/// Read-only view of the pixel buffer handed to sinks.
///
/// Row 0 is the topmost screen row.
#[derive(Clone, Copy)]
pub struct PixelView<'a> {
    pub pixels: &'a [Color],
    pub width: u32,
    pub height: u32,
}

/// Receives the pixel buffer after each completed sample pass.
pub trait PassSink: Send {
    /// Called once per checkpoint with the cumulative per-pixel sample
    /// count reached so far.
    fn on_pass_complete(&mut self, samples: u32, frame: PixelView<'_>);
}

/// Quantize a linear radiance channel to an 8-bit display value.
pub fn to_srgb8(value: f64) -> u8 {
    (value.clamp(0.0, 1.0).powf(1.0 / DISPLAY_GAMMA) * 255.0 + 0.5) as u8
}

/// Saves the buffer as `<prefix>_<samples>.png` after each pass.
pub struct PngSaver {
    prefix: PathBuf,
}

impl PngSaver {
    /// Create a saver writing next to `prefix`, e.g. a prefix of
    /// `out/render` produces `out/render_00016.png`.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn rgb_bytes(frame: &PixelView<'_>) -> Vec<u8> {
        frame
            .pixels
            .iter()
            .flat_map(|c| [to_srgb8(c.x), to_srgb8(c.y), to_srgb8(c.z)])
            .collect()
    }
}

impl PassSink for PngSaver {
    fn on_pass_complete(&mut self, samples: u32, frame: PixelView<'_>) {
        let path = PathBuf::from(format!("{}_{:05}.png", self.prefix.display(), samples));
        let bytes = Self::rgb_bytes(&frame);

        match image::save_buffer(
            &path,
            &bytes,
            frame.width,
            frame.height,
            image::ColorType::Rgb8,
        ) {
            Ok(()) => log::info!("Saved {} at {} samples", path.display(), samples),
            Err(why) => log::error!("Failed to save {}: {}", path.display(), why),
        }
    }
}

/// Gates an inner sink to at most one delivery per `interval`.
///
/// The first pass always goes through; later passes are dropped until
/// the interval has elapsed since the last delivery.
pub struct ThrottledSink<S> {
    inner: S,
    interval: Duration,
    last_delivery: Option<Instant>,
}

impl<S: PassSink> ThrottledSink<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_delivery: None,
        }
    }

    /// Access the wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PassSink> PassSink for ThrottledSink<S> {
    fn on_pass_complete(&mut self, samples: u32, frame: PixelView<'_>) {
        let due = self
            .last_delivery
            .map_or(true, |last| last.elapsed() >= self.interval);
        if !due {
            return;
        }
        self.last_delivery = Some(Instant::now());
        self.inner.on_pass_complete(samples, frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink {
        delivered: Vec<u32>,
    }

    impl PassSink for CountingSink {
        fn on_pass_complete(&mut self, samples: u32, _frame: PixelView<'_>) {
            self.delivered.push(samples);
        }
    }

    fn frame(pixels: &[Color]) -> PixelView<'_> {
        PixelView {
            pixels,
            width: pixels.len() as u32,
            height: 1,
        }
    }

    #[test]
    fn test_to_srgb8_endpoints() {
        assert_eq!(to_srgb8(0.0), 0);
        assert_eq!(to_srgb8(1.0), 255);
        // Values above 1 clamp instead of wrapping
        assert_eq!(to_srgb8(37.5), 255);
        assert_eq!(to_srgb8(-1.0), 0);
    }

    #[test]
    fn test_to_srgb8_brightens_midtones() {
        // Gamma encoding lifts linear midtones
        let mid = to_srgb8(0.5);
        assert!(mid > 128);
        assert!(mid < 255);
    }

    #[test]
    fn test_throttle_zero_interval_passes_everything() {
        let pixels = [Color::ZERO; 2];
        let mut sink = ThrottledSink::new(
            CountingSink {
                delivered: Vec::new(),
            },
            Duration::ZERO,
        );

        for samples in [1, 2, 3] {
            sink.on_pass_complete(samples, frame(&pixels));
        }
        assert_eq!(sink.inner().delivered, vec![1, 2, 3]);
    }

    #[test]
    fn test_throttle_drops_rapid_passes() {
        let pixels = [Color::ZERO; 2];
        let mut sink = ThrottledSink::new(
            CountingSink {
                delivered: Vec::new(),
            },
            Duration::from_secs(3600),
        );

        for samples in [1, 2, 3] {
            sink.on_pass_complete(samples, frame(&pixels));
        }
        // Only the first delivery fits inside an hour
        assert_eq!(sink.inner().delivered, vec![1]);
    }
}
