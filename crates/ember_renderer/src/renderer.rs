//! Progressive multi-pass render driver.
//!
//! Renders the image in checkpoints of increasing per-pixel sample
//! counts. Every checkpoint sweeps all rows in parallel, merges the new
//! estimates into the persistent pixel buffer as an exact running
//! average, and then notifies the configured sink, so a partially
//! converged image is always available.

use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;

use crate::camera::Camera;
use crate::environment::Environment;
use crate::material::Color;
use crate::output::{PassSink, PixelView};
use crate::radiance::{radiance, TraceContext};
use crate::random::XorShift128;
use crate::scene::Scene;
use crate::stats::RenderStats;

/// Sampling schedule configuration.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Samples per pixel rendered by the first checkpoint
    pub min_samples: u32,
    /// Samples per pixel reached by the final checkpoint
    pub max_samples: u32,
    /// Additional samples per checkpoint
    pub step_samples: u32,
    /// Side of the sub-pixel supersampling grid
    pub supersamples: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_samples: 4,
            max_samples: 64,
            step_samples: 4,
            supersamples: 2,
        }
    }
}

/// Rejected render configurations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderConfigError {
    #[error("image resolution must be non-zero, got {width}x{height}")]
    EmptyResolution { width: u32, height: u32 },

    #[error("supersamples must be positive")]
    ZeroSupersamples,

    #[error("min_samples must be positive")]
    ZeroMinSamples,

    #[error("min_samples {min} exceeds max_samples {max}")]
    ReversedSampleRange { min: u32, max: u32 },

    #[error("step_samples must be positive")]
    ZeroStepSamples,
}

impl RenderConfig {
    /// Check the schedule for nonsense values. Invalid configurations
    /// are rejected outright, never clamped.
    pub fn validate(&self) -> Result<(), RenderConfigError> {
        if self.supersamples == 0 {
            return Err(RenderConfigError::ZeroSupersamples);
        }
        if self.min_samples == 0 {
            return Err(RenderConfigError::ZeroMinSamples);
        }
        if self.min_samples > self.max_samples {
            return Err(RenderConfigError::ReversedSampleRange {
                min: self.min_samples,
                max: self.max_samples,
            });
        }
        if self.step_samples == 0 {
            return Err(RenderConfigError::ZeroStepSamples);
        }
        Ok(())
    }
}

/// Progressive path-tracing renderer.
///
/// Owns the persistent pixel buffer. Buffer row 0 corresponds to the
/// topmost screen row; the buffer always holds the true average of all
/// samples contributed so far, however the sample range was chunked
/// into checkpoints.
pub struct Renderer {
    camera: Camera,
    config: RenderConfig,
    environment: Option<Box<dyn Environment>>,
    sink: Option<Box<dyn PassSink>>,
    pixels: Vec<Color>,
    previous_samples: u32,
    stats: RenderStats,
}

impl Renderer {
    /// Create a renderer for `camera`'s resolution. The camera is
    /// initialized here; callers only configure it.
    pub fn new(mut camera: Camera, config: RenderConfig) -> Result<Self, RenderConfigError> {
        if camera.width == 0 || camera.height == 0 {
            return Err(RenderConfigError::EmptyResolution {
                width: camera.width,
                height: camera.height,
            });
        }
        config.validate()?;
        camera.initialize();

        let pixel_count = camera.width as usize * camera.height as usize;
        Ok(Self {
            camera,
            config,
            environment: None,
            sink: None,
            pixels: vec![Color::ZERO; pixel_count],
            previous_samples: 0,
            stats: RenderStats::new(),
        })
    }

    /// Light escaped rays with `environment` instead of black.
    pub fn with_environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Some(Box::new(environment));
        self
    }

    /// Deliver the buffer to `sink` after every completed checkpoint.
    pub fn with_sink(mut self, sink: impl PassSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// The persistent pixel buffer, row 0 on top.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Samples per pixel accumulated so far.
    pub fn current_samples(&self) -> u32 {
        self.previous_samples
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Human-readable state line for status displays.
    pub fn progress_summary(&self) -> String {
        format!(
            "(width, height) = ({}, {}); {} samples/pixel x ({}x{}); {}",
            self.camera.width,
            self.camera.height,
            self.previous_samples,
            self.config.supersamples,
            self.config.supersamples,
            self.stats.summary(),
        )
    }

    /// Render the configured sample schedule against `scene`.
    ///
    /// Checkpoints run sequentially; each one reuses the buffer state
    /// left by the previous one. The pass sink, if any, is invoked
    /// synchronously after every checkpoint.
    pub fn render(&mut self, scene: &dyn Scene) {
        self.previous_samples = 0;

        let mut samples = self.config.min_samples;
        while samples <= self.config.max_samples {
            let tests_before = self.stats.intersection_tests();
            let start = Instant::now();

            self.stats.reset_rows();
            self.render_checkpoint(scene, samples);
            self.previous_samples = samples;

            let elapsed = start.elapsed().as_secs_f64();
            let tests = self.stats.intersection_tests() - tests_before;
            log::info!(
                "samples = {}: checkpoint finished in {:.2} s ({:.0} intersection tests/s)",
                samples,
                elapsed,
                if elapsed > 0.0 { tests as f64 / elapsed } else { 0.0 },
            );

            if let Some(sink) = self.sink.as_mut() {
                sink.on_pass_complete(
                    samples,
                    PixelView {
                        pixels: &self.pixels,
                        width: self.camera.width,
                        height: self.camera.height,
                    },
                );
            }

            match samples.checked_add(self.config.step_samples) {
                Some(next) => samples = next,
                None => break,
            }
        }
    }

    // One checkpoint: every pixel gains the samples in
    // (previous_samples, next_samples], merged as a running average.
    fn render_checkpoint(&mut self, scene: &dyn Scene, next_samples: u32) {
        let width = self.camera.width as usize;
        let height = self.camera.height;
        let previous = self.previous_samples;
        let supersamples = self.config.supersamples;
        let camera = &self.camera;
        let stats = &self.stats;
        let ctx = TraceContext {
            scene,
            environment: self.environment.as_deref(),
            stats,
        };

        // buf = buf * (previous / next) + accumulated / (next * ss^2)
        let averaging = f64::from(next_samples) * f64::from(supersamples * supersamples);

        // Rows own disjoint buffer chunks and private generators, so the
        // sweep needs no locking.
        self.pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, out)| {
                // Buffer row 0 is the top of the screen; screen y counts
                // up from the bottom row.
                let y = height - 1 - row as u32;
                let mut rng =
                    XorShift128::new((y + 1).wrapping_add(previous.wrapping_mul(height)));

                for (x, pixel) in out.iter_mut().enumerate() {
                    let mut accumulated = Color::ZERO;

                    for sy in 0..supersamples {
                        for sx in 0..supersamples {
                            // Sub-pixel offset: cell s of N sits at (2s+1)/(2N)
                            let rx = f64::from(2 * sx + 1) / f64::from(2 * supersamples);
                            let ry = f64::from(2 * sy + 1) / f64::from(2 * supersamples);
                            let ray = camera.primary_ray(x as u32, y, rx, ry);

                            for _ in previous..next_samples {
                                stats.count_primary_sample();
                                accumulated += radiance(&ctx, &ray, &mut rng, 0);
                            }
                        }
                    }

                    *pixel = *pixel * (f64::from(previous) / f64::from(next_samples))
                        + accumulated / averaging;
                }

                stats.count_row();
                log::debug!(
                    "y = {}: {:.1}% of checkpoint finished",
                    y,
                    stats.rows_completed() as f64 * 100.0 / f64::from(height)
                );
            });
    }
}
