//! Render-progress counters shared across row workers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated while rendering.
///
/// All operations are relaxed: the values feed progress reporting and
/// never steer control flow, so atomicity is all that is required.
#[derive(Debug, Default)]
pub struct RenderStats {
    // Estimator invocations requested by the driver
    primary_samples: AtomicU64,
    // Scene intersection queries, including recursive bounces
    intersection_tests: AtomicU64,
    // Paths ended by roulette on a surface with zero emission
    rays_absorbed: AtomicU64,
    // Rows finished in the current checkpoint
    rows_completed: AtomicU64,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn count_primary_sample(&self) {
        self.primary_samples.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn count_intersection_test(&self) {
        self.intersection_tests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn count_absorbed(&self) {
        self.rays_absorbed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_row(&self) {
        self.rows_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset_rows(&self) {
        self.rows_completed.store(0, Ordering::Relaxed);
    }

    pub fn primary_samples(&self) -> u64 {
        self.primary_samples.load(Ordering::Relaxed)
    }

    pub fn intersection_tests(&self) -> u64 {
        self.intersection_tests.load(Ordering::Relaxed)
    }

    pub fn rays_absorbed(&self) -> u64 {
        self.rays_absorbed.load(Ordering::Relaxed)
    }

    pub fn rows_completed(&self) -> u64 {
        self.rows_completed.load(Ordering::Relaxed)
    }

    /// Human-readable progress line.
    pub fn summary(&self) -> String {
        let samples = self.primary_samples();
        let absorbed = self.rays_absorbed();
        let mut line = format!(
            "{} primary samples, {} intersection tests, absorbed {}",
            samples,
            self.intersection_tests(),
            absorbed,
        );
        if samples != 0 {
            line.push_str(&format!(
                " ({:.1}%)",
                absorbed as f64 * 100.0 / samples as f64
            ));
        }
        line
    }
}
