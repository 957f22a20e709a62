//! Ember - progressive CPU path tracing
//!
//! A Monte Carlo path tracer that estimates per-pixel radiance by
//! recursively bouncing rays off diffuse, mirror and dielectric
//! surfaces, and refines a persistent pixel buffer over multiple
//! sample passes so intermediate results can be inspected or saved
//! while rendering continues.

mod camera;
mod environment;
mod material;
mod output;
mod radiance;
mod random;
mod renderer;
mod scene;
mod sphere;
mod stats;

pub use camera::Camera;
pub use environment::{Environment, EnvironmentError, EnvironmentMap};
pub use material::{Color, Material, ScatterKind, TextureId};
pub use output::{to_srgb8, PassSink, PixelView, PngSaver, ThrottledSink};
pub use radiance::{radiance, TraceContext, MAX_DEPTH, MIN_DEPTH};
pub use random::XorShift128;
pub use renderer::{RenderConfig, RenderConfigError, Renderer};
pub use scene::{Intersection, Scene, SphereScene};
pub use sphere::Sphere;
pub use stats::RenderStats;

/// Re-export the math types used across the public API.
pub use ember_math::{DVec3, Interval, Ray};
