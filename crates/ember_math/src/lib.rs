// Re-export glam for convenience. Rendering runs in double precision,
// so DVec3 is the working vector type throughout the workspace.
pub use glam::*;

mod interval;
mod ray;

pub use interval::Interval;
pub use ray::Ray;
