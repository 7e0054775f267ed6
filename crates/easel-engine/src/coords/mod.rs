//! Coordinate and geometry types shared by draw steps and the GPU backends.
//!
//! Canonical CPU space:
//! - Canvas pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Shaders convert to clip space using the resolution uniform.

mod color;
mod rect;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use rect::{Rect, UNIT_QUAD_POSITIONS};
pub use vec2::Vec2;
pub use viewport::Viewport;
