//! GPU device + offscreen canvas.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a window
//! - owning the offscreen canvas texture and reading it back
//! - implementing [`GraphicsContext`](crate::gl::GraphicsContext) on top of wgpu

mod canvas;
mod context;
mod gpu;
mod pipeline;

pub use canvas::{Canvas, CANVAS_FORMAT};
pub use context::WgpuContext;
pub use gpu::{Gpu, GpuInit};
