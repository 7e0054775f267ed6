//! Easel engine crate.
//!
//! Immediate-mode 2D rendering core: asynchronous resource loading, program
//! build, per-draw GPU resources and the binding protocol, sequenced by
//! [`render::Renderer`] over any [`gl::GraphicsContext`].

pub mod coords;
pub mod device;
pub mod error;
pub mod gl;
pub mod loader;
pub mod logging;
pub mod render;
pub mod shader;
