//! Canvas/context contract.
//!
//! [`GraphicsContext`] is the command surface the render core drives: shader and
//! program objects, vertex buffers, textures, attribute arrays, uniforms,
//! viewport/clear and `draw_arrays`. Object handles are opaque keys owned by the
//! context; every call is issued from the thread that owns the context.
//!
//! Implementations:
//! - `device::WgpuContext`: real GPU, offscreen canvas
//! - `recording::RecordingContext` (tests): records calls, no GPU

mod context;
mod layout;
mod uniform;

#[cfg(test)]
pub(crate) mod recording;

pub use context::{
    BufferId, FilterMode, GraphicsContext, Primitive, ProgramId, SamplerParams, ShaderId,
    StageKind, TextureId, UniformLocation, WrapMode,
};
pub(crate) use context::check_image;
pub use layout::{AttribLayout, AttribSize, ComponentType};
pub use uniform::{UniformShape, UniformTag, UniformValue};
