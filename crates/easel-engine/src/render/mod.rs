//! Render core.
//!
//! This module is responsible for:
//! - building the program from two shader sources (`ProgramBuilder`)
//! - per-draw buffers and textures (`FrameResources`)
//! - the attribute/uniform binding protocol
//! - draw plans and the `Renderer` state machine that sequences them

mod binding;
mod draw;
mod program;
mod renderer;
mod resources;

pub use binding::{bind_attribute, bind_uniform, bind_uniform_tagged, BindingDescriptor};
pub use draw::{
    AttributeBinding, DrawCommand, DrawInput, DrawProducer, DrawStep, RenderPlan, UniformBinding,
    UniformInput, LETTER_F_POSITIONS,
};
pub use program::{Program, ProgramBuilder};
pub use renderer::{Failure, FrameReport, Renderer, RendererConfig, RendererState};
pub use resources::{FrameResources, GpuBuffer, VertexData};
