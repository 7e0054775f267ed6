//! Attribute and uniform binding protocol.
//!
//! Names are resolved against the linked program on every bind. A name the
//! program does not use (misspelled, or optimized out) resolves to nothing and
//! the bind is skipped with a debug record; it never fails the draw.

use super::program::Program;
use super::resources::GpuBuffer;
use crate::error::BindingError;
use crate::gl::{AttribLayout, AttribSize, ComponentType, GraphicsContext, UniformValue};

/// How a buffer's bytes map onto one named vertex attribute.
///
/// Starts from `{ size: 2, f32, not normalized, stride 0, offset 0 }`; every
/// builder call overrides exactly one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    name: String,
    layout: AttribLayout,
}

impl BindingDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), layout: AttribLayout::default() }
    }

    pub fn size(mut self, size: AttribSize) -> Self {
        self.layout.size = size;
        self
    }

    pub fn component(mut self, component: ComponentType) -> Self {
        self.layout.component = component;
        self
    }

    pub fn normalized(mut self, normalized: bool) -> Self {
        self.layout.normalized = normalized;
        self
    }

    pub fn stride(mut self, stride: u32) -> Self {
        self.layout.stride = stride;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.layout.offset = offset;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn layout(&self) -> AttribLayout {
        self.layout
    }
}

/// Binds `buffer` to the attribute named by `descriptor`.
///
/// Enables the array and declares buffer + complete layout in one call.
/// Returns the attribute location, or `None` when the program has no such
/// attribute.
pub fn bind_attribute<C: GraphicsContext>(
    ctx: &mut C,
    program: &Program,
    descriptor: &BindingDescriptor,
    buffer: &GpuBuffer,
) -> Option<u32> {
    let Some(location) = ctx.attrib_location(program.id(), descriptor.name()) else {
        log::debug!("attribute `{}` is not used by the program; bind skipped", descriptor.name());
        return None;
    };
    if buffer.component() != descriptor.layout().component {
        log::debug!(
            "attribute `{}` reads {} from a {} buffer",
            descriptor.name(),
            descriptor.layout().component,
            buffer.component()
        );
    }
    ctx.enable_vertex_attrib_array(location);
    ctx.vertex_attrib_pointer(location, buffer.id(), descriptor.layout());
    Some(location)
}

/// Sets a uniform of the program in use.
///
/// Returns `Ok(false)` when the program has no active uniform of that name.
pub fn bind_uniform<C: GraphicsContext>(
    ctx: &mut C,
    program: &Program,
    name: &str,
    value: &UniformValue,
) -> Result<bool, BindingError> {
    let Some(location) = ctx.uniform_location(program.id(), name) else {
        log::debug!("uniform `{name}` is not used by the program; bind skipped");
        return Ok(false);
    };
    ctx.uniform(location, value)?;
    Ok(true)
}

/// Suffix-tagged form of [`bind_uniform`], e.g. `("u_resolution", "2fv", &[800.0, 600.0])`.
///
/// The tag and the value count are checked before anything is looked up.
pub fn bind_uniform_tagged<C: GraphicsContext>(
    ctx: &mut C,
    program: &Program,
    name: &str,
    suffix: &str,
    values: &[f32],
    transpose: bool,
) -> Result<bool, BindingError> {
    let value = UniformValue::parse(suffix, values, transpose)?;
    bind_uniform(ctx, program, name, &value)
}
