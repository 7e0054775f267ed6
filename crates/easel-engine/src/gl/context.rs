use std::fmt;

use crate::coords::{ColorRgba, Viewport};
use crate::error::{BindingError, GpuResourceError};
use crate::loader::DecodedImage;

use super::{AttribLayout, UniformValue};

slotmap::new_key_type! {
    /// Shader object handle.
    pub struct ShaderId;
    /// Program object handle.
    pub struct ProgramId;
    /// Vertex buffer handle.
    pub struct BufferId;
    /// Texture handle.
    pub struct TextureId;
}

/// Which half of a program a shader object implements.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Uniform location inside one linked program.
///
/// Only produced by [`GraphicsContext::uniform_location`] for an active uniform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation {
    pub program: ProgramId,
    pub index: u32,
}

/// Primitive topology of a draw call.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Primitive {
    #[default]
    Triangles,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampling parameters fixed at texture creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SamplerParams {
    pub wrap: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl SamplerParams {
    /// Edge clamped, nearest neighbour in both directions, no mipmaps.
    pub const PIXEL_EXACT: SamplerParams = SamplerParams {
        wrap: WrapMode::ClampToEdge,
        min_filter: FilterMode::Nearest,
        mag_filter: FilterMode::Nearest,
    };
}

/// Checks an image before upload: non-empty and exactly `w * h * 4` bytes.
pub(crate) fn check_image(image: &DecodedImage) -> Result<(), GpuResourceError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(GpuResourceError::Empty { what: "texture" });
    }
    let expected = image.width() as usize * image.height() as usize * 4;
    if image.pixels().len() != expected {
        return Err(GpuResourceError::PixelData {
            width: image.width(),
            height: image.height(),
            expected,
            actual: image.pixels().len(),
        });
    }
    Ok(())
}

/// Command surface used by the render core.
///
/// The shape follows the classic immediate GL object model:
/// - object creation returns an opaque handle or a [`GpuResourceError`]
/// - compile/link report a status flag plus an info log
/// - name lookups return `None` for names the linked program does not use
/// - attribute layout is declared in one call (`vertex_attrib_pointer`)
///
/// Calls naming an unknown or deleted handle are ignored, like GL does with
/// stale names.
pub trait GraphicsContext {
    /// Canvas size in physical pixels.
    fn canvas_size(&self) -> (u32, u32);

    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&mut self, stage: StageKind) -> Result<ShaderId, GpuResourceError>;
    fn shader_source(&mut self, shader: ShaderId, source: &str);
    /// Compiles the shader; returns the compile status.
    fn compile_shader(&mut self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self) -> Result<ProgramId, GpuResourceError>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    /// Links the attached stages; returns the link status.
    fn link_program(&mut self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&mut self, program: ProgramId);
    fn use_program(&mut self, program: Option<ProgramId>);

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    // ── buffers & textures ────────────────────────────────────────────────

    /// Uploads `data` into a new vertex buffer (static usage).
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferId, GpuResourceError>;
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Uploads an RGBA8 image into a new 2D texture.
    fn create_texture(
        &mut self,
        image: &DecodedImage,
        sampling: SamplerParams,
    ) -> Result<TextureId, GpuResourceError>;
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);
    fn delete_texture(&mut self, texture: TextureId);

    // ── bindings ──────────────────────────────────────────────────────────

    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn disable_vertex_attrib_array(&mut self, location: u32);
    /// Points `location` at `buffer` with a complete layout. Replaces every
    /// field of the previous declaration.
    fn vertex_attrib_pointer(&mut self, location: u32, buffer: BufferId, layout: AttribLayout);
    fn uniform(&mut self, location: UniformLocation, value: &UniformValue)
        -> Result<(), BindingError>;

    // ── frame ─────────────────────────────────────────────────────────────

    fn viewport(&mut self, viewport: Viewport);
    fn clear_color(&mut self, color: ColorRgba);
    /// Clears the color buffer to the current clear color.
    fn clear(&mut self) -> Result<(), GpuResourceError>;
    fn draw_arrays(
        &mut self,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) -> Result<(), GpuResourceError>;
}
