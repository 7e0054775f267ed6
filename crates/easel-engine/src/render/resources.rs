use crate::error::GpuResourceError;
use crate::gl::{BufferId, ComponentType, GraphicsContext, SamplerParams, TextureId};
use crate::loader::DecodedImage;

/// CPU-side vertex data, tagged with its component type.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexData {
    F32(Vec<f32>),
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
}

impl VertexData {
    pub fn component(&self) -> ComponentType {
        match self {
            VertexData::F32(_) => ComponentType::Float32,
            VertexData::U8(_) => ComponentType::Uint8,
            VertexData::I8(_) => ComponentType::Int8,
            VertexData::U16(_) => ComponentType::Uint16,
            VertexData::I16(_) => ComponentType::Int16,
        }
    }

    /// Number of scalar components.
    pub fn len(&self) -> usize {
        match self {
            VertexData::F32(v) => v.len(),
            VertexData::U8(v) => v.len(),
            VertexData::I8(v) => v.len(),
            VertexData::U16(v) => v.len(),
            VertexData::I16(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw little-endian bytes as uploaded.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexData::F32(v) => bytemuck::cast_slice(v),
            VertexData::U8(v) => v,
            VertexData::I8(v) => bytemuck::cast_slice(v),
            VertexData::U16(v) => bytemuck::cast_slice(v),
            VertexData::I16(v) => bytemuck::cast_slice(v),
        }
    }
}

impl From<Vec<f32>> for VertexData {
    fn from(v: Vec<f32>) -> Self {
        VertexData::F32(v)
    }
}

impl From<&[f32]> for VertexData {
    fn from(v: &[f32]) -> Self {
        VertexData::F32(v.to_vec())
    }
}

/// Handle of an uploaded vertex buffer plus the layout of its contents.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GpuBuffer {
    id: BufferId,
    component: ComponentType,
    len: usize,
}

impl GpuBuffer {
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn component(&self) -> ComponentType {
        self.component
    }

    /// Number of scalar components uploaded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Buffers and textures created for one draw.
///
/// Everything created here is deleted by [`FrameResources::release`]; nothing
/// is cached across draws.
#[derive(Debug, Default)]
pub struct FrameResources {
    buffers: Vec<BufferId>,
    textures: Vec<TextureId>,
}

impl FrameResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads an immutable snapshot of `data`.
    pub fn create_buffer<C: GraphicsContext>(
        &mut self,
        ctx: &mut C,
        data: &VertexData,
    ) -> Result<GpuBuffer, GpuResourceError> {
        if data.is_empty() {
            return Err(GpuResourceError::Empty { what: "buffer" });
        }
        let id = ctx.create_buffer(data.as_bytes())?;
        self.buffers.push(id);
        Ok(GpuBuffer {
            id,
            component: data.component(),
            len: data.len(),
        })
    }

    /// Uploads an RGBA8 image, edge clamped and nearest filtered.
    pub fn create_texture<C: GraphicsContext>(
        &mut self,
        ctx: &mut C,
        image: &DecodedImage,
    ) -> Result<TextureId, GpuResourceError> {
        let id = ctx.create_texture(image, SamplerParams::PIXEL_EXACT)?;
        self.textures.push(id);
        Ok(id)
    }

    /// Deletes every handle created so far.
    pub fn release<C: GraphicsContext>(&mut self, ctx: &mut C) {
        for id in self.buffers.drain(..) {
            ctx.delete_buffer(id);
        }
        for id in self.textures.drain(..) {
            ctx.delete_texture(id);
        }
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.textures.is_empty()
    }
}
