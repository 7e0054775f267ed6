//! GPU-free [`GraphicsContext`] for the test-suite.
//!
//! Shader and program objects go through the real [`ObjectTable`], so WGSL is
//! compiled and linked exactly as on the device. Everything else is recorded:
//! a flat call log plus one [`DrawRecord`] per `draw_arrays`, holding the
//! vertex data each enabled attribute actually read.

use std::collections::{BTreeMap, BTreeSet};

use slotmap::SlotMap;

use super::context::check_image;
use super::*;
use crate::coords::{ColorRgba, Viewport};
use crate::error::{BindingError, GpuResourceError};
use crate::loader::DecodedImage;
use crate::shader::ObjectTable;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateShader(StageKind),
    CompileShader { ok: bool },
    DeleteShader,
    CreateProgram,
    LinkProgram { ok: bool },
    DeleteProgram,
    UseProgram(Option<ProgramId>),
    CreateBuffer { len: usize },
    DeleteBuffer,
    CreateTexture { width: u32, height: u32, sampling: SamplerParams },
    BindTexture { unit: u32, texture: Option<TextureId> },
    DeleteTexture,
    EnableArray(u32),
    DisableArray(u32),
    AttribPointer { location: u32, layout: AttribLayout },
    Uniform(UniformValue),
    Viewport(Viewport),
    ClearColor(ColorRgba),
    Clear,
    DrawArrays { first: u32, count: u32 },
}

/// Vertex data one attribute delivered to a draw, one element per vertex.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttribRecord {
    pub layout: AttribLayout,
    pub elements: Vec<Vec<u8>>,
}

impl AttribRecord {
    /// Elements decoded as `f32` components. Empty for integer layouts.
    pub fn floats(&self) -> Vec<Vec<f32>> {
        if self.layout.component != ComponentType::Float32 {
            return Vec::new();
        }
        self.elements
            .iter()
            .map(|e| {
                e.chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DrawRecord {
    pub program: ProgramId,
    pub count: u32,
    /// Enabled attributes the program declares, by attribute name.
    pub attributes: BTreeMap<String, AttribRecord>,
    /// Uniform values at draw time, by uniform name.
    pub uniforms: BTreeMap<String, UniformValue>,
    /// `(unit, width, height)` of every bound texture.
    pub textures: Vec<(u32, u32, u32)>,
    pub viewport: Option<Viewport>,
}

#[derive(Debug, Clone)]
struct TextureRecord {
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Copy)]
struct Pointer {
    buffer: BufferId,
    layout: AttribLayout,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingContext {
    width: u32,
    height: u32,
    objects: ObjectTable,
    buffers: SlotMap<BufferId, Vec<u8>>,
    textures: SlotMap<TextureId, TextureRecord>,
    units: BTreeMap<u32, TextureId>,
    enabled: BTreeSet<u32>,
    pointers: BTreeMap<u32, Pointer>,
    current: Option<ProgramId>,
    viewport: Option<Viewport>,
    clear_color: Option<ColorRgba>,

    pub calls: Vec<Call>,
    pub draws: Vec<DrawRecord>,

    /// Every object creation fails with `ContextLost`.
    pub lost: bool,
    pub fail_buffers: bool,
    pub fail_textures: bool,
}

impl RecordingContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, ..Self::default() }
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn enabled_arrays(&self) -> usize {
        self.enabled.len()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current
    }

    pub fn last_clear_color(&self) -> Option<ColorRgba> {
        self.clear_color
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    fn check_alive(&self) -> Result<(), GpuResourceError> {
        if self.lost {
            Err(GpuResourceError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn read_elements(
        &self,
        location: u32,
        pointer: Pointer,
        first: u32,
        count: u32,
    ) -> Result<Vec<Vec<u8>>, GpuResourceError> {
        let Some(data) = self.buffers.get(pointer.buffer) else {
            return Err(GpuResourceError::BufferOverrun { location });
        };
        let layout = pointer.layout;
        if layout.required_bytes(first, count) > data.len() as u64 {
            return Err(GpuResourceError::BufferOverrun { location });
        }
        let size = layout.element_size() as usize;
        let stride = layout.effective_stride() as usize;
        Ok((first..first + count)
            .map(|i| {
                let start = layout.offset as usize + i as usize * stride;
                data[start..start + size].to_vec()
            })
            .collect())
    }
}

impl GraphicsContext for RecordingContext {
    fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_shader(&mut self, stage: StageKind) -> Result<ShaderId, GpuResourceError> {
        self.check_alive()?;
        self.calls.push(Call::CreateShader(stage));
        Ok(self.objects.create_shader(stage))
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.objects.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: ShaderId) -> bool {
        let ok = self.objects.compile_shader(shader);
        self.calls.push(Call::CompileShader { ok });
        ok
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.objects.shader_info_log(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.calls.push(Call::DeleteShader);
        self.objects.delete_shader(shader);
    }

    fn create_program(&mut self) -> Result<ProgramId, GpuResourceError> {
        self.check_alive()?;
        self.calls.push(Call::CreateProgram);
        Ok(self.objects.create_program())
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.objects.attach_shader(program, shader);
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        let ok = self.objects.link_program(program);
        self.calls.push(Call::LinkProgram { ok });
        ok
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.objects.program_info_log(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.calls.push(Call::DeleteProgram);
        self.objects.delete_program(program);
        if self.current == Some(program) {
            self.current = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.calls.push(Call::UseProgram(program));
        self.current = program;
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.objects.attrib_location(program, name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.objects.uniform_location(program, name)
    }

    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferId, GpuResourceError> {
        self.check_alive()?;
        if self.fail_buffers {
            return Err(GpuResourceError::Device("buffer allocation failed".into()));
        }
        if data.is_empty() {
            return Err(GpuResourceError::Empty { what: "buffer" });
        }
        self.calls.push(Call::CreateBuffer { len: data.len() });
        Ok(self.buffers.insert(data.to_vec()))
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.calls.push(Call::DeleteBuffer);
        self.buffers.remove(buffer);
    }

    fn create_texture(
        &mut self,
        image: &DecodedImage,
        sampling: SamplerParams,
    ) -> Result<TextureId, GpuResourceError> {
        self.check_alive()?;
        if self.fail_textures {
            return Err(GpuResourceError::Device("texture allocation failed".into()));
        }
        check_image(image)?;
        self.calls.push(Call::CreateTexture {
            width: image.width(),
            height: image.height(),
            sampling,
        });
        Ok(self.textures.insert(TextureRecord {
            width: image.width(),
            height: image.height(),
        }))
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.calls.push(Call::BindTexture { unit, texture });
        match texture {
            Some(texture) => {
                self.units.insert(unit, texture);
            }
            None => {
                self.units.remove(&unit);
            }
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.calls.push(Call::DeleteTexture);
        self.textures.remove(texture);
        self.units.retain(|_, bound| *bound != texture);
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.calls.push(Call::EnableArray(location));
        self.enabled.insert(location);
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        self.calls.push(Call::DisableArray(location));
        self.enabled.remove(&location);
    }

    fn vertex_attrib_pointer(&mut self, location: u32, buffer: BufferId, layout: AttribLayout) {
        self.calls.push(Call::AttribPointer { location, layout });
        self.pointers.insert(location, Pointer { buffer, layout });
    }

    fn uniform(
        &mut self,
        location: UniformLocation,
        value: &UniformValue,
    ) -> Result<(), BindingError> {
        self.objects.set_uniform(location, value)?;
        self.calls.push(Call::Uniform(*value));
        Ok(())
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.calls.push(Call::Viewport(viewport));
        self.viewport = Some(viewport);
    }

    fn clear_color(&mut self, color: ColorRgba) {
        self.calls.push(Call::ClearColor(color));
        self.clear_color = Some(color);
    }

    fn clear(&mut self) -> Result<(), GpuResourceError> {
        self.check_alive()?;
        self.calls.push(Call::Clear);
        Ok(())
    }

    fn draw_arrays(
        &mut self,
        _primitive: Primitive,
        first: u32,
        count: u32,
    ) -> Result<(), GpuResourceError> {
        self.check_alive()?;
        let program = self.current.ok_or(GpuResourceError::NoProgram)?;
        let linked = self
            .objects
            .linked(program)
            .ok_or(GpuResourceError::NoProgram)?;

        let mut attributes = BTreeMap::new();
        for attr in &linked.interface.attributes {
            if !self.enabled.contains(&attr.location) {
                continue;
            }
            let Some(pointer) = self.pointers.get(&attr.location).copied() else {
                continue;
            };
            let elements = self.read_elements(attr.location, pointer, first, count)?;
            attributes.insert(
                attr.name.clone(),
                AttribRecord { layout: pointer.layout, elements },
            );
        }

        let uniforms = linked
            .interface
            .uniforms
            .iter()
            .zip(&linked.uniform_values)
            .filter_map(|(info, value)| value.map(|v| (info.name.clone(), v)))
            .collect();

        let textures = self
            .units
            .iter()
            .filter_map(|(unit, id)| self.textures.get(*id).map(|t| (*unit, t.width, t.height)))
            .collect();

        self.calls.push(Call::DrawArrays { first, count });
        self.draws.push(DrawRecord {
            program,
            count,
            attributes,
            uniforms,
            textures,
            viewport: self.viewport,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::testdata::*;

    fn linked_shape_program(ctx: &mut RecordingContext) -> ProgramId {
        let v = ctx.create_shader(StageKind::Vertex).unwrap();
        ctx.shader_source(v, SHAPE_VS);
        assert!(ctx.compile_shader(v));
        let f = ctx.create_shader(StageKind::Fragment).unwrap();
        ctx.shader_source(f, SHAPE_FS);
        assert!(ctx.compile_shader(f));
        let p = ctx.create_program().unwrap();
        ctx.attach_shader(p, v);
        ctx.attach_shader(p, f);
        assert!(ctx.link_program(p));
        p
    }

    #[test]
    fn draw_reads_strided_elements() {
        let mut ctx = RecordingContext::new(10, 10);
        let p = linked_shape_program(&mut ctx);
        ctx.use_program(Some(p));

        // Interleaved: [x, y, alpha] per vertex.
        let data: Vec<f32> = vec![0.0, 0.0, 0.5, 1.0, 0.0, 0.5, 0.0, 1.0, 0.5];
        let buffer = ctx.create_buffer(bytemuck::cast_slice(&data)).unwrap();
        let pos = ctx.attrib_location(p, "a_position").unwrap();
        ctx.enable_vertex_attrib_array(pos);
        ctx.vertex_attrib_pointer(pos, buffer, AttribLayout { stride: 12, ..AttribLayout::default() });
        ctx.draw_arrays(Primitive::Triangles, 0, 3).unwrap();

        let record = &ctx.draws[0];
        assert_eq!(
            record.attributes["a_position"].floats(),
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]
        );
        assert!(!record.attributes.contains_key("a_alpha"));
    }

    #[test]
    fn overrun_is_rejected() {
        let mut ctx = RecordingContext::new(10, 10);
        let p = linked_shape_program(&mut ctx);
        ctx.use_program(Some(p));
        let buffer = ctx.create_buffer(&[0; 16]).unwrap();
        ctx.enable_vertex_attrib_array(0);
        ctx.vertex_attrib_pointer(0, buffer, AttribLayout::default());
        let err = ctx.draw_arrays(Primitive::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GpuResourceError::BufferOverrun { location: 0 }));
        assert!(ctx.draws.is_empty());
    }

    #[test]
    fn draw_without_program_fails() {
        let mut ctx = RecordingContext::new(10, 10);
        assert!(matches!(
            ctx.draw_arrays(Primitive::Triangles, 0, 3),
            Err(GpuResourceError::NoProgram)
        ));
    }

    #[test]
    fn deleting_a_texture_unbinds_it() {
        let mut ctx = RecordingContext::new(10, 10);
        let image = DecodedImage::from_rgba8(1, 1, vec![0; 4]);
        let t = ctx.create_texture(&image, SamplerParams::PIXEL_EXACT).unwrap();
        ctx.bind_texture(0, Some(t));
        ctx.delete_texture(t);
        assert_eq!(ctx.live_textures(), 0);
        assert!(ctx.units.is_empty());
    }
}
