use std::collections::{BTreeMap, BTreeSet, HashMap};

use slotmap::{SecondaryMap, SlotMap};
use wgpu::util::DeviceExt;

use super::pipeline::{
    build_pipeline, check_alignment, vertex_format, PipelineKey, VertexSlot, ZERO_ELEMENT_SIZE,
};
use super::{Canvas, Gpu};
use crate::coords::{ColorRgba, Viewport};
use crate::error::{BindingError, GpuResourceError};
use crate::gl::{
    check_image, AttribLayout, BufferId, FilterMode, GraphicsContext, Primitive, ProgramId,
    SamplerParams, ShaderId, StageKind, TextureId, UniformLocation, UniformValue, WrapMode,
};
use crate::loader::DecodedImage;
use crate::shader::{IoKind, LinkedProgram, ObjectTable};

struct StageModules {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
}

struct VertexBuffer {
    buffer: wgpu::Buffer,
    len: u64,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

#[derive(Debug, Clone, Copy)]
struct Pointer {
    buffer: BufferId,
    layout: AttribLayout,
}

/// Where one pipeline slot reads from during a draw.
enum SlotSource {
    Buffer { id: BufferId, offset: u64 },
    Zero,
}

/// [`GraphicsContext`] on a real wgpu device, drawing into a [`Canvas`].
///
/// Every `clear` and `draw_arrays` records its own render pass and is
/// submitted immediately, so calls land on the canvas in program order.
pub struct WgpuContext {
    gpu: Gpu,
    canvas: Canvas,

    objects: ObjectTable,
    modules: SecondaryMap<ProgramId, StageModules>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    buffers: SlotMap<BufferId, VertexBuffer>,
    textures: SlotMap<TextureId, GpuTexture>,
    units: BTreeMap<u32, TextureId>,

    enabled: BTreeSet<u32>,
    pointers: BTreeMap<u32, Pointer>,
    current: Option<ProgramId>,
    viewport: Viewport,
    clear_color: ColorRgba,

    /// Feeds attributes whose array is disabled.
    zero_buffer: wgpu::Buffer,
    /// Bound on texture units that hold no texture.
    fallback_texture: GpuTexture,
}

impl WgpuContext {
    /// Creates a context with a `width` x `height` canvas.
    pub fn new(gpu: Gpu, width: u32, height: u32) -> Result<Self, GpuResourceError> {
        let canvas = Canvas::new(&gpu, width, height)?;

        let zero_buffer = gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("easel zero attribute"),
                contents: &[0; ZERO_ELEMENT_SIZE as usize],
                usage: wgpu::BufferUsages::VERTEX,
            });
        let fallback_texture = upload_texture(
            &gpu,
            &DecodedImage::from_rgba8(1, 1, vec![0; 4]),
            SamplerParams::PIXEL_EXACT,
        );

        Ok(Self {
            gpu,
            canvas,
            objects: ObjectTable::new(),
            modules: SecondaryMap::new(),
            pipelines: HashMap::new(),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            units: BTreeMap::new(),
            enabled: BTreeSet::new(),
            pointers: BTreeMap::new(),
            current: None,
            viewport: Viewport::full(width, height),
            clear_color: ColorRgba::transparent(),
            zero_buffer,
            fallback_texture,
        })
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Reads the canvas back as RGBA8, top row first.
    pub fn read_pixels(&self) -> Result<Vec<u8>, GpuResourceError> {
        self.canvas.read_pixels(&self.gpu)
    }

    /// Resolves the vertex slots of the current draw, validating every
    /// enabled attribute against its buffer.
    fn vertex_slots(
        &self,
        linked: &LinkedProgram,
        first: u32,
        count: u32,
    ) -> Result<Vec<(VertexSlot, SlotSource)>, GpuResourceError> {
        let limits = self.gpu.limits();
        let attributes = &linked.interface.attributes;
        if attributes.len() as u32 > limits.max_vertex_buffers {
            return Err(GpuResourceError::LimitExceeded {
                what: "vertex attribute count",
                requested: attributes.len() as u64,
                limit: limits.max_vertex_buffers as u64,
            });
        }

        let mut slots = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let location = attr.location;
            if attr.ty.kind != IoKind::Float {
                return Err(GpuResourceError::UnsupportedLayout {
                    location,
                    detail: format!("shader input is {}, only float inputs are supported", attr.ty),
                });
            }

            let pointer = self
                .enabled
                .contains(&location)
                .then(|| self.pointers.get(&location).copied())
                .flatten();
            let Some(pointer) = pointer else {
                slots.push((VertexSlot::fallback(location, attr.ty.components), SlotSource::Zero));
                continue;
            };

            let layout = pointer.layout;
            let unsupported = |detail: String| GpuResourceError::UnsupportedLayout { location, detail };
            let format = vertex_format(&layout).map_err(unsupported)?;
            check_alignment(&layout).map_err(unsupported)?;

            let stride = layout.effective_stride();
            if stride > limits.max_vertex_buffer_array_stride {
                return Err(GpuResourceError::LimitExceeded {
                    what: "vertex stride",
                    requested: stride as u64,
                    limit: limits.max_vertex_buffer_array_stride as u64,
                });
            }

            let buffer = self
                .buffers
                .get(pointer.buffer)
                .ok_or(GpuResourceError::BufferOverrun { location })?;
            if layout.required_bytes(first, count) > buffer.len {
                return Err(GpuResourceError::BufferOverrun { location });
            }

            slots.push((
                VertexSlot {
                    location,
                    format,
                    stride: stride as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                },
                SlotSource::Buffer { id: pointer.buffer, offset: layout.offset as u64 },
            ));
        }
        Ok(slots)
    }
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    }
}

fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// Uploads an already validated image.
fn upload_texture(gpu: &Gpu, image: &DecodedImage, sampling: SamplerParams) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: image.width(),
        height: image.height(),
        depth_or_array_layers: 1,
    };
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("easel image"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.pixels(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let wrap = address_mode(sampling.wrap);
    let sampler = gpu.device().create_sampler(&wgpu::SamplerDescriptor {
        label: Some("easel image sampler"),
        address_mode_u: wrap,
        address_mode_v: wrap,
        address_mode_w: wrap,
        mag_filter: filter_mode(sampling.mag_filter),
        min_filter: filter_mode(sampling.min_filter),
        ..Default::default()
    });

    GpuTexture { texture, view, sampler }
}

impl GraphicsContext for WgpuContext {
    fn canvas_size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&mut self, stage: StageKind) -> Result<ShaderId, GpuResourceError> {
        Ok(self.objects.create_shader(stage))
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.objects.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: ShaderId) -> bool {
        self.objects.compile_shader(shader)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.objects.shader_info_log(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.objects.delete_shader(shader);
    }

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self) -> Result<ProgramId, GpuResourceError> {
        Ok(self.objects.create_program())
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.objects.attach_shader(program, shader);
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        self.pipelines.retain(|key, _| key.program != program);
        self.modules.remove(program);

        if !self.objects.link_program(program) {
            return false;
        }
        let Some(linked) = self.objects.linked(program) else {
            return false;
        };

        // Both stages passed naga validation, so module creation cannot fail.
        let device = self.gpu.device();
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel vertex stage"),
            source: wgpu::ShaderSource::Wgsl(linked.vertex.source.as_str().into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel fragment stage"),
            source: wgpu::ShaderSource::Wgsl(linked.fragment.source.as_str().into()),
        });
        self.modules.insert(program, StageModules { vertex, fragment });
        true
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.objects.program_info_log(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.objects.delete_program(program);
        self.modules.remove(program);
        self.pipelines.retain(|key, _| key.program != program);
        if self.current == Some(program) {
            self.current = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current = program;
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.objects.attrib_location(program, name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.objects.uniform_location(program, name)
    }

    // ── buffers & textures ────────────────────────────────────────────────

    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferId, GpuResourceError> {
        if data.is_empty() {
            return Err(GpuResourceError::Empty { what: "buffer" });
        }
        let limit = self.gpu.limits().max_buffer_size;
        if data.len() as u64 > limit {
            return Err(GpuResourceError::LimitExceeded {
                what: "buffer size",
                requested: data.len() as u64,
                limit,
            });
        }

        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("easel vertex buffer"),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX,
            });
        Ok(self.buffers.insert(VertexBuffer { buffer, len: data.len() as u64 }))
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(vb) = self.buffers.remove(buffer) {
            vb.buffer.destroy();
        }
        self.pointers.retain(|_, p| p.buffer != buffer);
    }

    fn create_texture(
        &mut self,
        image: &DecodedImage,
        sampling: SamplerParams,
    ) -> Result<TextureId, GpuResourceError> {
        check_image(image)?;
        let limit = self.gpu.limits().max_texture_dimension_2d;
        let largest = image.width().max(image.height());
        if largest > limit {
            return Err(GpuResourceError::LimitExceeded {
                what: "texture dimension",
                requested: largest as u64,
                limit: limit as u64,
            });
        }
        let texture = upload_texture(&self.gpu, image, sampling);
        Ok(self.textures.insert(texture))
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
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
        if let Some(t) = self.textures.remove(texture) {
            t.texture.destroy();
        }
        self.units.retain(|_, bound| *bound != texture);
    }

    // ── bindings ──────────────────────────────────────────────────────────

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.enabled.insert(location);
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        self.enabled.remove(&location);
    }

    fn vertex_attrib_pointer(&mut self, location: u32, buffer: BufferId, layout: AttribLayout) {
        self.pointers.insert(location, Pointer { buffer, layout });
    }

    fn uniform(
        &mut self,
        location: UniformLocation,
        value: &UniformValue,
    ) -> Result<(), BindingError> {
        self.objects.set_uniform(location, value)
    }

    // ── frame ─────────────────────────────────────────────────────────────

    fn viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear_color(&mut self, color: ColorRgba) {
        self.clear_color = color;
    }

    fn clear(&mut self) -> Result<(), GpuResourceError> {
        let c = self.clear_color;
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("easel clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("easel clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.canvas.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: c.r as f64,
                            g: c.g as f64,
                            b: c.b as f64,
                            a: c.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.gpu.submit(encoder);
        Ok(())
    }

    fn draw_arrays(
        &mut self,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) -> Result<(), GpuResourceError> {
        let Primitive::Triangles = primitive;
        let program = self.current.ok_or(GpuResourceError::NoProgram)?;
        let linked = self
            .objects
            .linked(program)
            .ok_or(GpuResourceError::NoProgram)?;
        let modules = self.modules.get(program).ok_or(GpuResourceError::NoProgram)?;

        if count == 0 {
            return Ok(());
        }
        let (width, height) = self.canvas.size();
        let Some(viewport) = self.viewport.clamped_to(width, height) else {
            log::debug!("viewport {:?} is off the canvas; draw skipped", self.viewport);
            return Ok(());
        };

        let slots = self.vertex_slots(linked, first, count)?;
        let key = PipelineKey {
            program,
            slots: slots.iter().map(|(slot, _)| *slot).collect(),
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = build_pipeline(
                self.gpu.device(),
                &modules.vertex,
                &modules.fragment,
                linked,
                &key,
            );
            self.pipelines.insert(key.clone(), pipeline);
        }
        let Some(pipeline) = self.pipelines.get(&key) else {
            return Err(GpuResourceError::Device("pipeline cache miss".into()));
        };

        // Uniform values in the uniform address-space layout, zeroed when unset.
        let device = self.gpu.device();
        let iface = &linked.interface;
        let uniform_buffers: Vec<(u32, u32, wgpu::Buffer)> = iface
            .uniforms
            .iter()
            .zip(&linked.uniform_values)
            .map(|(info, value)| {
                let bytes = match value {
                    Some(v) => v.to_uniform_bytes(),
                    None => vec![0; info.shape.uniform_size() as usize],
                };
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("easel uniform"),
                    contents: &bytes,
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                (info.group, info.binding, buffer)
            })
            .collect();

        let unit_texture = |unit: usize| {
            self.units
                .get(&(unit as u32))
                .and_then(|id| self.textures.get(*id))
                .unwrap_or(&self.fallback_texture)
        };

        let mut groups: BTreeMap<u32, Vec<wgpu::BindGroupEntry<'_>>> = BTreeMap::new();
        for (group, binding, buffer) in &uniform_buffers {
            groups.entry(*group).or_default().push(wgpu::BindGroupEntry {
                binding: *binding,
                resource: buffer.as_entire_binding(),
            });
        }
        for (unit, slot) in iface.textures.iter().enumerate() {
            groups.entry(slot.group).or_default().push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: wgpu::BindingResource::TextureView(&unit_texture(unit).view),
            });
        }
        for (unit, slot) in iface.samplers.iter().enumerate() {
            groups.entry(slot.group).or_default().push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: wgpu::BindingResource::Sampler(&unit_texture(unit).sampler),
            });
        }

        let group_count = groups.keys().next_back().map_or(0, |g| g + 1);
        let bind_groups: Vec<wgpu::BindGroup> = (0..group_count)
            .map(|g| {
                let layout = pipeline.get_bind_group_layout(g);
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("easel draw bind group"),
                    layout: &layout,
                    entries: groups.get(&g).map_or(&[][..], |e| e.as_slice()),
                })
            })
            .collect();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("easel draw encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("easel draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.canvas.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipeline);
            // Viewport y counts from the bottom edge; wgpu counts from the top.
            rpass.set_viewport(
                viewport.x as f32,
                (height - viewport.y - viewport.height) as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            for (index, group) in bind_groups.iter().enumerate() {
                rpass.set_bind_group(index as u32, group, &[]);
            }
            for (index, (_, source)) in slots.iter().enumerate() {
                let slice = match source {
                    SlotSource::Buffer { id, offset } => match self.buffers.get(*id) {
                        Some(vb) => vb.buffer.slice(*offset..),
                        None => {
                            let location = key.slots[index].location;
                            return Err(GpuResourceError::BufferOverrun { location });
                        }
                    },
                    SlotSource::Zero => self.zero_buffer.slice(..),
                };
                rpass.set_vertex_buffer(index as u32, slice);
            }
            rpass.draw(first..first + count, 0..1);
        }
        self.gpu.submit(encoder);

        log::debug!("draw_arrays({first}, {count}) with {} vertex slots", slots.len());
        Ok(())
    }
}
