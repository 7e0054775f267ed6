//! Draw-time pipeline assembly.
//!
//! A GL-style program fixes only the shaders; the vertex layout comes from the
//! attribute pointers in effect at draw time. Pipelines are therefore keyed
//! by program + per-slot vertex layout and built lazily.

use crate::gl::{AttribLayout, AttribSize, ComponentType, ProgramId};
use crate::shader::LinkedProgram;

use super::canvas::CANVAS_FORMAT;

/// Bytes of the zero buffer that feeds disabled attributes.
pub(crate) const ZERO_ELEMENT_SIZE: u64 = 16;

/// Required alignment of vertex strides and vertex buffer offsets.
const VERTEX_ALIGNMENT: u32 = 4;

/// Vertex buffer slot as seen by a pipeline.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub(crate) struct VertexSlot {
    pub location: u32,
    pub format: wgpu::VertexFormat,
    pub stride: u64,
    pub step_mode: wgpu::VertexStepMode,
}

impl VertexSlot {
    /// Slot reading the zero buffer once per instance.
    pub fn fallback(location: u32, components: u32) -> Self {
        Self {
            location,
            format: float_format(components),
            stride: ZERO_ELEMENT_SIZE,
            step_mode: wgpu::VertexStepMode::Instance,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(crate) struct PipelineKey {
    pub program: ProgramId,
    pub slots: Vec<VertexSlot>,
}

pub(crate) fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Maps a GL-style attribute layout onto a wgpu vertex format.
///
/// Integer components are only available normalized, in pairs or quads.
pub(crate) fn vertex_format(layout: &AttribLayout) -> Result<wgpu::VertexFormat, String> {
    use wgpu::VertexFormat as F;

    let size = layout.size;
    let format = match (layout.component, layout.normalized, size) {
        (ComponentType::Float32, false, s) => float_format(s.count()),
        (ComponentType::Uint8, true, AttribSize::Two) => F::Unorm8x2,
        (ComponentType::Uint8, true, AttribSize::Four) => F::Unorm8x4,
        (ComponentType::Int8, true, AttribSize::Two) => F::Snorm8x2,
        (ComponentType::Int8, true, AttribSize::Four) => F::Snorm8x4,
        (ComponentType::Uint16, true, AttribSize::Two) => F::Unorm16x2,
        (ComponentType::Uint16, true, AttribSize::Four) => F::Unorm16x4,
        (ComponentType::Int16, true, AttribSize::Two) => F::Snorm16x2,
        (ComponentType::Int16, true, AttribSize::Four) => F::Snorm16x4,
        (ComponentType::Float32, true, _) => {
            return Err("normalization does not apply to f32 components".into());
        }
        (component, normalized, size) => {
            return Err(format!(
                "{}{component}x{} has no vertex format",
                if normalized { "normalized " } else { "" },
                size.count()
            ));
        }
    };
    Ok(format)
}

/// Checks the alignment rules wgpu puts on strides and buffer offsets.
pub(crate) fn check_alignment(layout: &AttribLayout) -> Result<(), String> {
    let align = VERTEX_ALIGNMENT;
    if layout.effective_stride() % align != 0 {
        return Err(format!("stride {} is not a multiple of {align}", layout.effective_stride()));
    }
    if layout.offset % align != 0 {
        return Err(format!("offset {} is not a multiple of {align}", layout.offset));
    }
    Ok(())
}

/// Builds the pipeline for one program + vertex layout combination.
///
/// The bind group layouts are derived from the shaders.
pub(crate) fn build_pipeline(
    device: &wgpu::Device,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    linked: &LinkedProgram,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
        .slots
        .iter()
        .map(|slot| {
            [wgpu::VertexAttribute {
                format: slot.format,
                offset: 0,
                shader_location: slot.location,
            }]
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
        .slots
        .iter()
        .zip(&attributes)
        .map(|(slot, attrs)| wgpu::VertexBufferLayout {
            array_stride: slot.stride,
            step_mode: slot.step_mode,
            attributes: attrs,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("easel program pipeline"),
        layout: None,

        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some(linked.vertex.entry_point.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some(linked.fragment.entry_point.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: CANVAS_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
