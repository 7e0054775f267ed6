//! Draw commands and the plans that produce them.
//!
//! A [`RenderPlan`] names the program sources, the images to load and an
//! ordered list of [`DrawStep`] values. Each step turns into exactly one
//! [`DrawCommand`] when a frame is drawn; producing commands touches no GPU
//! state.

use std::fmt;
use std::sync::Arc;

use super::binding::BindingDescriptor;
use super::resources::VertexData;
use crate::coords::{Rect, Vec2, UNIT_QUAD_POSITIONS};
use crate::error::{BindingError, RenderError};
use crate::gl::{AttribSize, Primitive, UniformValue};
use crate::loader::{DecodedImage, ResourceRequest};

// ── commands ──────────────────────────────────────────────────────────────

/// One named attribute and the data uploaded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBinding {
    pub descriptor: BindingDescriptor,
    pub data: VertexData,
}

/// Value of a uniform binding, typed or in the classic suffix form.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformInput {
    Value(UniformValue),
    Tagged {
        suffix: String,
        values: Vec<f32>,
        transpose: bool,
    },
}

impl UniformInput {
    pub fn resolve(&self) -> Result<UniformValue, BindingError> {
        match self {
            UniformInput::Value(value) => Ok(*value),
            UniformInput::Tagged { suffix, values, transpose } => {
                UniformValue::parse(suffix, values, *transpose)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub input: UniformInput,
}

/// Everything one draw call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub primitive: Primitive,
    pub vertex_count: u32,
    pub attributes: Vec<AttributeBinding>,
    pub uniforms: Vec<UniformBinding>,
    /// Loaded image indices; entry `i` is bound to texture unit `i`.
    pub textures: Vec<usize>,
}

impl DrawCommand {
    pub fn triangles(vertex_count: u32) -> Self {
        Self {
            primitive: Primitive::Triangles,
            vertex_count,
            attributes: Vec::new(),
            uniforms: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub fn attribute(mut self, descriptor: BindingDescriptor, data: impl Into<VertexData>) -> Self {
        self.attributes.push(AttributeBinding { descriptor, data: data.into() });
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.uniforms.push(UniformBinding {
            name: name.into(),
            input: UniformInput::Value(value),
        });
        self
    }

    /// Adds a suffix-tagged uniform; the tag is checked when the frame is planned.
    pub fn uniform_tagged(
        mut self,
        name: impl Into<String>,
        suffix: impl Into<String>,
        values: Vec<f32>,
        transpose: bool,
    ) -> Self {
        self.uniforms.push(UniformBinding {
            name: name.into(),
            input: UniformInput::Tagged { suffix: suffix.into(), values, transpose },
        });
        self
    }

    pub fn texture(mut self, image: usize) -> Self {
        self.textures.push(image);
        self
    }
}

// ── steps ─────────────────────────────────────────────────────────────────

/// What a step can see while producing its command.
#[derive(Debug, Clone, Copy)]
pub struct DrawInput<'a> {
    /// Loaded images, in request order.
    pub images: &'a [DecodedImage],
    pub canvas_size: (u32, u32),
}

pub type DrawProducer = dyn Fn(&DrawInput<'_>) -> Result<DrawCommand, RenderError> + Send + Sync;

/// One entry of a plan's draw sequence.
#[derive(Clone)]
pub enum DrawStep {
    /// Raw `x, y` pairs, three vertices per triangle.
    Triangles { positions: Vec<f32> },
    /// A rectangle with a per-vertex alpha.
    Rect { rect: Rect, alpha: f32 },
    /// A loaded image at `origin`; `size` defaults to the image's own size.
    Image {
        image: usize,
        origin: Vec2,
        size: Option<Vec2>,
    },
    Custom(Arc<DrawProducer>),
}

impl fmt::Debug for DrawStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawStep::Triangles { positions } => f
                .debug_struct("Triangles")
                .field("vertices", &(positions.len() / 2))
                .finish(),
            DrawStep::Rect { rect, alpha } => f
                .debug_struct("Rect")
                .field("rect", rect)
                .field("alpha", alpha)
                .finish(),
            DrawStep::Image { image, origin, size } => f
                .debug_struct("Image")
                .field("image", image)
                .field("origin", origin)
                .field("size", size)
                .finish(),
            DrawStep::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl DrawStep {
    pub fn custom(
        producer: impl Fn(&DrawInput<'_>) -> Result<DrawCommand, RenderError> + Send + Sync + 'static,
    ) -> Self {
        DrawStep::Custom(Arc::new(producer))
    }

    /// Produces this step's command. Pure.
    pub fn produce(&self, input: &DrawInput<'_>) -> Result<DrawCommand, RenderError> {
        match self {
            DrawStep::Triangles { positions } => triangles(positions.clone()),
            DrawStep::Rect { rect, alpha } => {
                if !rect.is_finite() || !alpha.is_finite() {
                    return Err(RenderError::InvalidCommand(format!("non-finite rectangle {rect:?}")));
                }
                let positions = rect.normalized().triangle_positions();
                Ok(DrawCommand::triangles(6)
                    .attribute(BindingDescriptor::new("a_alpha").size(AttribSize::One), vec![*alpha; 6])
                    .attribute(BindingDescriptor::new("a_position"), positions.to_vec()))
            }
            DrawStep::Image { image, origin, size } => {
                let decoded = input.images.get(*image).ok_or(RenderError::MissingImage {
                    index: *image,
                    loaded: input.images.len(),
                })?;
                let size = size.unwrap_or(Vec2::new(decoded.width() as f32, decoded.height() as f32));
                let rect = Rect::from_origin_size(*origin, size);
                if !rect.is_finite() {
                    return Err(RenderError::InvalidCommand(format!("non-finite image rectangle {rect:?}")));
                }
                let rect = rect.normalized();
                log::debug!("image {image} at {rect:?}");

                let command = DrawCommand::triangles(6)
                    .attribute(BindingDescriptor::new("a_position"), rect.triangle_positions().to_vec())
                    .attribute(BindingDescriptor::new("a_texCoord"), UNIT_QUAD_POSITIONS.to_vec());
                // Every loaded image takes a unit, in request order.
                Ok((0..input.images.len()).fold(command, DrawCommand::texture))
            }
            DrawStep::Custom(producer) => producer(input),
        }
    }
}

fn triangles(positions: Vec<f32>) -> Result<DrawCommand, RenderError> {
    if positions.is_empty() || positions.len() % 6 != 0 {
        return Err(RenderError::InvalidCommand(format!(
            "{} position components do not form whole triangles",
            positions.len()
        )));
    }
    let vertex_count = (positions.len() / 2) as u32;
    Ok(DrawCommand::triangles(vertex_count).attribute(BindingDescriptor::new("a_position"), positions))
}

// ── plans ─────────────────────────────────────────────────────────────────

/// Letter "F" in canvas pixels: left column, top rung, middle rung.
pub const LETTER_F_POSITIONS: [f32; 36] = [
    0.0, 0.0, 30.0, 0.0, 0.0, 150.0, //
    0.0, 150.0, 30.0, 0.0, 30.0, 150.0, //
    30.0, 0.0, 100.0, 0.0, 30.0, 30.0, //
    30.0, 30.0, 100.0, 0.0, 100.0, 30.0, //
    30.0, 60.0, 67.0, 60.0, 30.0, 90.0, //
    30.0, 90.0, 67.0, 60.0, 67.0, 90.0, //
];

/// Program sources, images and draw sequence of one renderer.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// Image locators; loaded images keep this order.
    pub images: Vec<String>,
    pub steps: Vec<DrawStep>,
}

impl RenderPlan {
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            images: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn image(mut self, locator: impl Into<String>) -> Self {
        self.images.push(locator.into());
        self
    }

    pub fn step(mut self, step: DrawStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Flat shapes: the letter F, then a half transparent rectangle.
    pub fn shapes() -> Self {
        Self::new("/shader/triangle.vert", "/shader/triangle.frag")
            .step(DrawStep::Triangles { positions: LETTER_F_POSITIONS.to_vec() })
            .step(DrawStep::Rect {
                rect: Rect::new(200.0, 200.0, 100.0, 100.0),
                alpha: 0.5,
            })
    }

    /// Two images composed by the texture program.
    pub fn images() -> Self {
        Self::new("/shader/texture.vert", "/shader/texture.frag")
            .image("/img2.png")
            .image("/img1.png")
            .step(DrawStep::Image {
                image: 0,
                origin: Vec2::new(200.0, 200.0),
                size: None,
            })
            .step(DrawStep::Image {
                image: 1,
                origin: Vec2::new(0.0, 200.0),
                size: None,
            })
    }

    /// Every resource the plan needs: vertex source, fragment source, images.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        let mut requests = vec![
            ResourceRequest::text(&self.vertex_shader),
            ResourceRequest::text(&self.fragment_shader),
        ];
        requests.extend(self.images.iter().map(ResourceRequest::image));
        requests
    }
}
