use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, ScalarKind, ShaderStage, Type, TypeInner};

use crate::gl::{StageKind, UniformShape};

/// Scalar kind of a stage input/output.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IoKind {
    Float,
    Sint,
    Uint,
}

/// Type of a `@location` stage input/output: kind plus component count.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct IoType {
    pub kind: IoKind,
    pub components: u32,
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scalar = match self.kind {
            IoKind::Float => "f32",
            IoKind::Sint => "i32",
            IoKind::Uint => "u32",
        };
        if self.components == 1 {
            f.write_str(scalar)
        } else {
            write!(f, "vec{}<{}>", self.components, scalar)
        }
    }
}

/// A `@location(n)` input or output of an entry point.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StageVar {
    pub name: String,
    pub location: u32,
    pub ty: IoType,
}

/// A texture or sampler binding.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceSlot {
    pub name: String,
    pub group: u32,
    pub binding: u32,
}

/// An active `var<uniform>`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UniformInfo {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub shape: UniformShape,
}

/// Everything the rest of the pipeline needs to know about one stage.
///
/// Only globals the entry point actually uses are listed.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StageInterface {
    pub inputs: Vec<StageVar>,
    pub outputs: Vec<StageVar>,
    pub uniforms: Vec<UniformInfo>,
    pub textures: Vec<ResourceSlot>,
    pub samplers: Vec<ResourceSlot>,
}

/// A successfully compiled stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: StageKind,
    pub source: String,
    pub entry_point: String,
    pub interface: StageInterface,
}

/// Parses, validates and reflects one WGSL stage.
///
/// On failure the error is the compiler log.
pub fn compile_stage(stage: StageKind, source: &str) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    let info = validator
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let wanted = match stage {
        StageKind::Vertex => ShaderStage::Vertex,
        StageKind::Fragment => ShaderStage::Fragment,
    };
    let (index, entry) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.stage == wanted)
        .ok_or_else(|| format!("error: no @{stage} entry point found"))?;

    let mut errors = Vec::new();
    let mut interface = StageInterface::default();

    for arg in &entry.function.arguments {
        collect_io(
            &module,
            arg.ty,
            arg.binding.as_ref(),
            arg.name.as_deref(),
            &mut interface.inputs,
            &mut errors,
        );
    }
    if let Some(result) = &entry.function.result {
        collect_io(
            &module,
            result.ty,
            result.binding.as_ref(),
            None,
            &mut interface.outputs,
            &mut errors,
        );
    }

    let usage = info.get_entry_point(index);
    for (handle, var) in module.global_variables.iter() {
        if usage[handle].is_empty() {
            continue;
        }
        let name = var.name.clone().unwrap_or_default();
        let is_resource = matches!(var.space, AddressSpace::Uniform | AddressSpace::Handle);
        let Some(rb) = var.binding.as_ref().filter(|_| is_resource) else {
            if let AddressSpace::Storage { .. } = var.space {
                errors.push(format!("error: storage buffer `{name}` is not supported"));
            }
            continue;
        };

        let inner = &module.types[var.ty].inner;
        match var.space {
            AddressSpace::Uniform => match uniform_shape(inner) {
                Some(shape) => interface.uniforms.push(UniformInfo {
                    name,
                    group: rb.group,
                    binding: rb.binding,
                    shape,
                }),
                None => errors.push(format!(
                    "error: uniform `{name}` has an unsupported type; expected f32, vecN<f32> or matNxN<f32>"
                )),
            },
            _ => {
                let slot = ResourceSlot { name, group: rb.group, binding: rb.binding };
                match inner {
                    TypeInner::Image {
                        dim: naga::ImageDimension::D2,
                        arrayed: false,
                        class: naga::ImageClass::Sampled { kind: ScalarKind::Float, multi: false },
                        ..
                    } => interface.textures.push(slot),
                    TypeInner::Sampler { comparison: false } => interface.samplers.push(slot),
                    _ => errors.push(format!(
                        "error: resource `{}` must be a texture_2d<f32> or a sampler",
                        slot.name
                    )),
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        entry_point: entry.name.clone(),
        interface,
    })
}

fn collect_io(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    name: Option<&str>,
    out: &mut Vec<StageVar>,
    errors: &mut Vec<String>,
) {
    let inner = &module.types[ty].inner;
    match binding {
        Some(Binding::Location { location, .. }) => match io_type(inner) {
            Some(io) => out.push(StageVar {
                name: name.unwrap_or_default().to_string(),
                location: *location,
                ty: io,
            }),
            None => errors.push(format!(
                "error: `{}` at @location({location}) must be a scalar or vector",
                name.unwrap_or("<unnamed>")
            )),
        },
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = inner {
                for member in members {
                    collect_io(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        member.name.as_deref(),
                        out,
                        errors,
                    );
                }
            }
        }
    }
}

fn io_kind(kind: ScalarKind) -> Option<IoKind> {
    match kind {
        ScalarKind::Float => Some(IoKind::Float),
        ScalarKind::Sint => Some(IoKind::Sint),
        ScalarKind::Uint => Some(IoKind::Uint),
        _ => None,
    }
}

fn io_type(inner: &TypeInner) -> Option<IoType> {
    match *inner {
        TypeInner::Scalar(scalar) => Some(IoType { kind: io_kind(scalar.kind)?, components: 1 }),
        TypeInner::Vector { size, scalar } => Some(IoType {
            kind: io_kind(scalar.kind)?,
            components: size as u32,
        }),
        _ => None,
    }
}

fn uniform_shape(inner: &TypeInner) -> Option<UniformShape> {
    match *inner {
        TypeInner::Scalar(s) if s == naga::Scalar::F32 => Some(UniformShape::Float),
        TypeInner::Vector { size, scalar } if scalar == naga::Scalar::F32 => match size as u32 {
            2 => Some(UniformShape::Vec2),
            3 => Some(UniformShape::Vec3),
            _ => Some(UniformShape::Vec4),
        },
        TypeInner::Matrix { columns, rows, scalar }
            if scalar == naga::Scalar::F32 && columns as u32 == rows as u32 =>
        {
            match columns as u32 {
                2 => Some(UniformShape::Mat2),
                3 => Some(UniformShape::Mat3),
                _ => Some(UniformShape::Mat4),
            }
        }
        _ => None,
    }
}
