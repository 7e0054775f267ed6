use std::collections::BTreeMap;

use super::reflect::{CompiledStage, ResourceSlot, StageVar, UniformInfo};
use crate::gl::StageKind;

/// Interface of a linked program.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ProgramInterface {
    /// Vertex inputs; the attribute location is the `@location` index.
    pub attributes: Vec<StageVar>,
    /// Active uniforms of both stages. A uniform's index is its position here.
    pub uniforms: Vec<UniformInfo>,
    /// Textures sorted by `(group, binding)`; position = texture unit.
    pub textures: Vec<ResourceSlot>,
    /// Samplers sorted by `(group, binding)`.
    pub samplers: Vec<ResourceSlot>,
}

impl ProgramInterface {
    pub fn attribute(&self, name: &str) -> Option<&StageVar> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn uniform_index(&self, name: &str) -> Option<u32> {
        self.uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| i as u32)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SlotKind {
    Uniform,
    Texture,
    Sampler,
}

impl SlotKind {
    fn label(self) -> &'static str {
        match self {
            SlotKind::Uniform => "uniform",
            SlotKind::Texture => "texture",
            SlotKind::Sampler => "sampler",
        }
    }
}

/// Matches a vertex stage against a fragment stage.
///
/// On failure the error is the link log, one line per violation.
pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<ProgramInterface, String> {
    let mut errors = Vec::new();

    if vertex.stage != StageKind::Vertex {
        errors.push(format!("error: expected a vertex stage, got {}", vertex.stage));
    }
    if fragment.stage != StageKind::Fragment {
        errors.push(format!("error: expected a fragment stage, got {}", fragment.stage));
    }

    let vs = &vertex.interface;
    let fs = &fragment.interface;

    for input in &fs.inputs {
        match vs.outputs.iter().find(|o| o.location == input.location) {
            None => errors.push(format!(
                "error: fragment input `{}` at @location({}) is not written by the vertex stage",
                input.name, input.location
            )),
            Some(output) if output.ty != input.ty => errors.push(format!(
                "error: @location({}) is {} in the vertex stage but {} in the fragment stage",
                input.location, output.ty, input.ty
            )),
            Some(_) => {}
        }
    }

    // (group, binding) -> (name, kind) across both stages.
    let mut slots: BTreeMap<(u32, u32), (String, SlotKind)> = BTreeMap::new();
    let mut interface = ProgramInterface {
        attributes: vs.inputs.clone(),
        ..ProgramInterface::default()
    };

    for stage in [vs, fs] {
        let declared = stage
            .uniforms
            .iter()
            .map(|u| (u.group, u.binding, u.name.as_str(), SlotKind::Uniform))
            .chain(
                stage
                    .textures
                    .iter()
                    .map(|t| (t.group, t.binding, t.name.as_str(), SlotKind::Texture)),
            )
            .chain(
                stage
                    .samplers
                    .iter()
                    .map(|s| (s.group, s.binding, s.name.as_str(), SlotKind::Sampler)),
            );

        for (group, binding, name, kind) in declared {
            match slots.get(&(group, binding)) {
                Some((seen_name, seen_kind)) => {
                    if seen_name != name || *seen_kind != kind {
                        errors.push(format!(
                            "error: @group({group}) @binding({binding}) is {} `{seen_name}` in one stage and {} `{name}` in the other",
                            seen_kind.label(),
                            kind.label()
                        ));
                    }
                }
                None => {
                    slots.insert((group, binding), (name.to_string(), kind));
                }
            }
        }

        for uniform in &stage.uniforms {
            match interface.uniforms.iter().find(|u| u.name == uniform.name) {
                Some(seen) if seen.shape != uniform.shape
                    || (seen.group, seen.binding) != (uniform.group, uniform.binding) =>
                {
                    errors.push(format!(
                        "error: uniform `{}` is declared differently in the two stages",
                        uniform.name
                    ));
                }
                Some(_) => {}
                None => interface.uniforms.push(uniform.clone()),
            }
        }
        for texture in &stage.textures {
            if !interface.textures.contains(texture) {
                interface.textures.push(texture.clone());
            }
        }
        for sampler in &stage.samplers {
            if !interface.samplers.contains(sampler) {
                interface.samplers.push(sampler.clone());
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    interface.textures.sort_by_key(|t| (t.group, t.binding));
    interface.samplers.sort_by_key(|s| (s.group, s.binding));
    Ok(interface)
}
