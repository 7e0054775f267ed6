use slotmap::SlotMap;

use super::link::{link, ProgramInterface};
use super::reflect::{compile_stage, CompiledStage};
use crate::error::BindingError;
use crate::gl::{ProgramId, ShaderId, StageKind, UniformLocation, UniformValue};

#[derive(Debug)]
struct ShaderObject {
    stage: StageKind,
    source: String,
    compiled: Option<CompiledStage>,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    vertex: Option<ShaderId>,
    fragment: Option<ShaderId>,
    linked: Option<LinkedProgram>,
    log: String,
}

/// A successfully linked program: both stages plus the current uniform values.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    pub interface: ProgramInterface,
    /// Indexed like `interface.uniforms`; `None` until first set.
    pub uniform_values: Vec<Option<UniformValue>>,
}

/// Shader and program objects with GL-style semantics.
///
/// Linking snapshots the attached stages, so shaders may be deleted right
/// after a successful link.
#[derive(Debug, Default)]
pub struct ObjectTable {
    shaders: SlotMap<ShaderId, ShaderObject>,
    programs: SlotMap<ProgramId, ProgramObject>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ── shaders ───────────────────────────────────────────────────────────

    pub fn create_shader(&mut self, stage: StageKind) -> ShaderId {
        self.shaders.insert(ShaderObject {
            stage,
            source: String::new(),
            compiled: None,
            log: String::new(),
        })
    }

    pub fn shader_source(&mut self, shader: ShaderId, source: &str) {
        if let Some(obj) = self.shaders.get_mut(shader) {
            obj.source = source.to_string();
        }
    }

    pub fn compile_shader(&mut self, shader: ShaderId) -> bool {
        let Some(obj) = self.shaders.get_mut(shader) else {
            return false;
        };
        match compile_stage(obj.stage, &obj.source) {
            Ok(stage) => {
                obj.compiled = Some(stage);
                obj.log.clear();
                true
            }
            Err(log) => {
                obj.compiled = None;
                obj.log = log;
                false
            }
        }
    }

    pub fn shader_info_log(&self, shader: ShaderId) -> String {
        self.shaders
            .get(shader)
            .map(|obj| obj.log.clone())
            .unwrap_or_default()
    }

    pub fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(shader);
    }

    #[inline]
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    // ── programs ──────────────────────────────────────────────────────────

    pub fn create_program(&mut self) -> ProgramId {
        self.programs.insert(ProgramObject::default())
    }

    pub fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        let Some(stage) = self.shaders.get(shader).map(|s| s.stage) else {
            return;
        };
        if let Some(obj) = self.programs.get_mut(program) {
            match stage {
                StageKind::Vertex => obj.vertex = Some(shader),
                StageKind::Fragment => obj.fragment = Some(shader),
            }
        }
    }

    pub fn link_program(&mut self, program: ProgramId) -> bool {
        let Some(obj) = self.programs.get(program) else {
            return false;
        };
        let result = self.link_stages(obj.vertex, obj.fragment);

        let Some(obj) = self.programs.get_mut(program) else {
            return false;
        };
        match result {
            Ok(linked) => {
                obj.linked = Some(linked);
                obj.log.clear();
                true
            }
            Err(log) => {
                obj.linked = None;
                obj.log = log;
                false
            }
        }
    }

    fn link_stages(
        &self,
        vertex: Option<ShaderId>,
        fragment: Option<ShaderId>,
    ) -> Result<LinkedProgram, String> {
        let compiled = |id: Option<ShaderId>, stage: StageKind| -> Result<CompiledStage, String> {
            let obj = id
                .and_then(|id| self.shaders.get(id))
                .ok_or_else(|| format!("error: no {stage} shader attached"))?;
            obj.compiled
                .clone()
                .ok_or_else(|| format!("error: attached {stage} shader is not compiled"))
        };
        let vertex = compiled(vertex, StageKind::Vertex)?;
        let fragment = compiled(fragment, StageKind::Fragment)?;
        let interface = link(&vertex, &fragment)?;
        let uniform_values = vec![None; interface.uniforms.len()];
        Ok(LinkedProgram { vertex, fragment, interface, uniform_values })
    }

    pub fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(program)
            .map(|obj| obj.log.clone())
            .unwrap_or_default()
    }

    pub fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(program);
    }

    #[inline]
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn linked(&self, program: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(program)?.linked.as_ref()
    }

    // ── interface queries ─────────────────────────────────────────────────

    pub fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.linked(program)?
            .interface
            .attribute(name)
            .map(|a| a.location)
    }

    pub fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let index = self.linked(program)?.interface.uniform_index(name)?;
        Some(UniformLocation { program, index })
    }

    /// Stores a uniform value after checking it against the declared shape.
    ///
    /// Stale locations are ignored.
    pub fn set_uniform(
        &mut self,
        location: UniformLocation,
        value: &UniformValue,
    ) -> Result<(), BindingError> {
        let Some(linked) = self
            .programs
            .get_mut(location.program)
            .and_then(|obj| obj.linked.as_mut())
        else {
            return Ok(());
        };
        let index = location.index as usize;
        let Some(info) = linked.interface.uniforms.get(index) else {
            return Ok(());
        };
        if info.shape != value.shape() {
            return Err(BindingError::ShapeMismatch {
                name: info.name.clone(),
                declared: info.shape,
                provided: value.shape(),
            });
        }
        linked.uniform_values[index] = Some(*value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::UniformShape;
    use crate::shader::testdata::*;

    fn build(table: &mut ObjectTable, vs: &str, fs: &str) -> (ProgramId, bool) {
        let v = table.create_shader(StageKind::Vertex);
        table.shader_source(v, vs);
        assert!(table.compile_shader(v));
        let f = table.create_shader(StageKind::Fragment);
        table.shader_source(f, fs);
        assert!(table.compile_shader(f));
        let p = table.create_program();
        table.attach_shader(p, v);
        table.attach_shader(p, f);
        let ok = table.link_program(p);
        table.delete_shader(v);
        table.delete_shader(f);
        (p, ok)
    }

    #[test]
    fn link_survives_shader_deletion() {
        let mut table = ObjectTable::new();
        let (p, ok) = build(&mut table, SHAPE_VS, SHAPE_FS);
        assert!(ok);
        assert_eq!(table.shader_count(), 0);
        assert_eq!(table.attrib_location(p, "a_alpha"), Some(1));
        assert!(table.uniform_location(p, "u_resolution").is_some());
        assert!(table.uniform_location(p, "u_missing").is_none());
    }

    #[test]
    fn compile_failure_keeps_log() {
        let mut table = ObjectTable::new();
        let f = table.create_shader(StageKind::Fragment);
        table.shader_source(f, BROKEN_FS);
        assert!(!table.compile_shader(f));
        assert!(!table.shader_info_log(f).is_empty());
    }

    #[test]
    fn link_without_fragment_stage_fails() {
        let mut table = ObjectTable::new();
        let v = table.create_shader(StageKind::Vertex);
        table.shader_source(v, SHAPE_VS);
        table.compile_shader(v);
        let p = table.create_program();
        table.attach_shader(p, v);
        assert!(!table.link_program(p));
        assert!(table.program_info_log(p).contains("no fragment shader"));
        assert!(table.linked(p).is_none());
    }

    #[test]
    fn uniform_shape_is_enforced() {
        let mut table = ObjectTable::new();
        let (p, _) = build(&mut table, SHAPE_VS, SHAPE_FS);
        let loc = table.uniform_location(p, "u_resolution").unwrap();

        let err = table.set_uniform(loc, &UniformValue::Float(1.0)).unwrap_err();
        assert!(matches!(
            err,
            BindingError::ShapeMismatch { declared: UniformShape::Vec2, provided: UniformShape::Float, .. }
        ));

        table.set_uniform(loc, &UniformValue::Vec2([800.0, 600.0])).unwrap();
        let linked = table.linked(p).unwrap();
        assert_eq!(linked.uniform_values[0], Some(UniformValue::Vec2([800.0, 600.0])));
    }

    #[test]
    fn deleted_program_ignores_uniforms() {
        let mut table = ObjectTable::new();
        let (p, _) = build(&mut table, SHAPE_VS, SHAPE_FS);
        let loc = table.uniform_location(p, "u_resolution").unwrap();
        table.delete_program(p);
        assert_eq!(table.program_count(), 0);
        assert!(table.set_uniform(loc, &UniformValue::Float(0.0)).is_ok());
    }
}
