use crate::error::BuildError;
use crate::gl::{GraphicsContext, ProgramId, ShaderId, StageKind};

/// A linked program.
///
/// Only [`ProgramBuilder::build`] produces one, and only after a successful
/// link. The owner releases it with [`Program::release`].
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    id: ProgramId,
}

impl Program {
    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn release<C: GraphicsContext>(self, ctx: &mut C) {
        ctx.delete_program(self.id);
    }
}

/// Compiles and links a vertex + fragment pair.
pub struct ProgramBuilder;

impl ProgramBuilder {
    /// Builds a program, cleaning up every intermediate object on failure.
    ///
    /// The vertex stage is compiled first. A failing stage is deleted along
    /// with any stage compiled before it, and no program object is created.
    pub fn build<C: GraphicsContext>(
        ctx: &mut C,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Program, BuildError> {
        let vs = compile(ctx, StageKind::Vertex, vertex_source)?;
        let fs = match compile(ctx, StageKind::Fragment, fragment_source) {
            Ok(fs) => fs,
            Err(e) => {
                ctx.delete_shader(vs);
                return Err(e);
            }
        };

        let program = match ctx.create_program() {
            Ok(program) => program,
            Err(e) => {
                ctx.delete_shader(vs);
                ctx.delete_shader(fs);
                return Err(e.into());
            }
        };
        ctx.attach_shader(program, vs);
        ctx.attach_shader(program, fs);
        let linked = ctx.link_program(program);

        // The program keeps what it needs from its stages.
        ctx.delete_shader(vs);
        ctx.delete_shader(fs);

        if !linked {
            let log = ctx.program_info_log(program);
            log::error!("program link failed:\n{log}");
            ctx.delete_program(program);
            return Err(BuildError::Link { log });
        }

        log::debug!("program linked");
        Ok(Program { id: program })
    }
}

fn compile<C: GraphicsContext>(
    ctx: &mut C,
    stage: StageKind,
    source: &str,
) -> Result<ShaderId, BuildError> {
    let shader = ctx.create_shader(stage)?;
    ctx.shader_source(shader, source);
    if ctx.compile_shader(shader) {
        return Ok(shader);
    }

    let log = ctx.shader_info_log(shader);
    log::error!("{stage} shader failed to compile:\n{log}");
    ctx.delete_shader(shader);
    Err(BuildError::Compile { stage, log })
}
