//! Renderer state machine.
//!
//! `Constructed -> Loading -> Ready -> Frame`, with `Failed` terminal. Every
//! fatal error moves the renderer to `Failed` and releases what it owns.

use crate::coords::{ColorRgba, Viewport};
use crate::error::{FailureStage, RenderError};
use crate::gl::{GraphicsContext, UniformValue};
use crate::loader::{DecodedImage, ResourceLoader, ResourceSet, Transport};

use super::binding::{bind_attribute, bind_uniform};
use super::draw::{DrawCommand, DrawInput, RenderPlan};
use super::program::{Program, ProgramBuilder};
use super::resources::FrameResources;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RendererState {
    Constructed,
    Loading,
    Ready,
    Frame,
    Failed,
}

/// Frame-global settings.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub clear_color: ColorRgba,
    /// Uniform receiving the canvas size before the first draw, if any.
    pub resolution_uniform: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: ColorRgba::from_rgba8(0, 0, 0, 255),
            resolution_uniform: Some("u_resolution".to_string()),
        }
    }
}

/// What one successful `draw_frame` submitted.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameReport {
    pub draws: usize,
    pub vertices: u64,
}

impl FrameReport {
    fn record(&mut self, vertex_count: u32) {
        self.draws += 1;
        self.vertices += u64::from(vertex_count);
    }
}

/// Record of the error that moved the renderer to `Failed`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Failure {
    pub stage: FailureStage,
    pub message: String,
}

impl Failure {
    fn of(error: &RenderError) -> Self {
        Self { stage: error.stage(), message: error.to_string() }
    }
}

/// A command with its uniforms resolved, ready for submission.
struct PlannedDraw {
    command: DrawCommand,
    uniforms: Vec<(String, UniformValue)>,
}

pub struct Renderer<C: GraphicsContext> {
    ctx: C,
    config: RendererConfig,
    plan: RenderPlan,
    state: RendererState,

    resources: Option<ResourceSet>,
    images: Vec<DecodedImage>,
    program: Option<Program>,
    frame: FrameResources,
    last_error: Option<Failure>,
}

impl<C: GraphicsContext> Renderer<C> {
    pub fn new(ctx: C, config: RendererConfig, plan: RenderPlan) -> Self {
        Self {
            ctx,
            config,
            plan,
            state: RendererState::Constructed,
            resources: None,
            images: Vec::new(),
            program: None,
            frame: FrameResources::new(),
            last_error: None,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn state(&self) -> RendererState {
        self.state
    }

    #[inline]
    pub fn context(&self) -> &C {
        &self.ctx
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// Loaded resources; `None` until loading completed.
    #[inline]
    pub fn resources(&self) -> Option<&ResourceSet> {
        self.resources.as_ref()
    }

    #[inline]
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    #[inline]
    pub fn last_error(&self) -> Option<&Failure> {
        self.last_error.as_ref()
    }

    #[inline]
    pub fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    /// Releases the program and hands the context back.
    pub fn into_context(mut self) -> C {
        self.release_all();
        self.ctx
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Loads every resource of the plan and builds its program.
    pub async fn initialize<T: Transport>(
        &mut self,
        loader: &ResourceLoader<T>,
    ) -> Result<(), RenderError> {
        self.expect_state("initialize", &[RendererState::Constructed])?;
        self.state = RendererState::Loading;

        let requests = self.plan.requests();
        log::debug!("loading {} resources", requests.len());
        let set = match loader.load_all(&requests).await {
            Ok(set) => set,
            Err(e) => return Err(self.fail(e.into())),
        };

        let built = match (
            set.text(&self.plan.vertex_shader),
            set.text(&self.plan.fragment_shader),
        ) {
            (Some(vs), Some(fs)) => {
                ProgramBuilder::build(&mut self.ctx, vs, fs).map_err(RenderError::from)
            }
            _ => Err(RenderError::InvalidCommand(
                "shader sources missing from the loaded set".into(),
            )),
        };
        self.images = set.images().cloned().collect();
        self.resources = Some(set);

        match built {
            Ok(program) => {
                self.program = Some(program);
                self.state = RendererState::Ready;
                log::info!("renderer ready ({} images)", self.images.len());
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Draws the plan's commands in order onto a freshly cleared canvas.
    pub fn draw_frame(&mut self) -> Result<FrameReport, RenderError> {
        self.expect_state("draw a frame", &[RendererState::Ready, RendererState::Frame])?;

        // Every command is produced and checked before the first GPU call.
        let planned = match self.plan_frame() {
            Ok(planned) => planned,
            Err(e) => return Err(self.fail(e)),
        };

        match self.submit_frame(&planned) {
            Ok(report) => {
                self.state = RendererState::Frame;
                log::debug!("frame: {} draws, {} vertices", report.draws, report.vertices);
                Ok(report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn plan_frame(&self) -> Result<Vec<PlannedDraw>, RenderError> {
        let input = DrawInput {
            images: &self.images,
            canvas_size: self.ctx.canvas_size(),
        };

        self.plan
            .steps
            .iter()
            .map(|step| -> Result<PlannedDraw, RenderError> {
                let command = step.produce(&input)?;
                if command.vertex_count == 0 {
                    return Err(RenderError::InvalidCommand("command draws no vertices".into()));
                }
                if let Some(&index) = command.textures.iter().find(|&&i| i >= self.images.len()) {
                    return Err(RenderError::MissingImage { index, loaded: self.images.len() });
                }
                let uniforms = command
                    .uniforms
                    .iter()
                    .map(|u| -> Result<(String, UniformValue), RenderError> {
                        Ok((u.name.clone(), u.input.resolve()?))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PlannedDraw { command, uniforms })
            })
            .collect()
    }

    fn submit_frame(&mut self, planned: &[PlannedDraw]) -> Result<FrameReport, RenderError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| RenderError::InvalidCommand("no program".into()))?;
        let ctx = &mut self.ctx;
        let (width, height) = ctx.canvas_size();

        ctx.use_program(Some(program.id()));
        ctx.viewport(Viewport::full(width, height));
        ctx.clear_color(self.config.clear_color);
        ctx.clear()?;
        if let Some(name) = &self.config.resolution_uniform {
            bind_uniform(ctx, program, name, &UniformValue::Vec2([width as f32, height as f32]))?;
        }

        let mut report = FrameReport::default();
        for draw in planned {
            submit(ctx, program, &mut self.frame, &self.images, draw)?;
            report.record(draw.command.vertex_count);
        }
        Ok(report)
    }

    // ── failure ───────────────────────────────────────────────────────────

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[RendererState],
    ) -> Result<(), RenderError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(RenderError::InvalidState { operation, state: self.state })
        }
    }

    fn fail(&mut self, error: RenderError) -> RenderError {
        log::error!("renderer failed: {error}");
        self.release_all();
        self.state = RendererState::Failed;
        self.last_error = Some(Failure::of(&error));
        error
    }

    fn release_all(&mut self) {
        self.frame.release(&mut self.ctx);
        if let Some(program) = self.program.take() {
            self.ctx.use_program(None);
            program.release(&mut self.ctx);
        }
    }
}

/// Uploads, binds and draws one command, then undoes its bindings.
fn submit<C: GraphicsContext>(
    ctx: &mut C,
    program: &Program,
    frame: &mut FrameResources,
    images: &[DecodedImage],
    draw: &PlannedDraw,
) -> Result<(), RenderError> {
    let mut enabled = Vec::new();
    let result = bind_and_draw(ctx, program, frame, images, draw, &mut enabled);

    for location in enabled {
        ctx.disable_vertex_attrib_array(location);
    }
    for unit in 0..draw.command.textures.len() {
        ctx.bind_texture(unit as u32, None);
    }
    frame.release(ctx);
    result
}

fn bind_and_draw<C: GraphicsContext>(
    ctx: &mut C,
    program: &Program,
    frame: &mut FrameResources,
    images: &[DecodedImage],
    draw: &PlannedDraw,
    enabled: &mut Vec<u32>,
) -> Result<(), RenderError> {
    let command = &draw.command;

    for (unit, &index) in command.textures.iter().enumerate() {
        let texture = frame.create_texture(ctx, &images[index])?;
        ctx.bind_texture(unit as u32, Some(texture));
    }
    for attribute in &command.attributes {
        let buffer = frame.create_buffer(ctx, &attribute.data)?;
        if let Some(location) = bind_attribute(ctx, program, &attribute.descriptor, &buffer) {
            enabled.push(location);
        }
    }
    for (name, value) in &draw.uniforms {
        bind_uniform(ctx, program, name, value)?;
    }

    ctx.draw_arrays(command.primitive, 0, command.vertex_count)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use crate::gl::recording::{Call, RecordingContext};
    use crate::gl::StageKind;
    use crate::loader::{encode_png, FetchResponse, MemoryTransport};
    use crate::render::binding::BindingDescriptor;
    use crate::render::draw::{DrawStep, LETTER_F_POSITIONS};
    use crate::shader::testdata::*;

    fn shape_loader(fragment: &str) -> ResourceLoader<MemoryTransport> {
        let mut transport = MemoryTransport::new();
        transport
            .insert("/shader/triangle.vert", SHAPE_VS)
            .insert("/shader/triangle.frag", fragment);
        ResourceLoader::new(transport)
    }

    fn image_loader() -> ResourceLoader<MemoryTransport> {
        let mut transport = MemoryTransport::new();
        transport
            .insert("/shader/texture.vert", TEXTURE_VS)
            .insert("/shader/texture.frag", TEXTURE_FS)
            .insert("/img2.png", encode_png(40, 30, [255, 0, 0, 255]))
            .insert("/img1.png", encode_png(20, 10, [0, 0, 255, 255]));
        ResourceLoader::new(transport)
    }

    fn ready(plan: RenderPlan, loader: &ResourceLoader<MemoryTransport>) -> Renderer<RecordingContext> {
        let mut renderer =
            Renderer::new(RecordingContext::new(800, 600), RendererConfig::default(), plan);
        pollster::block_on(renderer.initialize(loader)).unwrap();
        renderer
    }

    #[test]
    fn two_good_stages_reach_ready() {
        let renderer = ready(RenderPlan::shapes(), &shape_loader(SHAPE_FS));
        assert_eq!(renderer.state(), RendererState::Ready);
        assert!(renderer.program().is_some());
        assert_eq!(renderer.resources().map(ResourceSet::len), Some(2));
        assert!(renderer.last_error().is_none());
    }

    #[test]
    fn fragment_compile_failure_fails_without_drawing() {
        let mut renderer = Renderer::new(
            RecordingContext::new(800, 600),
            RendererConfig::default(),
            RenderPlan::shapes(),
        );
        let err = pollster::block_on(renderer.initialize(&shape_loader(BROKEN_FS))).unwrap_err();

        assert_eq!(err.stage(), FailureStage::Compile(StageKind::Fragment));
        assert_eq!(renderer.state(), RendererState::Failed);
        assert_eq!(
            renderer.last_error().map(|f| f.stage),
            Some(FailureStage::Compile(StageKind::Fragment))
        );

        let ctx = renderer.context();
        assert_eq!(ctx.count(|c| *c == Call::CompileShader { ok: false }), 1);
        assert_eq!(ctx.objects().shader_count(), 0);
        assert!(ctx.draws.is_empty());

        // Failed is terminal.
        assert!(matches!(renderer.draw_frame(), Err(RenderError::InvalidState { .. })));
        assert!(renderer.context().draws.is_empty());
    }

    #[test]
    fn missing_resource_fails_before_any_shader_work() {
        let mut transport = MemoryTransport::new();
        transport
            .insert("/shader/triangle.vert", SHAPE_VS)
            .insert_response("/shader/triangle.frag", FetchResponse::status(500));
        let loader = ResourceLoader::new(transport);

        let mut renderer = Renderer::new(
            RecordingContext::new(800, 600),
            RendererConfig::default(),
            RenderPlan::shapes(),
        );
        let err = pollster::block_on(renderer.initialize(&loader)).unwrap_err();
        assert_eq!(err.stage(), FailureStage::ResourceFetch);
        assert!(renderer.resources().is_none());
        assert!(renderer.context().calls.is_empty());
    }

    #[test]
    fn wrong_state_leaves_state_untouched() {
        let mut renderer = Renderer::new(
            RecordingContext::new(800, 600),
            RendererConfig::default(),
            RenderPlan::shapes(),
        );
        let err = renderer.draw_frame().unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidState { state: RendererState::Constructed, .. }
        ));
        assert_eq!(renderer.state(), RendererState::Constructed);
        assert!(renderer.last_error().is_none());

        let loader = shape_loader(SHAPE_FS);
        pollster::block_on(renderer.initialize(&loader)).unwrap();
        let again = pollster::block_on(renderer.initialize(&loader)).unwrap_err();
        assert_eq!(again.stage(), FailureStage::Lifecycle);
        assert_eq!(renderer.state(), RendererState::Ready);
    }

    #[test]
    fn shapes_frame_sets_up_then_draws_in_order() {
        let mut renderer = ready(RenderPlan::shapes(), &shape_loader(SHAPE_FS));
        let report = renderer.draw_frame().unwrap();
        assert_eq!(report, FrameReport { draws: 2, vertices: 24 });
        assert_eq!(renderer.state(), RendererState::Frame);

        let ctx = renderer.context();
        let first_draw = ctx
            .calls
            .iter()
            .position(|c| matches!(c, Call::DrawArrays { .. }))
            .unwrap();
        let setup = &ctx.calls[..first_draw];
        assert!(setup.contains(&Call::Viewport(Viewport::full(800, 600))));
        assert!(setup.contains(&Call::Clear));
        assert_eq!(ctx.last_clear_color(), Some(ColorRgba::from_rgba8(0, 0, 0, 255)));

        let [f, rect] = &ctx.draws[..] else { panic!("expected two draws") };
        assert_eq!(f.count, 18);
        assert_eq!(Some(f.program), renderer.program().map(Program::id));
        assert_eq!(f.viewport, Some(Viewport::full(800, 600)));
        assert_eq!(f.uniforms["u_resolution"], UniformValue::Vec2([800.0, 600.0]));
        assert_eq!(
            f.attributes["a_position"].floats()[0],
            vec![LETTER_F_POSITIONS[0], LETTER_F_POSITIONS[1]]
        );
        // The rectangle's alpha array is not left enabled for the letter.
        assert!(!f.attributes.contains_key("a_alpha"));
        assert_eq!(rect.attributes["a_alpha"].floats(), vec![vec![0.5]; 6]);
    }

    #[test]
    fn frame_report_counts_past_u32() {
        let mut report = FrameReport::default();
        report.record(u32::MAX);
        report.record(u32::MAX);
        assert_eq!(report, FrameReport { draws: 2, vertices: 2 * u64::from(u32::MAX) });
    }

    #[test]
    fn frames_release_everything_between_draws() {
        let mut renderer = ready(RenderPlan::shapes(), &shape_loader(SHAPE_FS));
        renderer.draw_frame().unwrap();
        renderer.draw_frame().unwrap();

        let ctx = renderer.context();
        assert_eq!(ctx.draws.len(), 4);
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.enabled_arrays(), 0);
        assert_eq!(ctx.count(|c| *c == Call::Clear), 2);
    }

    #[test]
    fn two_images_compose_on_consecutive_units() {
        let mut renderer = ready(RenderPlan::images(), &image_loader());
        assert_eq!(renderer.state(), RendererState::Ready);
        renderer.draw_frame().unwrap();

        let ctx = renderer.context();
        let first = &ctx.draws[0];
        assert_eq!(first.count, 6);
        assert_eq!(
            first.attributes["a_position"].floats().concat(),
            Rect::new(200.0, 200.0, 40.0, 30.0).triangle_positions().to_vec()
        );
        assert_eq!(first.textures, vec![(0, 40, 30), (1, 20, 10)]);

        let second = &ctx.draws[1];
        assert_eq!(
            second.attributes["a_position"].floats()[0],
            vec![0.0, 200.0]
        );
        assert_eq!(ctx.live_textures(), 0);
    }

    #[test]
    fn unsupported_uniform_tag_fails_before_any_draw() {
        let plan = RenderPlan::shapes().step(DrawStep::custom(|_| {
            Ok(DrawCommand::triangles(3)
                .attribute(BindingDescriptor::new("a_position"), vec![0.0f32; 6])
                .uniform_tagged("u_resolution", "2iv", vec![1.0, 2.0], false))
        }));
        let mut renderer = ready(plan, &shape_loader(SHAPE_FS));

        let err = renderer.draw_frame().unwrap_err();
        assert_eq!(err.stage(), FailureStage::Binding);
        assert_eq!(renderer.state(), RendererState::Failed);

        let ctx = renderer.context();
        assert!(ctx.draws.is_empty());
        assert_eq!(ctx.count(|c| *c == Call::Clear), 0);
        assert_eq!(ctx.objects().program_count(), 0);
    }

    #[test]
    fn gpu_failure_mid_frame_releases_resources() {
        let mut renderer = ready(RenderPlan::images(), &image_loader());
        renderer.context_mut().fail_textures = true;

        let err = renderer.draw_frame().unwrap_err();
        assert_eq!(err.stage(), FailureStage::GpuResource);
        assert_eq!(renderer.state(), RendererState::Failed);

        let ctx = renderer.context();
        assert!(ctx.draws.is_empty());
        assert_eq!((ctx.live_buffers(), ctx.live_textures()), (0, 0));
        assert_eq!(ctx.enabled_arrays(), 0);
    }

    #[test]
    fn into_context_releases_the_program() {
        let renderer = ready(RenderPlan::shapes(), &shape_loader(SHAPE_FS));
        let ctx = renderer.into_context();
        assert_eq!(ctx.objects().program_count(), 0);
        assert_eq!(ctx.current_program(), None);
    }
}
