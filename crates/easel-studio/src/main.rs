//! Renders one frame of a built-in plan headlessly and writes it to a PNG.

mod cli;

use anyhow::{Context, Result};
use easel_engine::device::{Gpu, GpuInit, WgpuContext};
use easel_engine::loader::{FileTransport, ResourceLoader};
use easel_engine::logging::{init_logging, LoggingConfig};
use easel_engine::render::{Renderer, RendererConfig};

use cli::Options;

const CANVAS_WIDTH: u32 = 800;
const CANVAS_HEIGHT: u32 = 600;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let options = Options::parse(std::env::args().skip(1))?;
    log::info!("rendering {:?} from {}", options.plan, options.assets.display());

    let gpu = pollster::block_on(Gpu::new(GpuInit::default()))?;
    let ctx = WgpuContext::new(gpu, CANVAS_WIDTH, CANVAS_HEIGHT)
        .context("failed to create the canvas")?;

    let loader = ResourceLoader::new(FileTransport::new(&options.assets));
    let mut renderer = Renderer::new(ctx, RendererConfig::default(), options.plan.plan());
    pollster::block_on(renderer.initialize(&loader)).context("renderer initialization failed")?;

    let report = renderer.draw_frame().context("frame failed")?;
    log::info!("{} draws, {} vertices", report.draws, report.vertices);

    let pixels = renderer
        .context()
        .read_pixels()
        .context("canvas readback failed")?;
    let image = image::RgbaImage::from_raw(CANVAS_WIDTH, CANVAS_HEIGHT, pixels)
        .context("readback size does not match the canvas")?;
    image
        .save(&options.out)
        .with_context(|| format!("failed to write {}", options.out.display()))?;

    log::info!("wrote {}", options.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cli::PlanKind;
    use easel_engine::gl::StageKind;
    use easel_engine::shader::{compile_stage, link};

    #[test]
    fn bundled_assets_load_and_link() {
        let options = Options::default();
        let loader = ResourceLoader::new(FileTransport::new(&options.assets));

        for kind in [PlanKind::Shapes, PlanKind::Images] {
            let plan = kind.plan();
            let set = pollster::block_on(loader.load_all(&plan.requests())).unwrap();
            assert_eq!(set.images().count(), plan.images.len());

            let vs = compile_stage(StageKind::Vertex, set.text(&plan.vertex_shader).unwrap()).unwrap();
            let fs =
                compile_stage(StageKind::Fragment, set.text(&plan.fragment_shader).unwrap()).unwrap();
            let interface = link(&vs, &fs).unwrap();
            assert!(interface.attribute("a_position").is_some(), "{kind:?}");
        }
    }
}
