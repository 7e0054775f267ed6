use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use easel_engine::render::RenderPlan;

/// Built-in plan to render.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PlanKind {
    #[default]
    Shapes,
    Images,
}

impl PlanKind {
    pub fn plan(self) -> RenderPlan {
        match self {
            PlanKind::Shapes => RenderPlan::shapes(),
            PlanKind::Images => RenderPlan::images(),
        }
    }
}

/// `easel-studio [shapes|images] [--assets DIR] [--out FILE]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub plan: PlanKind,
    pub assets: PathBuf,
    pub out: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            plan: PlanKind::default(),
            assets: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets")),
            out: PathBuf::from("easel.png"),
        }
    }
}

impl Options {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Options::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "shapes" => options.plan = PlanKind::Shapes,
                "images" => options.plan = PlanKind::Images,
                "--assets" => {
                    options.assets = args.next().context("--assets needs a directory")?.into();
                }
                "--out" => {
                    options.out = args.next().context("--out needs a file name")?.into();
                }
                other => bail!("unknown argument `{other}`"),
            }
        }
        Ok(options)
    }
}
