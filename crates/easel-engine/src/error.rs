//! Error taxonomy.
//!
//! Every fatal error ends up in [`RenderError`], which moves the renderer into
//! its terminal `Failed` state. Unresolved attribute/uniform names are not
//! errors at all: binds against them are skipped and logged at debug level.

use thiserror::Error;

use crate::gl::{StageKind, UniformShape};
use crate::render::RendererState;

/// Fetch or decode failure for a single resource.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The transfer completed with a non-success status.
    #[error("fetch of `{locator}` completed with status {status}")]
    Status { locator: String, status: u16 },

    /// The transfer itself failed.
    #[error("fetch of `{locator}` failed: {reason}")]
    Transport { locator: String, reason: String },

    #[error("text resource `{locator}` is not valid UTF-8")]
    Utf8 {
        locator: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("failed to decode image `{locator}`: {source}")]
    Decode {
        locator: String,
        #[source]
        source: image::ImageError,
    },
}

impl LoadError {
    pub fn locator(&self) -> &str {
        match self {
            LoadError::Status { locator, .. }
            | LoadError::Transport { locator, .. }
            | LoadError::Utf8 { locator, .. }
            | LoadError::Decode { locator, .. } => locator,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, LoadError::Decode { .. })
    }
}

/// Buffer/texture/program object creation or submission failure.
#[derive(Debug, Error)]
pub enum GpuResourceError {
    #[error("graphics context is lost")]
    ContextLost,

    #[error("refusing to create an empty {what}")]
    Empty { what: &'static str },

    #[error("{what} of {requested} exceeds the device limit of {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    #[error("image holds {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    PixelData {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("no linked program is in use")]
    NoProgram,

    #[error("attribute at location {location}: unsupported vertex layout ({detail})")]
    UnsupportedLayout { location: u32, detail: String },

    #[error("attribute at location {location} reads past the end of its buffer")]
    BufferOverrun { location: u32 },

    #[error("device error: {0}")]
    Device(String),
}

/// Program build failure.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: StageKind, log: String },

    #[error("program failed to link:\n{log}")]
    Link { log: String },

    #[error(transparent)]
    GpuResource(#[from] GpuResourceError),
}

/// Uniform programming errors, reported at bind time.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("unsupported uniform type suffix `{0}`")]
    UnsupportedTag(String),

    #[error("uniform of type {shape} expects {expected} values, got {actual}")]
    Arity {
        shape: UniformShape,
        expected: usize,
        actual: usize,
    },

    #[error("uniform `{name}` is declared as {declared}, cannot bind a {provided}")]
    ShapeMismatch {
        name: String,
        declared: UniformShape,
        provided: UniformShape,
    },
}

/// Pipeline stage a [`RenderError`] originated from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailureStage {
    ResourceFetch,
    ImageDecode,
    Compile(StageKind),
    Link,
    GpuResource,
    Binding,
    DrawPlan,
    Lifecycle,
}

/// Top-level error surfaced by the renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("resource loading failed: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("GPU resource failure: {0}")]
    GpuResource(#[from] GpuResourceError),

    #[error("binding failed: {0}")]
    Binding(#[from] BindingError),

    #[error("draw step references image {index}, but only {loaded} images are loaded")]
    MissingImage { index: usize, loaded: usize },

    #[error("draw step produced an invalid command: {0}")]
    InvalidCommand(String),

    #[error("cannot {operation} while the renderer is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: RendererState,
    },
}

impl RenderError {
    /// Identifies which stage of the loading-to-draw pipeline failed.
    pub fn stage(&self) -> FailureStage {
        match self {
            RenderError::Load(e) if e.is_decode() => FailureStage::ImageDecode,
            RenderError::Load(_) => FailureStage::ResourceFetch,
            RenderError::Build(BuildError::Compile { stage, .. }) => FailureStage::Compile(*stage),
            RenderError::Build(BuildError::Link { .. }) => FailureStage::Link,
            RenderError::Build(BuildError::GpuResource(_)) | RenderError::GpuResource(_) => {
                FailureStage::GpuResource
            }
            RenderError::Binding(_) => FailureStage::Binding,
            RenderError::MissingImage { .. } | RenderError::InvalidCommand(_) => {
                FailureStage::DrawPlan
            }
            RenderError::InvalidState { .. } => FailureStage::Lifecycle,
        }
    }
}
