//! WGSL shader stages and program objects.
//!
//! Compilation is `naga` parse + validate + reflection of the entry point's
//! interface. Linking matches the vertex outputs against the fragment inputs
//! and merges both stages' resource bindings into a [`ProgramInterface`].
//!
//! Both graphics contexts share [`ObjectTable`], so compile and link behave
//! the same with and without a GPU.

mod link;
mod objects;
mod reflect;

#[cfg(test)]
pub(crate) mod testdata;

pub use link::{link, ProgramInterface};
pub use objects::{LinkedProgram, ObjectTable};
pub use reflect::{
    compile_stage, CompiledStage, IoKind, IoType, ResourceSlot, StageInterface, StageVar,
    UniformInfo,
};
