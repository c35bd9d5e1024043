//! Kernel of the StudyShelf workspace: layered settings, the [`Module`] trait
//! and the registry that drives module lifecycles.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
