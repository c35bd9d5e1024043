//! StudyShelf application library.
//!
//! Wires the books module onto the shared kernel, database and HTTP crates.

pub mod app;
pub mod modules;

pub use app::{run, StoreBackend};
