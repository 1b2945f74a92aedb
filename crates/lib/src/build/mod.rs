//! Build records and where they are looked up.
//!
//! A build is one generated component: the prompt-derived title, the
//! generated source string and the application id its data access is scoped
//! to. Code is attached after creation, once generation finishes.
//!
//! # Submodules
//!
//! - [`store`] - lookup, listing and persistence of builds

pub mod store;
mod types;

pub use store::{BuildSource, BuildStore, FileBuildStore, MemoryBuildStore, StoreError};
pub use types::*;
