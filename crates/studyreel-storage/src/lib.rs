//! Project persistence and on-disk layout.
//!
//! This crate provides:
//! - `LocalStorage`: per-project directories for images, audio, clips, the
//!   clip cache manifest and the final video
//! - `ProjectStore`: the persistence seam, with in-memory and JSON-file
//!   implementations using revision-checked commits

pub mod error;
pub mod file_store;
pub mod layout;
pub mod repo;

pub use error::{StoreError, StoreResult};
pub use file_store::FileProjectStore;
pub use layout::LocalStorage;
pub use repo::{InMemoryProjectStore, ProjectStore};
