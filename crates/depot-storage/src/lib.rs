//! Depot storage library
//!
//! Storage abstraction for the two content tiers. The [`Backend`] trait is the
//! uniform contract every storage medium implements; [`FsBackend`] is the
//! local-filesystem reference implementation and [`MemoryBackend`] is the
//! content-addressed in-memory variant used by tests and fixtures.
//!
//! # Id format
//!
//! Ids are backend-assigned and opaque to callers. The filesystem backend
//! assigns random ids; the memory backend derives ids from content, so
//! identical uploads deduplicate. Callers must not assume either strategy.

pub mod fs;
pub mod memory;
pub mod registry;
pub mod traits;

pub use fs::FsBackend;
pub use memory::MemoryBackend;
pub use registry::{BackendEntry, BackendRegistry};
pub use traits::{Backend, IdStream, StorageError, StorageResult, StoredFile, UploadSource};
