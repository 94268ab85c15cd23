//! Depot attacher library
//!
//! The [`Attacher`] orchestrates one named attachment on one host record:
//! staging uploads in a cache backend, validating them, promoting them to a
//! store backend, and mirroring metadata onto the record through the
//! [`AttachmentFields`] interface.

pub mod attacher;
pub mod record;

pub use attacher::{AttachError, AttachValue, Attacher, ValidationFault};
pub use record::AttachmentFields;
