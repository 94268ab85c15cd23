//! Depot core library
//!
//! Shared foundation for the depot workspace: the process-wide configuration
//! struct, the upload token wire format, and the extension/content-type table
//! used by both the attacher and the serving application.

pub mod config;
pub mod media_type;
pub mod token;

pub use config::Config;
pub use media_type::content_type_for_extension;
pub use token::UploadToken;
