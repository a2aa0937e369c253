// Public modules
pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod grab;
pub mod install;
pub mod logging;
pub mod models;
pub mod platform;
pub mod version;

// Re-export commonly used types
pub use config::Settings;
pub use error::GrabError;
pub use grab::{Grabber, clear_cache, grab};
pub use models::*;
pub use version::VersionSpec;
