//! Output format module
//!
//! Target formats are plain data (extension, archive suffix, driver key); every
//! dispatch in the pipeline happens on these values.

pub mod types;
pub mod config;

pub use types::{DriverKey, TargetFormat};
pub use config::{ArchiveCompression, RenderConfig, RenderConfigBuilder, TiffCompression};
