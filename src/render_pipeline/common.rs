//! Common utilities module
//!
//! Shared error taxonomy, asset and buffer types, and step timings used across the
//! render pipeline.

pub mod error;
pub mod types;
pub mod timing;

pub use error::{ErrorKind, RenderError, Result};
pub use types::{AssetDescriptor, BufferOrigin, RenderedBuffer};
pub use timing::{RenderTimings, StepTiming, Timer};
