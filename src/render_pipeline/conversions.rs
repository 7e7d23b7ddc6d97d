//! Pipeline conversions module
//!
//! Per-asset conversion (with the passthrough fast path) and the top-level
//! render orchestration over a batch of assets.

mod passthrough;
mod raster_converter;
mod orchestrator;


pub use passthrough::PassthroughDecision;
pub use raster_converter::{AssetConverter, RasterConverter};
pub use orchestrator::{RenderOrchestrator, RenderOutput};
