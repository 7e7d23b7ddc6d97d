use std::path::Path;

use crate::render_pipeline::common::error::Result;
use crate::render_pipeline::format::TargetFormat;
use crate::render_pipeline::geometry::GeometrySpec;

/// Raster codec capability the converter drives.
///
/// Implementations own one decode/encode session per handle; handles are never
/// shared between render calls.
pub trait RasterCodec {
    type Handle;

    /// Whether a driver is registered for `format`.
    fn supports(&self, format: &TargetFormat) -> bool;

    fn open(&self, path: &Path) -> Result<Self::Handle>;

    /// Pixel-accurate clip to the geometry; an empty intersection is
    /// [`RenderError::ClipEmpty`](crate::render_pipeline::RenderError::ClipEmpty).
    fn clip(&self, raster: &Self::Handle, geometry: &GeometrySpec) -> Result<Self::Handle>;

    fn encode(&self, raster: &Self::Handle, format: &TargetFormat) -> Result<Vec<u8>>;
}
