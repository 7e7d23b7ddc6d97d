//! Raster render pipeline module
//!
//! Serves stored rasters either verbatim or converted (and optionally clipped),
//! single or bundled into an archive. [`RenderOrchestrator::render`] is the entry
//! point; everything else is reachable for callers that need a single stage.

pub mod common;
pub mod format;
pub mod geometry;
pub mod raster;
pub mod conversions;
pub mod archive;

pub use common::{
    AssetDescriptor,
    BufferOrigin,
    ErrorKind,
    RenderError,
    RenderTimings,
    RenderedBuffer,
    Result,
};

pub use format::{
    ArchiveCompression,
    DriverKey,
    RenderConfig,
    RenderConfigBuilder,
    TargetFormat,
    TiffCompression,
};

pub use geometry::{
    CallerGeometry,
    GeometrySpec,
};

pub use raster::{
    DriverRegistry,
    FormatDriver,
    GeoTiffDriver,
    RasterCodec,
    TiffRasterCodec,
};

pub use conversions::{
    AssetConverter,
    PassthroughDecision,
    RasterConverter,
    RenderOrchestrator,
    RenderOutput,
};

pub use archive::{
    ArchiveAssembler,
    ArchiveEntry,
};
