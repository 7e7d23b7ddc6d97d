//! Raster codec module
//!
//! The codec seam ([`RasterCodec`], [`FormatDriver`]) and the bundled pure-Rust
//! GeoTIFF implementation built on the `tiff` crate.

pub mod types;
mod codec;
mod driver;
mod clip;
mod geotiff_driver;
mod tiff_codec;

pub use types::{GeoTransform, Raster, Samples};
pub use codec::RasterCodec;
pub use driver::{DriverRegistry, FormatDriver};
pub use geotiff_driver::GeoTiffDriver;
pub use tiff_codec::{TiffRaster, TiffRasterCodec};
