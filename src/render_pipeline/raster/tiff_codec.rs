//! Pure-Rust raster codec backed by the `tiff` crate.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, instrument};

use crate::render_pipeline::common::error::{RenderError, Result};
use crate::render_pipeline::format::{RenderConfig, TargetFormat};
use crate::render_pipeline::geometry::GeometrySpec;
use crate::render_pipeline::raster::clip::clip_raster;
use crate::render_pipeline::raster::codec::RasterCodec;
use crate::render_pipeline::raster::driver::DriverRegistry;
use crate::render_pipeline::raster::geotiff_driver::{
    GEOGRAPHIC_TYPE_GEO_KEY, GEOTIFF_GEOASCIIPARAMS, GEOTIFF_GEOKEYDIRECTORY,
    GEOTIFF_MODELPIXELSCALE, GEOTIFF_MODELTIEPOINT, GeoTiffDriver, PROJECTED_CS_TYPE_GEO_KEY,
};
use crate::render_pipeline::raster::types::{GeoTransform, Raster, Samples};

// GeoKey value marking a user-defined CRS
const USER_DEFINED: u16 = 32767;

/// Handle to one opened raster.
#[derive(Debug, Clone)]
pub struct TiffRaster {
    source: std::path::PathBuf,
    raster: Raster,
}

impl TiffRaster {
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn into_raster(self) -> Raster {
        self.raster
    }
}

/// Decodes GeoTIFF sources and encodes through a [`DriverRegistry`].
pub struct TiffRasterCodec {
    drivers: DriverRegistry,
    clip_fill: f64,
}

impl TiffRasterCodec {
    /// Codec with the GeoTIFF driver registered.
    pub fn new(config: &RenderConfig) -> Self {
        let mut drivers = DriverRegistry::new();
        drivers.register(GeoTiffDriver::new(config.tiff_compression));
        Self::with_registry(drivers, config.clip_fill)
    }

    pub fn with_registry(drivers: DriverRegistry, clip_fill: f64) -> Self {
        Self { drivers, clip_fill }
    }

    pub fn drivers_mut(&mut self) -> &mut DriverRegistry {
        &mut self.drivers
    }

    /// Decodes a GeoTIFF from any seekable reader.
    pub fn decode<R: Read + Seek>(reader: R) -> Result<Raster> {
        let mut decoder = Decoder::new(reader).map_err(codec_error)?;
        let (width, height) = decoder.dimensions().map_err(codec_error)?;
        let bands = match decoder.colortype().map_err(codec_error)? {
            ColorType::Gray(_) => 1,
            ColorType::GrayA(_) => 2,
            ColorType::RGB(_) => 3,
            ColorType::RGBA(_) => 4,
            ColorType::Multiband { num_samples, .. } => num_samples,
            other => {
                return Err(RenderError::Codec(format!("unsupported color type {other:?}")));
            }
        };

        let transform = read_transform(&mut decoder)?;
        let spatial_ref = read_spatial_ref(&mut decoder)?;

        let samples = match decoder.read_image().map_err(codec_error)? {
            DecodingResult::U8(v) => Samples::U8(v),
            DecodingResult::U16(v) => Samples::U16(v),
            DecodingResult::I16(v) => Samples::I16(v),
            DecodingResult::F32(v) => Samples::F32(v),
            DecodingResult::F64(v) => Samples::F64(v),
            _ => {
                return Err(RenderError::Codec("unsupported sample format".to_string()));
            }
        };

        Ok(Raster {
            width,
            height,
            bands,
            samples,
            transform,
            spatial_ref,
        })
    }
}

impl RasterCodec for TiffRasterCodec {
    type Handle = TiffRaster;

    fn supports(&self, format: &TargetFormat) -> bool {
        self.drivers.contains(format.driver())
    }

    #[instrument(skip(self))]
    fn open(&self, path: &Path) -> Result<TiffRaster> {
        let file = File::open(path).map_err(|e| {
            RenderError::AssetNotFound(format!("{}: {}", path.display(), e))
        })?;
        let raster = Self::decode(BufReader::new(file)).map_err(|e| match e {
            RenderError::Codec(msg) => RenderError::Codec(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        debug!(
            width = raster.width,
            height = raster.height,
            bands = raster.bands,
            "Opened raster"
        );
        Ok(TiffRaster {
            source: path.to_path_buf(),
            raster,
        })
    }

    fn clip(&self, handle: &TiffRaster, geometry: &GeometrySpec) -> Result<TiffRaster> {
        let raster = clip_raster(&handle.raster, geometry, self.clip_fill, &handle.source)?;
        Ok(TiffRaster {
            source: handle.source.clone(),
            raster,
        })
    }

    fn encode(&self, handle: &TiffRaster, format: &TargetFormat) -> Result<Vec<u8>> {
        self.drivers.get(format.driver())?.encode(&handle.raster)
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    let scale = find_f64_vec(decoder, GEOTIFF_MODELPIXELSCALE)?;
    let tiepoint = find_f64_vec(decoder, GEOTIFF_MODELTIEPOINT)?;
    let (Some(scale), Some(tiepoint)) = (scale, tiepoint) else {
        return Ok(None);
    };
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RenderError::Codec("malformed GeoTIFF georeferencing tags".to_string()));
    }
    // Tiepoint (I, J, K, X, Y, Z) may anchor any pixel; rebase it on (0, 0).
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Ok(Some(GeoTransform {
        origin_x: x - i * scale[0],
        origin_y: y + j * scale[1],
        pixel_width: scale[0],
        pixel_height: scale[1],
    }))
}

fn read_spatial_ref<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<String>> {
    let geokeys = decoder
        .find_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY))
        .map_err(codec_error)?
        .map(|v| v.into_u16_vec())
        .transpose()
        .map_err(codec_error)?;

    if let Some(keys) = geokeys {
        for entry in keys.get(4..).unwrap_or_default().chunks_exact(4) {
            let (key, location, value) = (entry[0], entry[1], entry[3]);
            if (key == GEOGRAPHIC_TYPE_GEO_KEY || key == PROJECTED_CS_TYPE_GEO_KEY)
                && location == 0
                && value != USER_DEFINED
            {
                return Ok(Some(format!("EPSG:{value}")));
            }
        }
    }

    let ascii = decoder
        .find_tag(Tag::Unknown(GEOTIFF_GEOASCIIPARAMS))
        .map_err(codec_error)?
        .map(|v| v.into_string())
        .transpose()
        .map_err(codec_error)?;
    Ok(ascii
        .map(|s| s.trim_end_matches(['\0', '|']).to_string())
        .filter(|s| !s.is_empty()))
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: u16) -> Result<Option<Vec<f64>>> {
    decoder
        .find_tag(Tag::Unknown(tag))
        .map_err(codec_error)?
        .map(|v| v.into_f64_vec())
        .transpose()
        .map_err(codec_error)
}

fn codec_error(err: tiff::TiffError) -> RenderError {
    RenderError::Codec(err.to_string())
}
