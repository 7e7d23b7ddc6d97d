use std::io::{Cursor, Seek, Write};

use tiff::encoder::colortype::{
    ColorType, Gray8, Gray16, Gray32Float, Gray64Float, GrayI16, RGB8, RGB16, RGB32Float,
    RGBA8, RGBA16, RGBA32Float,
};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

use crate::render_pipeline::common::error::{RenderError, Result};
use crate::render_pipeline::format::{DriverKey, TiffCompression};
use crate::render_pipeline::raster::driver::FormatDriver;
use crate::render_pipeline::raster::types::{Raster, Samples};

// GeoTIFF tag IDs (not in the tiff crate)
pub(crate) const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
pub(crate) const GEOTIFF_MODELTIEPOINT: u16 = 33922;
pub(crate) const GEOTIFF_GEOKEYDIRECTORY: u16 = 34735;
pub(crate) const GEOTIFF_GEOASCIIPARAMS: u16 = 34737;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GT_CITATION_GEO_KEY: u16 = 1026;
pub(crate) const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub(crate) const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Encodes rasters as GeoTIFF with georeferencing tags.
pub struct GeoTiffDriver {
    compression: TiffCompression,
}

impl GeoTiffDriver {
    pub fn new(compression: TiffCompression) -> Self {
        Self { compression }
    }
}

impl FormatDriver for GeoTiffDriver {
    fn key(&self) -> DriverKey {
        DriverKey::GTiff
    }

    fn encode(&self, raster: &Raster) -> Result<Vec<u8>> {
        debug!(
            "Encoding GeoTIFF: {}x{}, {} band(s) of {}",
            raster.width,
            raster.height,
            raster.bands,
            raster.samples.type_name()
        );

        if raster.width == 0 || raster.height == 0 || raster.samples.is_empty() {
            return Err(RenderError::Codec("raster has no pixel data".to_string()));
        }

        let compression = match self.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::Deflate => tiff::encoder::Compression::Deflate(
                tiff::encoder::compression::DeflateLevel::Balanced,
            ),
        };

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buffer)
                .map_err(codec_error)?
                .with_compression(compression);

            match (&raster.samples, raster.bands) {
                (Samples::U8(data), 1) => write_typed::<Gray8, _>(&mut encoder, raster, data)?,
                (Samples::U8(data), 3) => write_typed::<RGB8, _>(&mut encoder, raster, data)?,
                (Samples::U8(data), 4) => write_typed::<RGBA8, _>(&mut encoder, raster, data)?,
                (Samples::U16(data), 1) => write_typed::<Gray16, _>(&mut encoder, raster, data)?,
                (Samples::U16(data), 3) => write_typed::<RGB16, _>(&mut encoder, raster, data)?,
                (Samples::U16(data), 4) => write_typed::<RGBA16, _>(&mut encoder, raster, data)?,
                (Samples::I16(data), 1) => write_typed::<GrayI16, _>(&mut encoder, raster, data)?,
                (Samples::F32(data), 1) => {
                    write_typed::<Gray32Float, _>(&mut encoder, raster, data)?
                }
                (Samples::F32(data), 3) => {
                    write_typed::<RGB32Float, _>(&mut encoder, raster, data)?
                }
                (Samples::F32(data), 4) => {
                    write_typed::<RGBA32Float, _>(&mut encoder, raster, data)?
                }
                (Samples::F64(data), 1) => {
                    write_typed::<Gray64Float, _>(&mut encoder, raster, data)?
                }
                (samples, bands) => {
                    return Err(RenderError::Codec(format!(
                        "GeoTIFF driver cannot encode {} band(s) of {}",
                        bands,
                        samples.type_name()
                    )));
                }
            }
        }

        debug!("GeoTIFF encoding complete");
        Ok(buffer.into_inner())
    }
}

fn write_typed<C, W>(encoder: &mut TiffEncoder<W>, raster: &Raster, data: &[C::Inner]) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut image = encoder
        .new_image::<C>(raster.width, raster.height)
        .map_err(codec_error)?;
    write_geotiff_tags(image.encoder(), raster)?;
    image.write_data(data).map_err(codec_error)
}

fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    raster: &Raster,
) -> Result<()> {
    if let Some(transform) = raster.transform {
        // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
        let pixel_scale = [transform.pixel_width, transform.pixel_height, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE), pixel_scale.as_slice())
            .map_err(codec_error)?;

        // ModelTiepoint ties pixel (0, 0) to the upper-left corner
        let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT), tiepoint.as_slice())
            .map_err(codec_error)?;
    }

    if let Some(spatial_ref) = raster.spatial_ref.as_deref() {
        // GeoAsciiParams entries are pipe terminated.
        let ascii_params = format!("{spatial_ref}|");
        let geokeys = build_geokey_directory(spatial_ref, ascii_params.len() as u16);
        dir.write_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY), geokeys.as_slice())
            .map_err(codec_error)?;
        dir.write_tag(Tag::Unknown(GEOTIFF_GEOASCIIPARAMS), ascii_params.as_str())
            .map_err(codec_error)?;
    }

    Ok(())
}

fn build_geokey_directory(spatial_ref: &str, citation_len: u16) -> Vec<u16> {
    // [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys, entries...]
    let mut keys = vec![1, 1, 0, 0];
    let epsg = epsg_code(spatial_ref);

    if let Some(code) = epsg {
        let model = if is_geographic(code) {
            MODEL_TYPE_GEOGRAPHIC
        } else {
            MODEL_TYPE_PROJECTED
        };
        keys.extend_from_slice(&[GT_MODEL_TYPE_GEO_KEY, 0, 1, model]);
    }
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
    keys.extend_from_slice(&[GT_CITATION_GEO_KEY, GEOTIFF_GEOASCIIPARAMS, citation_len, 0]);
    if let Some(code) = epsg {
        let key = if is_geographic(code) {
            GEOGRAPHIC_TYPE_GEO_KEY
        } else {
            PROJECTED_CS_TYPE_GEO_KEY
        };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }

    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}

fn epsg_code(spatial_ref: &str) -> Option<u16> {
    let (authority, code) = spatial_ref.split_once(':')?;
    if !authority.eq_ignore_ascii_case("epsg") {
        return None;
    }
    code.trim().parse().ok()
}

fn is_geographic(code: u16) -> bool {
    (4000..5000).contains(&code)
}

fn codec_error(err: tiff::TiffError) -> RenderError {
    RenderError::Codec(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_pipeline::raster::types::GeoTransform;

    fn raster(samples: Samples, bands: u16) -> Raster {
        Raster {
            width: 4,
            height: 3,
            bands,
            samples,
            transform: Some(GeoTransform {
                origin_x: 500_000.0,
                origin_y: 4_100_000.0,
                pixel_width: 30.0,
                pixel_height: 30.0,
            }),
            spatial_ref: Some("EPSG:32610".to_string()),
        }
    }

    #[test]
    fn test_encoded_bytes_decode() {
        let bytes = GeoTiffDriver::new(TiffCompression::Lzw)
            .encode(&raster(Samples::U16(vec![7; 12]), 1))
            .unwrap();

        let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (4, 3));
        let scale = decoder
            .get_tag_f64_vec(Tag::Unknown(GEOTIFF_MODELPIXELSCALE))
            .unwrap();
        assert_eq!(scale, vec![30.0, 30.0, 0.0]);
    }

    #[test]
    fn test_unsupported_band_layout() {
        let two_band = raster(Samples::U8(vec![0; 24]), 2);
        assert!(matches!(
            GeoTiffDriver::new(TiffCompression::None).encode(&two_band),
            Err(RenderError::Codec(_))
        ));
    }

    #[test]
    fn test_geokeys_for_projected_epsg() {
        let keys = build_geokey_directory("EPSG:32610", 11);
        assert_eq!(keys[3], 4);
        assert_eq!(&keys[keys.len() - 4..], &[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, 32610]);

        let custom = build_geokey_directory("+proj=longlat", 14);
        assert_eq!(custom[3], 2);
    }
}
