//! Polygon clipping of decoded rasters

use std::borrow::Cow;
use std::path::Path;

use tracing::debug;

use crate::render_pipeline::common::error::{RenderError, Result};
use crate::render_pipeline::geometry::{GeometrySpec, normalize_spatial_ref};
use crate::render_pipeline::raster::types::{Raster, Samples};

/// Pixel window `[col0, col1) x [row0, row1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    col0: u32,
    row0: u32,
    col1: u32,
    row1: u32,
}

impl Window {
    fn width(&self) -> u32 {
        self.col1 - self.col0
    }

    fn height(&self) -> u32 {
        self.row1 - self.row0
    }
}

/// Crops `raster` to the part of its extent covered by the geometry's bounding box
/// and fills pixels whose centres fall outside the geometry with `fill`.
///
/// A geometry in another EPSG reference is reprojected into the raster's first.
/// Fails with [`RenderError::ClipEmpty`] unless at least one pixel centre lies
/// inside the geometry.
pub(crate) fn clip_raster(
    raster: &Raster,
    geometry: &GeometrySpec,
    fill: f64,
    source: &Path,
) -> Result<Raster> {
    let transform = raster.transform.ok_or_else(|| {
        RenderError::Codec(format!("{} has no georeferencing to clip against", source.display()))
    })?;
    let geometry = align_geometry(raster, geometry)?;

    let expected = raster.width as usize * raster.height as usize * raster.bands as usize;
    if raster.samples.len() != expected {
        return Err(RenderError::Codec(format!(
            "{} has {} samples, expected {}",
            source.display(),
            raster.samples.len(),
            expected
        )));
    }

    let extent = transform.bounds(raster.width, raster.height);
    let overlap = extent
        .intersection(&geometry.bounds())
        .ok_or_else(|| RenderError::ClipEmpty(source.to_path_buf()))?;

    let col0 = ((overlap.minx - transform.origin_x) / transform.pixel_width).floor();
    let col1 = ((overlap.maxx - transform.origin_x) / transform.pixel_width).ceil();
    let row0 = ((transform.origin_y - overlap.maxy) / transform.pixel_height).floor();
    let row1 = ((transform.origin_y - overlap.miny) / transform.pixel_height).ceil();
    let window = Window {
        col0: col0.clamp(0.0, raster.width as f64) as u32,
        row0: row0.clamp(0.0, raster.height as f64) as u32,
        col1: col1.clamp(0.0, raster.width as f64) as u32,
        row1: row1.clamp(0.0, raster.height as f64) as u32,
    };
    if window.col1 <= window.col0 || window.row1 <= window.row0 {
        return Err(RenderError::ClipEmpty(source.to_path_buf()));
    }

    debug!(
        col = window.col0,
        row = window.row0,
        width = window.width(),
        height = window.height(),
        "Clip window"
    );

    let window_transform = transform.offset(window.col0, window.row0);
    let inside = |col: u32, row: u32| {
        let (x, y) = window_transform.pixel_center(col, row);
        geometry.contains(x, y)
    };

    let (samples, covered) = match &raster.samples {
        Samples::U8(v) => wrap(crop(v, raster, window, fill as u8, inside), Samples::U8),
        Samples::U16(v) => wrap(crop(v, raster, window, fill as u16, inside), Samples::U16),
        Samples::I16(v) => wrap(crop(v, raster, window, fill as i16, inside), Samples::I16),
        Samples::F32(v) => wrap(crop(v, raster, window, fill as f32, inside), Samples::F32),
        Samples::F64(v) => wrap(crop(v, raster, window, fill, inside), Samples::F64),
    };
    if !covered {
        return Err(RenderError::ClipEmpty(source.to_path_buf()));
    }

    Ok(Raster {
        width: window.width(),
        height: window.height(),
        bands: raster.bands,
        samples,
        transform: Some(window_transform),
        spatial_ref: raster.spatial_ref.clone(),
    })
}

// Rasters without a spatial reference are taken to share the geometry's.
fn align_geometry<'a>(raster: &Raster, geometry: &'a GeometrySpec) -> Result<Cow<'a, GeometrySpec>> {
    let Some(raster_srs) = raster.spatial_ref.as_deref() else {
        return Ok(Cow::Borrowed(geometry));
    };
    let raster_srs = normalize_spatial_ref(raster_srs)?;
    if raster_srs.eq_ignore_ascii_case(geometry.spatial_ref()) {
        return Ok(Cow::Borrowed(geometry));
    }

    debug!(from = geometry.spatial_ref(), to = %raster_srs, "Reprojecting clip geometry");
    geometry.reproject(&raster_srs).map(Cow::Owned)
}

fn wrap<T>((data, covered): (Vec<T>, bool), variant: fn(Vec<T>) -> Samples) -> (Samples, bool) {
    (variant(data), covered)
}

/// Copies the window out of `data`, filling pixels outside the geometry.
/// The flag is true if any pixel was kept.
fn crop<T: Copy>(
    data: &[T],
    raster: &Raster,
    window: Window,
    fill: T,
    inside: impl Fn(u32, u32) -> bool,
) -> (Vec<T>, bool) {
    let bands = raster.bands as usize;
    let row_len = raster.width as usize * bands;
    let mut out = Vec::with_capacity(window.width() as usize * window.height() as usize * bands);
    let mut covered = false;
    for row in window.row0..window.row1 {
        let start = row as usize * row_len + window.col0 as usize * bands;
        let end = start + window.width() as usize * bands;
        for (col, pixel) in data[start..end].chunks_exact(bands).enumerate() {
            if inside(col as u32, row - window.row0) {
                out.extend_from_slice(pixel);
                covered = true;
            } else {
                out.extend(std::iter::repeat_n(fill, bands));
            }
        }
    }
    (out, covered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_pipeline::geometry::{Bounds, CallerGeometry};
    use crate::render_pipeline::raster::types::GeoTransform;

    // 10x10 single band, 1 unit pixels, upper-left corner at (0, 10).
    fn grid() -> Raster {
        grid_at(0.0, 10.0)
    }

    fn grid_at(origin_x: f64, origin_y: f64) -> Raster {
        Raster {
            width: 10,
            height: 10,
            bands: 1,
            samples: Samples::U16((1..=100).collect()),
            transform: Some(GeoTransform {
                origin_x,
                origin_y,
                pixel_width: 1.0,
                pixel_height: 1.0,
            }),
            spatial_ref: Some("EPSG:32610".to_string()),
        }
    }

    fn spec(geom: CallerGeometry) -> GeometrySpec {
        GeometrySpec::from_caller_geometry(Some(&geom), "32610")
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_bbox_clip_narrows_extent() {
        let geometry = spec(CallerGeometry::BoundingBox([2.0, 3.0, 5.0, 20.0]));
        let clipped = clip_raster(&grid(), &geometry, 0.0, Path::new("grid.tif")).unwrap();

        assert_eq!((clipped.width, clipped.height), (3, 7));
        assert_eq!(clipped.bounds(), Some(Bounds::new(2.0, 3.0, 5.0, 10.0)));
        // Upper-left pixel of the window is source pixel (2, 0).
        assert_eq!(clipped.sample(0, 0, 0), Some(3.0));
        assert_eq!(clipped.sample(2, 6, 0), Some(65.0));
    }

    #[test]
    fn test_pixels_outside_polygon_are_filled() {
        let geometry = spec(CallerGeometry::Polygon(vec![vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (0.0, 10.0),
        ]]));
        let clipped = clip_raster(&grid(), &geometry, 0.0, Path::new("grid.tif")).unwrap();

        assert_eq!((clipped.width, clipped.height), (10, 10));
        assert_eq!(clipped.sample(0, 9, 0), Some(91.0));
        assert_eq!(clipped.sample(9, 0, 0), Some(0.0));
    }

    #[test]
    fn test_disjoint_geometry_is_clip_empty() {
        let geometry = spec(CallerGeometry::BoundingBox([20.0, 20.0, 30.0, 30.0]));
        assert!(matches!(
            clip_raster(&grid(), &geometry, 0.0, Path::new("grid.tif")),
            Err(RenderError::ClipEmpty(_))
        ));
    }

    #[test]
    fn test_polygon_missing_raster_is_clip_empty() {
        // Bounding box overlaps x/y 12..20, but every pixel centre has x + y > 20.
        let geometry = spec(CallerGeometry::Polygon(vec![vec![
            (0.0, 0.0),
            (20.0, 0.0),
            (0.0, 20.0),
        ]]));
        assert!(matches!(
            clip_raster(&grid_at(12.0, 22.0), &geometry, 0.0, Path::new("grid.tif")),
            Err(RenderError::ClipEmpty(_))
        ));
    }

    #[test]
    fn test_geographic_box_reprojected_onto_utm_raster() {
        // 100x100 pixels of 10 m around 45°N 123°W (easting 500000, northing ~4982950).
        let raster = Raster {
            width: 100,
            height: 100,
            bands: 1,
            samples: Samples::U16((1..=10_000).collect()),
            transform: Some(GeoTransform {
                origin_x: 499_500.0,
                origin_y: 4_983_500.0,
                pixel_width: 10.0,
                pixel_height: 10.0,
            }),
            spatial_ref: Some("EPSG:32610".to_string()),
        };
        let geometry = GeometrySpec::from_caller_geometry(
            Some(&CallerGeometry::BoundingBox([-123.001, 44.999, -122.999, 45.001])),
            "EPSG:4326",
        )
        .unwrap()
        .unwrap();

        let clipped = clip_raster(&raster, &geometry, 0.0, Path::new("utm.tif")).unwrap();

        // ~157 m by ~222 m.
        assert_eq!((clipped.width, clipped.height), (16, 24));
        assert_eq!(clipped.spatial_ref.as_deref(), Some("EPSG:32610"));
        let bounds = clipped.bounds().unwrap();
        assert!(bounds.minx < 500_000.0 && bounds.maxx > 500_000.0);
        assert!(bounds.miny < 4_982_950.0 && bounds.maxy > 4_982_950.0);
        // Source pixel (50, 54) holds the centre point; the window's corner is outside.
        assert_eq!(clipped.sample(8, 11, 0), Some(5451.0));
        assert_eq!(clipped.sample(0, 0, 0), Some(0.0));
    }

    #[test]
    fn test_unresolvable_spatial_ref_is_geometry_error() {
        let geometry = GeometrySpec::from_caller_geometry(
            Some(&CallerGeometry::BoundingBox([0.0, 0.0, 5.0, 5.0])),
            "+proj=longlat +datum=WGS84",
        )
        .unwrap()
        .unwrap();
        assert!(matches!(
            clip_raster(&grid(), &geometry, 0.0, Path::new("grid.tif")),
            Err(RenderError::Geometry(_))
        ));
    }
}
