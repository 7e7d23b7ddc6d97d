//! Normalised clip geometry

use tracing::debug;

use crate::render_pipeline::common::error::{RenderError, Result};
use crate::render_pipeline::geometry::polygon::{Bounds, Polygon, Ring, bounds_of};
use crate::render_pipeline::geometry::projection::{epsg_code, project_point};
use crate::render_pipeline::geometry::wkb;

/// Clip geometry in the representations the query layer hands over.
#[derive(Debug, Clone, PartialEq)]
pub enum CallerGeometry {
    /// WKB or EWKB Polygon/MultiPolygon, either byte order
    Wkb(Vec<u8>),
    /// `[minx, miny, maxx, maxy]`
    BoundingBox([f64; 4]),
    /// Exterior ring followed by holes; open rings are closed automatically
    Polygon(Vec<Vec<(f64, f64)>>),
}

/// A validated clip polygon with its spatial reference.
///
/// Built once per render call and shared read-only by every conversion in it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySpec {
    well_known_binary: Vec<u8>,
    spatial_ref: String,
    polygons: Vec<Polygon>,
    bounds: Bounds,
}

impl GeometrySpec {
    /// Normalises caller geometry; `None` in means no clipping for the batch.
    pub fn from_caller_geometry(
        geom: Option<&CallerGeometry>,
        spatial_ref: &str,
    ) -> Result<Option<GeometrySpec>> {
        let Some(geom) = geom else {
            return Ok(None);
        };

        let polygons = match geom {
            CallerGeometry::Wkb(bytes) => wkb::read_polygons(bytes)?,
            CallerGeometry::BoundingBox([minx, miny, maxx, maxy]) => {
                let bounds = Bounds::new(*minx, *miny, *maxx, *maxy);
                if !(minx.is_finite() && miny.is_finite() && maxx.is_finite() && maxy.is_finite())
                    || bounds.width() <= 0.0
                    || bounds.height() <= 0.0
                {
                    return Err(RenderError::Geometry(format!(
                        "invalid bounding box {minx},{miny},{maxx},{maxy}"
                    )));
                }
                vec![Polygon::rectangle(&bounds)]
            }
            CallerGeometry::Polygon(rings) => {
                let mut rings = rings.iter().cloned().map(close_ring);
                let exterior = rings
                    .next()
                    .ok_or_else(|| RenderError::Geometry("polygon has no rings".to_string()))?;
                vec![Polygon::new(exterior, rings.collect())]
            }
        };

        Self::from_polygons(polygons, spatial_ref).map(Some)
    }

    pub fn from_wkb(well_known_binary: &[u8], spatial_ref: &str) -> Result<GeometrySpec> {
        Self::from_polygons(wkb::read_polygons(well_known_binary)?, spatial_ref)
    }

    fn from_polygons(polygons: Vec<Polygon>, spatial_ref: &str) -> Result<GeometrySpec> {
        for polygon in &polygons {
            polygon.validate()?;
        }
        let bounds = bounds_of(&polygons)
            .ok_or_else(|| RenderError::Geometry("no polygons supplied".to_string()))?;
        let spatial_ref = normalize_spatial_ref(spatial_ref)?;
        debug!(
            polygons = polygons.len(),
            srs = %spatial_ref,
            "Normalised clip geometry"
        );
        Ok(GeometrySpec {
            well_known_binary: wkb::write_polygons(&polygons),
            spatial_ref,
            polygons,
            bounds,
        })
    }

    /// Little-endian 2D WKB of the clip polygon(s).
    pub fn well_known_binary(&self) -> &[u8] {
        &self.well_known_binary
    }

    pub fn spatial_ref(&self) -> &str {
        &self.spatial_ref
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(x, y))
    }

    /// Reprojects every vertex into `spatial_ref`.
    ///
    /// Both references must be EPSG codes; anything else is a geometry error.
    pub fn reproject(&self, spatial_ref: &str) -> Result<GeometrySpec> {
        let target = normalize_spatial_ref(spatial_ref)?;
        let (Some(from), Some(to)) = (epsg_code(&self.spatial_ref), epsg_code(&target)) else {
            return Err(RenderError::Geometry(format!(
                "cannot reproject clip geometry from {} to {}",
                self.spatial_ref, target
            )));
        };

        let project_ring = |ring: &Ring| -> Result<Ring> {
            ring.iter()
                .map(|&(x, y)| project_point(from, to, x, y))
                .collect()
        };
        let polygons = self
            .polygons
            .iter()
            .map(|polygon| {
                let exterior = project_ring(&polygon.exterior)?;
                let interiors = polygon
                    .interiors
                    .iter()
                    .map(|ring| project_ring(ring))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Polygon::new(exterior, interiors))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_polygons(polygons, &target)
    }
}

/// Trims the reference and expands bare EPSG codes (`4326` → `EPSG:4326`).
pub fn normalize_spatial_ref(spatial_ref: &str) -> Result<String> {
    let srs = spatial_ref.trim();
    if srs.is_empty() {
        return Err(RenderError::Geometry("missing spatial reference".to_string()));
    }
    if srs.chars().all(|c| c.is_ascii_digit()) {
        return Ok(format!("EPSG:{srs}"));
    }
    match srs.split_once(':') {
        Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => {
            Ok(format!("EPSG:{}", code.trim()))
        }
        _ => Ok(srs.to_string()),
    }
}

fn close_ring(mut ring: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_geometry() {
        assert_eq!(GeometrySpec::from_caller_geometry(None, "4326").unwrap(), None);
    }

    #[test]
    fn test_bbox_becomes_rectangle_wkb() {
        let geom = CallerGeometry::BoundingBox([10.0, 20.0, 30.0, 40.0]);
        let spec = GeometrySpec::from_caller_geometry(Some(&geom), "4326")
            .unwrap()
            .unwrap();

        assert_eq!(spec.spatial_ref(), "EPSG:4326");
        assert_eq!(spec.bounds(), Bounds::new(10.0, 20.0, 30.0, 40.0));
        assert!(spec.contains(15.0, 25.0));

        let reparsed = GeometrySpec::from_wkb(spec.well_known_binary(), "epsg:4326").unwrap();
        assert_eq!(reparsed, spec);
    }

    #[test]
    fn test_open_polygon_ring_is_closed() {
        let geom = CallerGeometry::Polygon(vec![vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]]);
        let spec = GeometrySpec::from_caller_geometry(Some(&geom), "EPSG:3857")
            .unwrap()
            .unwrap();
        assert_eq!(spec.polygons()[0].exterior.len(), 4);
    }

    #[test]
    fn test_malformed_input_is_geometry_error() {
        let inverted = CallerGeometry::BoundingBox([30.0, 20.0, 10.0, 40.0]);
        let garbage = CallerGeometry::Wkb(vec![1, 2, 3]);
        let no_rings = CallerGeometry::Polygon(Vec::new());
        for geom in [inverted, garbage, no_rings] {
            assert!(matches!(
                GeometrySpec::from_caller_geometry(Some(&geom), "4326"),
                Err(RenderError::Geometry(_))
            ));
        }

        let bbox = CallerGeometry::BoundingBox([0.0, 0.0, 1.0, 1.0]);
        assert!(matches!(
            GeometrySpec::from_caller_geometry(Some(&bbox), "  "),
            Err(RenderError::Geometry(_))
        ));
    }

    #[test]
    fn test_reproject_into_utm() {
        let geom = CallerGeometry::BoundingBox([-123.001, 44.999, -122.999, 45.001]);
        let spec = GeometrySpec::from_caller_geometry(Some(&geom), "4326")
            .unwrap()
            .unwrap();

        let utm = spec.reproject("32610").unwrap();
        assert_eq!(utm.spatial_ref(), "EPSG:32610");
        assert!(utm.contains(500_000.0, 4_982_950.0));
        let bounds = utm.bounds();
        assert!(bounds.width() > 150.0 && bounds.width() < 170.0, "{bounds:?}");
        assert!(bounds.height() > 210.0 && bounds.height() < 235.0, "{bounds:?}");
    }

    #[test]
    fn test_reproject_needs_epsg_codes() {
        let geom = CallerGeometry::BoundingBox([0.0, 0.0, 1.0, 1.0]);
        let spec = GeometrySpec::from_caller_geometry(Some(&geom), "+proj=longlat")
            .unwrap()
            .unwrap();
        assert!(matches!(spec.reproject("EPSG:32610"), Err(RenderError::Geometry(_))));
    }

    #[test]
    fn test_normalize_spatial_ref() {
        assert_eq!(normalize_spatial_ref(" 32610 ").unwrap(), "EPSG:32610");
        assert_eq!(normalize_spatial_ref("epsg: 4326").unwrap(), "EPSG:4326");
        assert_eq!(normalize_spatial_ref("+proj=longlat").unwrap(), "+proj=longlat");
    }
}
