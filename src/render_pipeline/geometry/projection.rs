//! Point reprojection between EPSG coordinate reference systems
//!
//! Uses proj4rs with PROJ strings looked up in the crs-definitions database, so
//! any EPSG code that database knows (UTM zones, national grids, ...) resolves
//! without a system PROJ install.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::render_pipeline::common::error::{RenderError, Result};
use crate::render_pipeline::geometry::spec::normalize_spatial_ref;

/// EPSG code of a spatial reference, if it is one (`EPSG:32610`, `4326`, ...).
pub fn epsg_code(spatial_ref: &str) -> Option<i32> {
    let normalized = normalize_spatial_ref(spatial_ref).ok()?;
    normalized.strip_prefix("EPSG:")?.parse().ok()
}

/// Projects `(x, y)` from `source_epsg` to `target_epsg`.
///
/// Geographic coordinates are degrees in `(lon, lat)` order on both sides.
pub fn project_point(source_epsg: i32, target_epsg: i32, x: f64, y: f64) -> Result<(f64, f64)> {
    if source_epsg == target_epsg {
        return Ok((x, y));
    }

    let source = proj_for(source_epsg)?;
    let target = proj_for(target_epsg)?;

    // proj4rs works in radians for geographic systems.
    let source_geographic = is_geographic(source_epsg);
    let mut point = if source_geographic {
        (x.to_radians(), y.to_radians(), 0.0)
    } else {
        (x, y, 0.0)
    };
    transform(&source, &target, &mut point).map_err(|e| {
        RenderError::Geometry(format!(
            "cannot project ({x}, {y}) from EPSG:{source_epsg} to EPSG:{target_epsg}: {e:?}"
        ))
    })?;

    if is_geographic(target_epsg) {
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    } else {
        Ok((point.0, point.1))
    }
}

fn proj_string(epsg: i32) -> Option<&'static str> {
    u16::try_from(epsg)
        .ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4)
}

fn proj_for(epsg: i32) -> Result<Proj> {
    let definition = proj_string(epsg).ok_or_else(|| {
        RenderError::Geometry(format!("unknown spatial reference EPSG:{epsg}"))
    })?;
    Proj::from_proj_string(definition)
        .map_err(|e| RenderError::Geometry(format!("invalid projection EPSG:{epsg}: {e:?}")))
}

fn is_geographic(epsg: i32) -> bool {
    match proj_string(epsg) {
        Some(definition) => definition.contains("+proj=longlat"),
        None => (4000..5000).contains(&epsg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_code() {
        assert_eq!(epsg_code("EPSG:32610"), Some(32610));
        assert_eq!(epsg_code(" 4326 "), Some(4326));
        assert_eq!(epsg_code("+proj=longlat +datum=WGS84"), None);
    }

    #[test]
    fn test_same_crs_is_identity() {
        assert_eq!(project_point(32610, 32610, 1.5, -2.5).unwrap(), (1.5, -2.5));
    }

    #[test]
    fn test_central_meridian_to_utm() {
        // 123°W is the central meridian of UTM zone 10.
        let (x, y) = project_point(4326, 32610, -123.0, 45.0).unwrap();
        assert!((x - 500_000.0).abs() < 0.01, "easting {x}");
        assert!((y - 4_982_950.4).abs() < 1.0, "northing {y}");

        let (lon, lat) = project_point(32610, 4326, x, y).unwrap();
        assert!((lon + 123.0).abs() < 1e-6);
        assert!((lat - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_code_is_geometry_error() {
        assert!(matches!(
            project_point(4326, 999_999, 0.0, 0.0),
            Err(RenderError::Geometry(_))
        ));
    }
}
