//! Clip geometry module
//!
//! Normalises caller-supplied clip geometry into the well-known-binary polygon
//! and spatial reference the codec's clip operation consumes.

mod polygon;
mod wkb;
pub mod projection;
pub mod spec;

pub use polygon::{Bounds, Polygon, Ring};
pub use projection::{epsg_code, project_point};
pub use spec::{CallerGeometry, GeometrySpec, normalize_spatial_ref};
