use crate::render_pipeline::common::error::{RenderError, Result};

pub type Ring = Vec<(f64, f64)>;

/// Axis-aligned extent in map units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Bounds {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self { minx, miny, maxx, maxy }
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Overlapping area of both extents; `None` unless it has positive area.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let out = Bounds {
            minx: self.minx.max(other.minx),
            miny: self.miny.max(other.miny),
            maxx: self.maxx.min(other.maxx),
            maxy: self.maxy.min(other.maxy),
        };
        (out.minx < out.maxx && out.miny < out.maxy).then_some(out)
    }

    fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            minx: self.minx.min(other.minx),
            miny: self.miny.min(other.miny),
            maxx: self.maxx.max(other.maxx),
            maxy: self.maxy.max(other.maxy),
        }
    }
}

/// Polygon with one exterior ring and any number of holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub interiors: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring, interiors: Vec<Ring>) -> Self {
        Self { exterior, interiors }
    }

    pub fn rectangle(bounds: &Bounds) -> Self {
        let Bounds { minx, miny, maxx, maxy } = *bounds;
        Self::new(
            vec![(minx, miny), (maxx, miny), (maxx, maxy), (minx, maxy), (minx, miny)],
            Vec::new(),
        )
    }

    pub fn validate(&self) -> Result<()> {
        validate_ring(&self.exterior)?;
        for ring in &self.interiors {
            validate_ring(ring)?;
        }
        let bounds = self.bounds();
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(RenderError::Geometry("polygon has zero area".to_string()));
        }
        Ok(())
    }

    pub fn bounds(&self) -> Bounds {
        ring_bounds(&self.exterior)
    }

    /// Even-odd containment: inside the exterior ring and outside every hole.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        ring_contains(&self.exterior, x, y)
            && !self.interiors.iter().any(|ring| ring_contains(ring, x, y))
    }
}

pub(crate) fn bounds_of(polygons: &[Polygon]) -> Option<Bounds> {
    polygons
        .iter()
        .map(Polygon::bounds)
        .reduce(|acc, b| acc.union(&b))
}

fn validate_ring(ring: &Ring) -> Result<()> {
    if ring.len() < 4 {
        return Err(RenderError::Geometry(format!(
            "ring has {} points, at least 4 required",
            ring.len()
        )));
    }
    if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(RenderError::Geometry("ring has non-finite coordinates".to_string()));
    }
    if ring.first() != ring.last() {
        return Err(RenderError::Geometry("ring is not closed".to_string()));
    }
    Ok(())
}

fn ring_bounds(ring: &Ring) -> Bounds {
    let mut bounds = Bounds::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in ring {
        bounds.minx = bounds.minx.min(x);
        bounds.miny = bounds.miny.min(y);
        bounds.maxx = bounds.maxx.max(x);
        bounds.maxy = bounds.maxy.max(y);
    }
    bounds
}

// Crossing-number test.
fn ring_contains(ring: &Ring, x: f64, y: f64) -> bool {
    let mut inside = false;
    for edge in ring.windows(2) {
        let (x1, y1) = edge[0];
        let (x2, y2) = edge[1];
        if (y1 > y) != (y2 > y) {
            let cross_x = x1 + (y - y1) * (x2 - x1) / (y2 - y1);
            if x < cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Polygon {
        Polygon::new(vec![(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (0.0, 0.0)], Vec::new())
    }

    #[test]
    fn test_contains_respects_holes() {
        let square = Polygon::new(
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)],
            vec![vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)]],
        );
        assert!(square.contains(1.0, 1.0));
        assert!(!square.contains(5.0, 5.0));
        assert!(!square.contains(11.0, 5.0));
    }

    #[test]
    fn test_triangle_containment() {
        let tri = triangle();
        assert!(tri.contains(2.0, 2.0));
        assert!(!tri.contains(8.0, 8.0));
        assert_eq!(tri.bounds(), Bounds::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_validate_rejects_open_ring() {
        let open = Polygon::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], Vec::new());
        assert!(matches!(open.validate(), Err(RenderError::Geometry(_))));
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn test_bounds_intersection() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            a.intersection(&Bounds::new(5.0, -5.0, 20.0, 5.0)),
            Some(Bounds::new(5.0, 0.0, 10.0, 5.0))
        );
        // Touching edges share no area.
        assert_eq!(a.intersection(&Bounds::new(10.0, 0.0, 20.0, 10.0)), None);
    }
}
