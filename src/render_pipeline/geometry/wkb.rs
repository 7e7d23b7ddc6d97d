//! Well-known-binary polygon reading and writing

use crate::render_pipeline::common::error::{RenderError, Result};
use crate::render_pipeline::geometry::polygon::{Polygon, Ring};

const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;

// EWKB flag bits
const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

#[derive(Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

struct WkbReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WkbReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| RenderError::Geometry(format!("WKB truncated at byte {}", self.pos)))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn byte_order(&mut self) -> Result<ByteOrder> {
        match self.take::<1>()?[0] {
            0 => Ok(ByteOrder::Big),
            1 => Ok(ByteOrder::Little),
            other => Err(RenderError::Geometry(format!("invalid WKB byte order {other}"))),
        }
    }

    fn u32(&mut self, order: ByteOrder) -> Result<u32> {
        let bytes = self.take::<4>()?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        })
    }

    fn f64(&mut self, order: ByteOrder) -> Result<f64> {
        let bytes = self.take::<8>()?;
        Ok(match order {
            ByteOrder::Big => f64::from_be_bytes(bytes),
            ByteOrder::Little => f64::from_le_bytes(bytes),
        })
    }

    /// Reads a geometry header, returning byte order, base type and coordinate dimension.
    fn header(&mut self) -> Result<(ByteOrder, u32, usize)> {
        let order = self.byte_order()?;
        let raw = self.u32(order)?;
        if raw & EWKB_SRID != 0 {
            // The SRID travels separately as the spatial reference string.
            self.u32(order)?;
        }
        let mut dims = 2;
        if raw & EWKB_Z != 0 {
            dims += 1;
        }
        if raw & EWKB_M != 0 {
            dims += 1;
        }
        let iso = raw & 0x0fff_ffff;
        dims += match iso / 1000 {
            1 | 2 => 1,
            3 => 2,
            _ => 0,
        };
        Ok((order, iso % 1000, dims))
    }

    fn ring(&mut self, order: ByteOrder, dims: usize) -> Result<Ring> {
        let count = self.u32(order)? as usize;
        if count > self.remaining() / (dims * 8) {
            return Err(RenderError::Geometry(format!(
                "WKB ring claims {count} points but only {} bytes remain",
                self.remaining()
            )));
        }
        let mut ring = Vec::with_capacity(count);
        for _ in 0..count {
            let x = self.f64(order)?;
            let y = self.f64(order)?;
            for _ in 2..dims {
                self.f64(order)?;
            }
            ring.push((x, y));
        }
        Ok(ring)
    }

    fn polygon_body(&mut self, order: ByteOrder, dims: usize) -> Result<Polygon> {
        let ring_count = self.u32(order)? as usize;
        if ring_count == 0 {
            return Err(RenderError::Geometry("empty polygon".to_string()));
        }
        let exterior = self.ring(order, dims)?;
        let mut interiors = Vec::new();
        for _ in 1..ring_count {
            interiors.push(self.ring(order, dims)?);
        }
        Ok(Polygon::new(exterior, interiors))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Parses a WKB/EWKB Polygon or MultiPolygon into its polygons.
pub(crate) fn read_polygons(data: &[u8]) -> Result<Vec<Polygon>> {
    let mut reader = WkbReader::new(data);
    let (order, kind, dims) = reader.header()?;
    let polygons = match kind {
        WKB_POLYGON => vec![reader.polygon_body(order, dims)?],
        WKB_MULTIPOLYGON => {
            let count = reader.u32(order)? as usize;
            let mut polygons = Vec::new();
            for _ in 0..count {
                let (order, kind, dims) = reader.header()?;
                if kind != WKB_POLYGON {
                    return Err(RenderError::Geometry(format!(
                        "MultiPolygon member has WKB type {kind}"
                    )));
                }
                polygons.push(reader.polygon_body(order, dims)?);
            }
            polygons
        }
        other => {
            return Err(RenderError::Geometry(format!(
                "WKB type {other} cannot be used for clipping, expected Polygon or MultiPolygon"
            )));
        }
    };
    if reader.remaining() != 0 {
        return Err(RenderError::Geometry(format!(
            "{} trailing bytes after WKB geometry",
            reader.remaining()
        )));
    }
    if polygons.is_empty() {
        return Err(RenderError::Geometry("empty MultiPolygon".to_string()));
    }
    Ok(polygons)
}

/// Encodes polygons as little-endian 2D WKB; a single polygon stays a Polygon.
pub(crate) fn write_polygons(polygons: &[Polygon]) -> Vec<u8> {
    let mut out = Vec::new();
    match polygons {
        [polygon] => write_polygon(&mut out, polygon),
        _ => {
            out.push(1);
            out.extend_from_slice(&WKB_MULTIPOLYGON.to_le_bytes());
            out.extend_from_slice(&(polygons.len() as u32).to_le_bytes());
            for polygon in polygons {
                write_polygon(&mut out, polygon);
            }
        }
    }
    out
}

fn write_polygon(out: &mut Vec<u8>, polygon: &Polygon) {
    out.push(1);
    out.extend_from_slice(&WKB_POLYGON.to_le_bytes());
    out.extend_from_slice(&(1 + polygon.interiors.len() as u32).to_le_bytes());
    for ring in std::iter::once(&polygon.exterior).chain(&polygon.interiors) {
        out.extend_from_slice(&(ring.len() as u32).to_le_bytes());
        for &(x, y) in ring {
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::new(
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
            Vec::new(),
        )
    }

    #[test]
    fn test_big_endian_polygon() {
        let mut wkb = vec![0u8];
        wkb.extend_from_slice(&3u32.to_be_bytes());
        wkb.extend_from_slice(&1u32.to_be_bytes());
        wkb.extend_from_slice(&5u32.to_be_bytes());
        for (x, y) in unit_square().exterior {
            wkb.extend_from_slice(&x.to_be_bytes());
            wkb.extend_from_slice(&y.to_be_bytes());
        }

        let polygons = read_polygons(&wkb).unwrap();
        assert_eq!(polygons, vec![unit_square()]);
    }

    #[test]
    fn test_ewkb_with_srid_and_z() {
        let mut wkb = vec![1u8];
        wkb.extend_from_slice(&(WKB_POLYGON | EWKB_Z | EWKB_SRID).to_le_bytes());
        wkb.extend_from_slice(&4326u32.to_le_bytes());
        wkb.extend_from_slice(&1u32.to_le_bytes());
        wkb.extend_from_slice(&5u32.to_le_bytes());
        for (x, y) in unit_square().exterior {
            wkb.extend_from_slice(&x.to_le_bytes());
            wkb.extend_from_slice(&y.to_le_bytes());
            wkb.extend_from_slice(&100.0f64.to_le_bytes());
        }

        assert_eq!(read_polygons(&wkb).unwrap(), vec![unit_square()]);
    }

    #[test]
    fn test_multipolygon_written_for_several_polygons() {
        let shifted = Polygon::new(
            unit_square().exterior.iter().map(|&(x, y)| (x + 5.0, y)).collect(),
            Vec::new(),
        );
        let wkb = write_polygons(&[unit_square(), shifted.clone()]);
        assert_eq!(u32::from_le_bytes([wkb[1], wkb[2], wkb[3], wkb[4]]), WKB_MULTIPOLYGON);
        assert_eq!(read_polygons(&wkb).unwrap(), vec![unit_square(), shifted]);
    }

    #[test]
    fn test_rejects_points_and_truncation() {
        let mut point = vec![1u8];
        point.extend_from_slice(&1u32.to_le_bytes());
        point.extend_from_slice(&0.0f64.to_le_bytes());
        point.extend_from_slice(&0.0f64.to_le_bytes());
        assert!(matches!(read_polygons(&point), Err(RenderError::Geometry(_))));

        let wkb = write_polygons(&[unit_square()]);
        assert!(matches!(
            read_polygons(&wkb[..wkb.len() - 3]),
            Err(RenderError::Geometry(_))
        ));
        assert!(matches!(read_polygons(&[]), Err(RenderError::Geometry(_))));
    }
}
