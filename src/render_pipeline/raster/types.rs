//! Decoded raster types

use crate::render_pipeline::geometry::Bounds;

/// Pixel samples, band-interleaved by pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::I16(v) => v.len(),
            Samples::F32(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Samples::U8(_) => "u8",
            Samples::U16(_) => "u16",
            Samples::I16(_) => "i16",
            Samples::F32(_) => "f32",
            Samples::F64(_) => "f64",
        }
    }

    /// Sample at flat `index`, widened to f64.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        match self {
            Samples::U8(v) => v.get(index).map(|&s| s as f64),
            Samples::U16(v) => v.get(index).map(|&s| s as f64),
            Samples::I16(v) => v.get(index).map(|&s| s as f64),
            Samples::F32(v) => v.get(index).map(|&s| s as f64),
            Samples::F64(v) => v.get(index).copied(),
        }
    }
}

/// North-up affine placement of a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X of the upper-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// Y of the upper-left corner of pixel (0, 0)
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Positive; rows advance southwards
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn bounds(&self, width: u32, height: u32) -> Bounds {
        Bounds::new(
            self.origin_x,
            self.origin_y - height as f64 * self.pixel_height,
            self.origin_x + width as f64 * self.pixel_width,
            self.origin_y,
        )
    }

    pub fn pixel_center(&self, col: u32, row: u32) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Transform of a window whose upper-left pixel is (`col`, `row`).
    pub fn offset(&self, col: u32, row: u32) -> GeoTransform {
        GeoTransform {
            origin_x: self.origin_x + col as f64 * self.pixel_width,
            origin_y: self.origin_y - row as f64 * self.pixel_height,
            ..*self
        }
    }
}

/// A decoded raster held in memory by the bundled codec.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub bands: u16,
    pub samples: Samples,
    pub transform: Option<GeoTransform>,
    pub spatial_ref: Option<String>,
}

impl Raster {
    pub fn bounds(&self) -> Option<Bounds> {
        self.transform.map(|t| t.bounds(self.width, self.height))
    }

    pub fn sample(&self, col: u32, row: u32, band: u16) -> Option<f64> {
        if col >= self.width || row >= self.height || band >= self.bands {
            return None;
        }
        let index = (row as usize * self.width as usize + col as usize) * self.bands as usize
            + band as usize;
        self.samples.value_at(index)
    }
}
