use std::collections::HashMap;

use tracing::debug;

use crate::render_pipeline::common::error::{RenderError, Result};
use crate::render_pipeline::format::DriverKey;
use crate::render_pipeline::raster::types::Raster;

/// Encoder for one on-disk raster format.
pub trait FormatDriver: Send + Sync {
    fn key(&self) -> DriverKey;
    fn encode(&self, raster: &Raster) -> Result<Vec<u8>>;
}

/// Drivers available to a codec, keyed by [`DriverKey`].
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<DriverKey, Box<dyn FormatDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `driver`, replacing any driver previously registered under its key.
    pub fn register(&mut self, driver: impl FormatDriver + 'static) -> &mut Self {
        debug!(driver = %driver.key(), "Registering format driver");
        self.drivers.insert(driver.key(), Box::new(driver));
        self
    }

    pub fn contains(&self, key: DriverKey) -> bool {
        self.drivers.contains_key(&key)
    }

    pub fn get(&self, key: DriverKey) -> Result<&dyn FormatDriver> {
        self.drivers
            .get(&key)
            .map(|d| d.as_ref())
            .ok_or_else(|| RenderError::UnsupportedFormat(format!("no {key} driver registered")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_pipeline::format::TiffCompression;
    use crate::render_pipeline::raster::GeoTiffDriver;

    #[test]
    fn test_lookup() {
        let mut registry = DriverRegistry::new();
        registry.register(GeoTiffDriver::new(TiffCompression::None));

        assert!(registry.contains(DriverKey::GTiff));
        assert_eq!(registry.get(DriverKey::GTiff).unwrap().key(), DriverKey::GTiff);
        assert!(matches!(
            registry.get(DriverKey::Hfa),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }
}
