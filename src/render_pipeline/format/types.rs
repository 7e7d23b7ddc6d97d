//! Target format table

use std::fmt;
use std::str::FromStr;

use crate::render_pipeline::common::error::RenderError;

/// Key selecting the [`FormatDriver`](crate::render_pipeline::FormatDriver) that encodes a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKey {
    /// GeoTIFF
    GTiff,
    /// Erdas Imagine
    Hfa,
}

impl DriverKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKey::GTiff => "GTiff",
            DriverKey::Hfa => "HFA",
        }
    }
}

impl fmt::Display for DriverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An output format a render call can target.
///
/// Archive formats carry the single-file format they bundle, so the pairing is
/// fixed at definition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetFormat {
    name: &'static str,
    extension: &'static str,
    driver: DriverKey,
    media_type: &'static str,
    bundles: Option<&'static TargetFormat>,
}

const ARCHIVE_SUFFIX: &str = "zip";

impl TargetFormat {
    pub const GEOTIFF: TargetFormat = TargetFormat {
        name: "tif",
        extension: "tif",
        driver: DriverKey::GTiff,
        media_type: "image/tiff",
        bundles: None,
    };

    pub const HFA: TargetFormat = TargetFormat {
        name: "img",
        extension: "img",
        driver: DriverKey::Hfa,
        media_type: "application/octet-stream",
        bundles: None,
    };

    pub const GEOTIFF_ZIP: TargetFormat = TargetFormat {
        name: "tif.zip",
        extension: "tif",
        driver: DriverKey::GTiff,
        media_type: "application/zip",
        bundles: Some(&TargetFormat::GEOTIFF),
    };

    pub const HFA_ZIP: TargetFormat = TargetFormat {
        name: "img.zip",
        extension: "img",
        driver: DriverKey::Hfa,
        media_type: "application/zip",
        bundles: Some(&TargetFormat::HFA),
    };

    pub const ALL: [TargetFormat; 4] = [
        TargetFormat::GEOTIFF,
        TargetFormat::HFA,
        TargetFormat::GEOTIFF_ZIP,
        TargetFormat::HFA_ZIP,
    ];

    /// Looks a format up by its request name (`tif`, `img.zip`, ...).
    pub fn from_name(name: &str) -> Result<TargetFormat, RenderError> {
        let name = name.trim().trim_start_matches('.');
        Self::ALL
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| RenderError::UnsupportedFormat(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Extension of the raster files this format produces, without a leading dot.
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn driver(&self) -> DriverKey {
        self.driver
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    pub fn is_archive(&self) -> bool {
        self.bundles.is_some()
    }

    pub fn archive_suffix(&self) -> Option<&'static str> {
        self.bundles.map(|_| ARCHIVE_SUFFIX)
    }

    /// The format each asset is converted to: the bundled format for archives,
    /// `self` otherwise.
    pub fn single_file(&self) -> TargetFormat {
        self.bundles.copied().unwrap_or(*self)
    }

    /// `<stem>.<name>`, e.g. `dem.tif` or `data.tif.zip`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.name)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl FromStr for TargetFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetFormat::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_formats_bundle_single_file_formats() {
        for format in TargetFormat::ALL {
            let single = format.single_file();
            assert!(!single.is_archive());
            assert_eq!(single.extension(), format.extension());
            assert_eq!(single.driver(), format.driver());
            assert_eq!(format.archive_suffix().is_some(), format.is_archive());
        }
        assert_eq!(TargetFormat::GEOTIFF_ZIP.single_file(), TargetFormat::GEOTIFF);
        assert_eq!(TargetFormat::HFA.single_file(), TargetFormat::HFA);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(TargetFormat::from_name("TIF.ZIP").unwrap(), TargetFormat::GEOTIFF_ZIP);
        assert_eq!(".img".parse::<TargetFormat>().unwrap(), TargetFormat::HFA);
        assert!(matches!(
            TargetFormat::from_name("png"),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(TargetFormat::GEOTIFF.file_name("dem"), "dem.tif");
        assert_eq!(TargetFormat::HFA_ZIP.file_name("data"), "data.img.zip");
    }
}
