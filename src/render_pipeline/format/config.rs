//! Render configuration types

/// Compression used by the GeoTIFF driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression, balanced level
    Deflate,
}

/// Compression method for archive entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveCompression {
    /// Entries are stored as-is
    Stored,
    /// Entries are deflated
    Deflated,
}

/// Configuration passed to the orchestrator at construction
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Archive container name; also the directory every archive entry is placed under
    pub archive_dir: String,
    /// Compression applied to archive entries
    pub archive_compression: ArchiveCompression,
    /// Compression used when encoding GeoTIFF output
    pub tiff_compression: TiffCompression,
    /// Value written to clipped pixels outside the clip polygon
    pub clip_fill: f64,
    /// Assemble archives in an anonymous temporary file instead of memory
    pub spool_archive_to_disk: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            archive_dir: "data".to_string(),
            archive_compression: ArchiveCompression::Deflated,
            tiff_compression: TiffCompression::None,
            clip_fill: 0.0,
            spool_archive_to_disk: true,
        }
    }
}

impl RenderConfig {
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder::default()
    }
}

/// Builder for RenderConfig
#[derive(Default)]
pub struct RenderConfigBuilder {
    archive_dir: Option<String>,
    archive_compression: Option<ArchiveCompression>,
    tiff_compression: Option<TiffCompression>,
    clip_fill: Option<f64>,
    spool_archive_to_disk: Option<bool>,
}

impl RenderConfigBuilder {
    pub fn archive_dir(mut self, dir: impl Into<String>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn archive_compression(mut self, compression: ArchiveCompression) -> Self {
        self.archive_compression = Some(compression);
        self
    }

    pub fn tiff_compression(mut self, compression: TiffCompression) -> Self {
        self.tiff_compression = Some(compression);
        self
    }

    pub fn clip_fill(mut self, fill: f64) -> Self {
        self.clip_fill = Some(fill);
        self
    }

    pub fn spool_archive_to_disk(mut self, spool: bool) -> Self {
        self.spool_archive_to_disk = Some(spool);
        self
    }

    pub fn build(self) -> RenderConfig {
        let default = RenderConfig::default();
        RenderConfig {
            archive_dir: self.archive_dir.unwrap_or(default.archive_dir),
            archive_compression: self.archive_compression.unwrap_or(default.archive_compression),
            tiff_compression: self.tiff_compression.unwrap_or(default.tiff_compression),
            clip_fill: self.clip_fill.unwrap_or(default.clip_fill),
            spool_archive_to_disk: self
                .spool_archive_to_disk
                .unwrap_or(default.spool_archive_to_disk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = RenderConfig::builder()
            .archive_dir("rasters")
            .archive_compression(ArchiveCompression::Stored)
            .clip_fill(-9999.0)
            .build();

        assert_eq!(config.archive_dir, "rasters");
        assert_eq!(config.archive_compression, ArchiveCompression::Stored);
        assert_eq!(config.clip_fill, -9999.0);
        assert_eq!(config.tiff_compression, TiffCompression::None);
        assert!(config.spool_archive_to_disk);
    }
}
