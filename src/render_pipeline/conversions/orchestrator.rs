use tracing::{debug, info, instrument};

use crate::render_pipeline::{
    archive::{ArchiveAssembler, ArchiveEntry},
    common::error::{RenderError, Result},
    common::timing::{RenderTimings, Timer},
    common::types::{AssetDescriptor, RenderedBuffer},
    conversions::raster_converter::{AssetConverter, RasterConverter},
    format::{RenderConfig, TargetFormat},
    geometry::GeometrySpec,
    raster::TiffRasterCodec,
};

/// Rendered bytes plus the response metadata the caller surfaces.
#[derive(Debug)]
pub struct RenderOutput {
    pub buffer: RenderedBuffer,
    /// Suggested download filename
    pub filename: String,
    pub media_type: &'static str,
}

impl RenderOutput {
    pub fn len(&self) -> Result<u64> {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.buffer.is_empty()
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.filename)
    }
}

/// Entry point of the render pipeline.
///
/// Coordinates conversion and archive assembly only; all file and codec access
/// goes through the [`AssetConverter`].
pub struct RenderOrchestrator<V: AssetConverter> {
    converter: V,
    assembler: ArchiveAssembler,
    config: RenderConfig,
}

impl RenderOrchestrator<RasterConverter<TiffRasterCodec>> {
    pub fn new(config: RenderConfig) -> Self {
        Self::with_converter(RasterConverter::new(&config), config)
    }
}

impl<V: AssetConverter> RenderOrchestrator<V> {
    pub fn with_converter(converter: V, config: RenderConfig) -> Self {
        Self {
            converter,
            assembler: ArchiveAssembler::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn converter(&self) -> &V {
        &self.converter
    }

    /// Renders a batch of assets.
    ///
    /// Single-file targets convert and return only the first item. Archive targets
    /// convert every item, in order, to the bundled single-file format and zip them
    /// under `<archive_dir>/`. Any failure aborts the whole batch.
    pub fn render(
        &self,
        items: &[AssetDescriptor],
        target: &TargetFormat,
        geometry: Option<&GeometrySpec>,
    ) -> Result<RenderOutput> {
        let mut timings = RenderTimings::new();
        self.render_timed(items, target, geometry, &mut timings)
    }

    /// Convenience wrapper treating one asset as a one-item batch.
    pub fn render_one(
        &self,
        item: &AssetDescriptor,
        target: &TargetFormat,
        geometry: Option<&GeometrySpec>,
    ) -> Result<RenderOutput> {
        self.render(std::slice::from_ref(item), target, geometry)
    }

    pub fn render_with_timings(
        &self,
        items: &[AssetDescriptor],
        target: &TargetFormat,
        geometry: Option<&GeometrySpec>,
    ) -> Result<(RenderOutput, RenderTimings)> {
        let mut timings = RenderTimings::new();
        let output = self.render_timed(items, target, geometry, &mut timings)?;
        timings.log_summary();
        Ok((output, timings))
    }

    #[instrument(skip_all, fields(items = items.len(), target = %target, clipped = geometry.is_some()))]
    fn render_timed(
        &self,
        items: &[AssetDescriptor],
        target: &TargetFormat,
        geometry: Option<&GeometrySpec>,
        timings: &mut RenderTimings,
    ) -> Result<RenderOutput> {
        let first = items
            .first()
            .ok_or_else(|| RenderError::AssetNotFound("empty batch".to_string()))?;

        if !target.is_archive() {
            if items.len() > 1 {
                debug!(skipped = items.len() - 1, "Single-file target renders the first item only");
            }
            let timer = Timer::start("convert");
            let buffer = self.converter.convert(first, target, geometry)?;
            timings.record(timer);

            return Ok(RenderOutput {
                buffer,
                filename: target.file_name(&first.logical_name),
                media_type: target.media_type(),
            });
        }

        let single = target.single_file();
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let timer = Timer::start("convert");
            let buffer = self.converter.convert(item, &single, geometry)?;
            timings.record(timer);
            entries.push(ArchiveEntry::new(single.file_name(&item.logical_name), buffer));
        }

        let timer = Timer::start("assemble");
        let buffer = self.assembler.assemble(&entries, &self.config.archive_dir)?;
        timings.record(timer);

        info!(entries = entries.len(), "Rendered archive");
        let stem = match self.config.archive_dir.trim_matches('/') {
            "" => "data",
            dir => dir,
        };
        Ok(RenderOutput {
            buffer,
            filename: target.file_name(stem),
            media_type: target.media_type(),
        })
    }
}
