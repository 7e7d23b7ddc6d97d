use tracing::{debug, info, instrument};

use crate::render_pipeline::{
    common::error::{RenderError, Result},
    common::types::{AssetDescriptor, RenderedBuffer},
    conversions::passthrough::PassthroughDecision,
    format::{RenderConfig, TargetFormat},
    geometry::GeometrySpec,
    raster::{RasterCodec, TiffRasterCodec},
};

/// Per-asset conversion step driven by [`RenderOrchestrator`](super::RenderOrchestrator).
pub trait AssetConverter {
    fn convert(
        &self,
        asset: &AssetDescriptor,
        target: &TargetFormat,
        geometry: Option<&GeometrySpec>,
    ) -> Result<RenderedBuffer>;
}

/// Converts one asset: passthrough when possible, else open, clip, and encode.
pub struct RasterConverter<C: RasterCodec> {
    codec: C,
}

impl RasterConverter<TiffRasterCodec> {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            codec: TiffRasterCodec::new(config),
        }
    }
}

impl<C: RasterCodec> RasterConverter<C> {
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn reencode(
        &self,
        asset: &AssetDescriptor,
        target: &TargetFormat,
        geometry: Option<&GeometrySpec>,
    ) -> Result<Vec<u8>> {
        if !self.codec.supports(target) {
            return Err(RenderError::UnsupportedFormat(format!(
                "no {} driver for {}",
                target.driver(),
                target
            )));
        }

        let source = {
            let _span = tracing::info_span!("open_raster").entered();
            self.codec.open(&asset.source_path)?
        };

        let clipped = match geometry {
            Some(geometry) => {
                let _span = tracing::info_span!("clip_raster").entered();
                Some(self.codec.clip(&source, geometry)?)
            }
            None => None,
        };

        let _span = tracing::info_span!("encode_raster", driver = %target.driver()).entered();
        self.codec.encode(clipped.as_ref().unwrap_or(&source), target)
    }
}

impl<C: RasterCodec> AssetConverter for RasterConverter<C> {
    #[instrument(skip_all, fields(asset = %asset.source_path.display(), target = %target))]
    fn convert(
        &self,
        asset: &AssetDescriptor,
        target: &TargetFormat,
        geometry: Option<&GeometrySpec>,
    ) -> Result<RenderedBuffer> {
        let decision = PassthroughDecision::decide(
            asset.extension().unwrap_or_default(),
            target.extension(),
            geometry.is_some(),
        );
        debug!(?decision, "Passthrough decision");

        match decision {
            PassthroughDecision::Passthrough => {
                // Existence check only; the stored bytes are never decoded.
                let meta = std::fs::metadata(&asset.source_path).map_err(|e| {
                    RenderError::AssetNotFound(format!("{}: {}", asset.source_path.display(), e))
                })?;
                if !meta.is_file() {
                    return Err(RenderError::AssetNotFound(format!(
                        "{} is not a file",
                        asset.source_path.display()
                    )));
                }
                Ok(RenderedBuffer::from_path(&asset.source_path))
            }
            PassthroughDecision::Convert => {
                let bytes = self.reencode(asset, target, geometry)?;
                info!(bytes = bytes.len(), clipped = geometry.is_some(), "Converted raster");
                Ok(RenderedBuffer::in_memory(bytes))
            }
        }
    }
}
