/// Whether a stored asset can be returned byte-for-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughDecision {
    /// Stored bytes are returned verbatim, the codec is never touched.
    Passthrough,
    /// The asset must be decoded, optionally clipped, and re-encoded.
    Convert,
}

impl PassthroughDecision {
    /// Passthrough iff nothing is clipped and the stored extension already matches
    /// the target extension. The comparison is exact apart from leading dots, so
    /// `TIF` and `tiff` assets are re-encoded for a `tif` target.
    pub fn decide(asset_extension: &str, target_extension: &str, geometry_present: bool) -> Self {
        let asset_extension = asset_extension.trim_start_matches('.');
        let target_extension = target_extension.trim_start_matches('.');
        if !geometry_present
            && !asset_extension.is_empty()
            && asset_extension == target_extension
        {
            PassthroughDecision::Passthrough
        } else {
            PassthroughDecision::Convert
        }
    }
}
