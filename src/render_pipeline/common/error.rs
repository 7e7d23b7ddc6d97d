use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Asset not found or unreadable: {0}")]
    AssetNotFound(String),

    #[error("Invalid clip geometry: {0}")]
    Geometry(String),

    #[error("Clip geometry does not intersect raster extent of {}", .0.display())]
    ClipEmpty(PathBuf),

    #[error("Unsupported target format: {0}")]
    UnsupportedFormat(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Duplicate archive entry name: {0}")]
    DuplicateEntryName(String),

    #[error("Failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless discriminant of [`RenderError`], for mapping failures to client responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AssetNotFound,
    Geometry,
    ClipEmpty,
    UnsupportedFormat,
    Codec,
    DuplicateEntryName,
    Io,
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::AssetNotFound(_) => ErrorKind::AssetNotFound,
            RenderError::Geometry(_) => ErrorKind::Geometry,
            RenderError::ClipEmpty(_) => ErrorKind::ClipEmpty,
            RenderError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            RenderError::Codec(_) => ErrorKind::Codec,
            RenderError::DuplicateEntryName(_) => ErrorKind::DuplicateEntryName,
            RenderError::Archive(_) | RenderError::Io(_) => ErrorKind::Io,
        }
    }

    /// True when the failure was caused by caller input rather than by the
    /// stored assets or the environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Geometry
                | ErrorKind::ClipEmpty
                | ErrorKind::UnsupportedFormat
                | ErrorKind::DuplicateEntryName
        )
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
