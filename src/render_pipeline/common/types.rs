//! Asset and rendered buffer types

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::render_pipeline::common::error::{RenderError, Result};

/// One stored raster, as handed to the pipeline by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Location of the stored raster file
    pub source_path: PathBuf,
    /// Name used for response filenames and archive entries (no extension)
    pub logical_name: String,
}

impl AssetDescriptor {
    pub fn new(source_path: impl Into<PathBuf>, logical_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            logical_name: logical_name.into(),
        }
    }

    /// Descriptor whose logical name is the file stem of `source_path`.
    pub fn from_path(source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let logical_name = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source_path,
            logical_name,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        self.source_path.extension().and_then(|e| e.to_str())
    }
}

/// Where the bytes of a [`RenderedBuffer`] live.
#[derive(Debug)]
pub enum BufferOrigin {
    /// Stored file returned untouched; read lazily by the consumer.
    FilePath(PathBuf),
    /// Freshly encoded bytes.
    InMemory(Vec<u8>),
    /// Anonymous temporary file, removed by the OS once dropped.
    TempFile(File),
}

/// Output of one conversion or archive assembly.
#[derive(Debug)]
pub struct RenderedBuffer {
    origin: BufferOrigin,
    // Known up front for everything except stored files.
    len: Option<u64>,
}

impl RenderedBuffer {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: BufferOrigin::FilePath(path.into()),
            len: None,
        }
    }

    pub fn in_memory(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self {
            origin: BufferOrigin::InMemory(bytes),
            len: Some(len),
        }
    }

    pub(crate) fn temp_file(file: File, len: u64) -> Self {
        Self {
            origin: BufferOrigin::TempFile(file),
            len: Some(len),
        }
    }

    pub fn origin(&self) -> &BufferOrigin {
        &self.origin
    }

    /// Path of the stored file when the buffer is a passthrough.
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            BufferOrigin::FilePath(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.origin, BufferOrigin::FilePath(_))
    }

    /// Byte length of the buffer, without reading its contents.
    pub fn len(&self) -> Result<u64> {
        match (&self.origin, self.len) {
            (_, Some(len)) => Ok(len),
            (BufferOrigin::FilePath(path), None) => std::fs::metadata(path)
                .map(|m| m.len())
                .map_err(|e| not_found(path, e)),
            (BufferOrigin::InMemory(bytes), None) => Ok(bytes.len() as u64),
            (BufferOrigin::TempFile(file), None) => Ok(file.metadata()?.len()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Opens a reader positioned at the start of the buffer.
    pub fn reader(&self) -> Result<Box<dyn Read + '_>> {
        match &self.origin {
            BufferOrigin::FilePath(path) => {
                let file = File::open(path).map_err(|e| not_found(path, e))?;
                Ok(Box::new(file))
            }
            BufferOrigin::InMemory(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            BufferOrigin::TempFile(file) => {
                let mut handle = file.try_clone()?;
                handle.seek(SeekFrom::Start(0))?;
                Ok(Box::new(handle))
            }
        }
    }

    /// Consumes the buffer, returning its full contents.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self.origin {
            BufferOrigin::FilePath(path) => std::fs::read(&path).map_err(|e| not_found(&path, e)),
            BufferOrigin::InMemory(bytes) => Ok(bytes),
            BufferOrigin::TempFile(mut file) => {
                file.seek(SeekFrom::Start(0))?;
                let mut bytes = Vec::with_capacity(self.len.unwrap_or(0) as usize);
                file.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

fn not_found(path: &Path, err: std::io::Error) -> RenderError {
    RenderError::AssetNotFound(format!("{}: {}", path.display(), err))
}
