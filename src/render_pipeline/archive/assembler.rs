use std::collections::HashSet;
use std::io::{Cursor, Seek, Write};

use tracing::{debug, info, instrument};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::render_pipeline::{
    common::error::{RenderError, Result},
    common::types::{BufferOrigin, RenderedBuffer},
    format::{ArchiveCompression, RenderConfig},
};

/// One named member of an archive; `name` is relative to the container directory.
#[derive(Debug)]
pub struct ArchiveEntry {
    pub name: String,
    pub buffer: RenderedBuffer,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, buffer: RenderedBuffer) -> Self {
        Self {
            name: name.into(),
            buffer,
        }
    }
}

/// Writes [`ArchiveEntry`] lists into zip archives.
#[derive(Debug, Clone)]
pub struct ArchiveAssembler {
    compression: ArchiveCompression,
    spool_to_disk: bool,
}

impl ArchiveAssembler {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            compression: config.archive_compression,
            spool_to_disk: config.spool_archive_to_disk,
        }
    }

    /// Assembles `entries`, in order, into one archive buffer.
    ///
    /// Every entry is stored under `<container_name>/`, or at the archive root when
    /// `container_name` is empty. Full names are checked for duplicates before anything is written. Path-backed
    /// entries are streamed from disk; in-memory ones are written directly. When
    /// spooling to disk the archive lives in an anonymous temporary file that is
    /// removed as soon as the returned buffer (or an error) drops it.
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn assemble(&self, entries: &[ArchiveEntry], container_name: &str) -> Result<RenderedBuffer> {
        let names: Vec<String> = entries
            .iter()
            .map(|entry| entry_path(container_name, &entry.name))
            .collect();
        check_unique_names(&names)?;

        let buffer = if self.spool_to_disk {
            let mut file = self.write_entries(tempfile::tempfile()?, entries, &names)?;
            let len = file.stream_position()?;
            RenderedBuffer::temp_file(file, len)
        } else {
            let cursor = self.write_entries(Cursor::new(Vec::new()), entries, &names)?;
            RenderedBuffer::in_memory(cursor.into_inner())
        };

        info!(bytes = buffer.len()?, "Assembled archive");
        Ok(buffer)
    }

    fn write_entries<W: Write + Seek>(
        &self,
        writer: W,
        entries: &[ArchiveEntry],
        names: &[String],
    ) -> Result<W> {
        let method = match self.compression {
            ArchiveCompression::Stored => CompressionMethod::Stored,
            ArchiveCompression::Deflated => CompressionMethod::Deflated,
        };

        let mut zip = ZipWriter::new(writer);
        for (entry, name) in entries.iter().zip(names) {
            let len = entry.buffer.len()?;
            let options = SimpleFileOptions::default()
                .compression_method(method)
                .large_file(len >= u32::MAX as u64);
            zip.start_file(name.as_str(), options)?;

            match entry.buffer.origin() {
                BufferOrigin::InMemory(bytes) => zip.write_all(bytes)?,
                BufferOrigin::FilePath(_) | BufferOrigin::TempFile(_) => {
                    let mut reader = entry.buffer.reader()?;
                    std::io::copy(&mut reader, &mut zip)?;
                }
            }
            debug!(name = %name, bytes = len, "Wrote archive entry");
        }
        Ok(zip.finish()?)
    }
}

fn entry_path(container_name: &str, name: &str) -> String {
    let container = container_name.trim_matches('/');
    if container.is_empty() {
        name.to_string()
    } else {
        format!("{container}/{name}")
    }
}

fn check_unique_names(names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(RenderError::DuplicateEntryName(name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_entries_keep_input_order() {
        let assembler = ArchiveAssembler::new(&RenderConfig::default());
        let entries = vec![
            ArchiveEntry::new("a.tif", RenderedBuffer::in_memory(b"AAAA".to_vec())),
            ArchiveEntry::new("b.tif", RenderedBuffer::in_memory(b"BB".to_vec())),
        ];

        let archive = assembler.assemble(&entries, "data").unwrap();
        assert_eq!(
            entry_names(archive.into_bytes().unwrap()),
            vec!["data/a.tif", "data/b.tif"]
        );
    }

    #[test]
    fn test_container_name_sets_entry_directory() {
        let assembler = ArchiveAssembler::new(&RenderConfig::default());
        let entries = || vec![ArchiveEntry::new("a.tif", RenderedBuffer::in_memory(vec![1]))];

        let nested = assembler.assemble(&entries(), "scenes/").unwrap();
        assert_eq!(entry_names(nested.into_bytes().unwrap()), vec!["scenes/a.tif"]);

        let flat = assembler.assemble(&entries(), "").unwrap();
        assert_eq!(entry_names(flat.into_bytes().unwrap()), vec!["a.tif"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let assembler = ArchiveAssembler::new(&RenderConfig::default());
        let entries = vec![
            ArchiveEntry::new("a.tif", RenderedBuffer::in_memory(vec![1])),
            ArchiveEntry::new("b.tif", RenderedBuffer::in_memory(vec![2])),
            ArchiveEntry::new("a.tif", RenderedBuffer::in_memory(vec![3])),
        ];

        let err = assembler.assemble(&entries, "data").unwrap_err();
        assert!(matches!(err, RenderError::DuplicateEntryName(name) if name == "data/a.tif"));
    }

    #[test]
    fn test_path_entries_are_streamed_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let stored = dir.path().join("stored.tif");
        std::fs::write(&stored, b"stored raster bytes").unwrap();

        let config = RenderConfig::builder()
            .archive_compression(ArchiveCompression::Stored)
            .spool_archive_to_disk(false)
            .build();
        let entries = vec![
            ArchiveEntry::new("stored.tif", RenderedBuffer::from_path(&stored)),
            ArchiveEntry::new("fresh.tif", RenderedBuffer::in_memory(b"fresh".to_vec())),
        ];
        let archive = ArchiveAssembler::new(&config).assemble(&entries, "data").unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.into_bytes().unwrap())).unwrap();
        let mut contents = String::new();
        zip.by_name("data/stored.tif")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "stored raster bytes");
    }

    #[test]
    fn test_reported_length_matches_bytes() {
        for spool in [true, false] {
            let config = RenderConfig::builder().spool_archive_to_disk(spool).build();
            let entries = vec![ArchiveEntry::new(
                "a.tif",
                RenderedBuffer::in_memory(vec![42u8; 4096]),
            )];

            let archive = ArchiveAssembler::new(&config).assemble(&entries, "data").unwrap();
            let reported = archive.len().unwrap();
            assert_eq!(reported, archive.into_bytes().unwrap().len() as u64);
        }
    }

    #[test]
    fn test_missing_stored_file_fails_the_archive() {
        let entries = vec![ArchiveEntry::new(
            "gone.tif",
            RenderedBuffer::from_path("/nonexistent/gone.tif"),
        )];
        let err = ArchiveAssembler::new(&RenderConfig::default())
            .assemble(&entries, "data")
            .unwrap_err();
        assert!(matches!(err, RenderError::AssetNotFound(_)));
    }
}
