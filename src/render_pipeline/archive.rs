//! Archive assembly module
//!
//! Bundles converted rasters into a single zip container.

mod assembler;

pub use assembler::{ArchiveAssembler, ArchiveEntry};
