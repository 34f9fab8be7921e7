//! Offline reader core for Evopedia encyclopedia archives: title lookup,
//! article decompression, geographic search, and math-image lookup over a
//! directory of archive files on local disk.

pub mod archive;
pub mod error;
pub mod geometry;
pub mod io;
pub mod normalize;

pub use archive::{Archive, Metadata, Title};
pub use error::{ArchiveError, Result};
