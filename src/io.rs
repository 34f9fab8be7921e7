//! Random-access byte I/O over archive files, plus the small set of pure
//! numeric decoders every other component leans on.
//!
//! Ranged reads are the only suspension point below the archive layer
//! (§5). Each `RandomAccessFile` wraps a single open `std::fs::File` behind
//! an `Arc` and issues reads through `spawn_blocking` using the platform's
//! positional-read call, mirroring the teacher's pattern of pushing
//! synchronous I/O into a blocking task rather than holding a lock across an
//! `.await`. Positional reads don't mutate the file's cursor, so concurrent
//! reads on the same handle need no synchronization (§5's shared-resource
//! policy).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{ArchiveError, Result};

/// One archive file, opened once and read by byte range from then on.
#[derive(Clone, Debug)]
pub struct RandomAccessFile {
    path: PathBuf,
    file: Arc<std::fs::File>,
    size: u64,
}

impl RandomAccessFile {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let p = path.clone();
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&p).map_err(|e| ArchiveError::io(&p, e))?;
            let size = file.metadata().map_err(|e| ArchiveError::io(&p, e))?.len();
            Ok((file, size))
        })
        .await
        .expect("blocking open task panicked")
        .map(|(file, size)| RandomAccessFile {
            path,
            file: Arc::new(file),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.size
    }

    /// Read `length` bytes starting at `offset`. Fails with `Truncated` if
    /// the requested range runs past the end of the file rather than
    /// silently returning a short read.
    pub async fn read(&self, offset: u64, length: u64) -> Result<Bytes> {
        if offset.saturating_add(length) > self.size {
            return Err(ArchiveError::Truncated {
                path: self.path.clone(),
                offset,
                length,
                size: self.size,
            });
        }

        let file = Arc::clone(&self.file);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; length as usize];
            read_exact_at(&file, &mut buf, offset).map_err(|e| ArchiveError::io(&path, e))?;
            Ok(Bytes::from(buf))
        })
        .await
        .expect("blocking read task panicked")
    }

    /// Read up to `length` bytes starting at `offset`, clamped to the file's
    /// actual size instead of failing. Used for the spatial search's
    /// speculative quadtree-node reads and other call sites that
    /// deliberately ask for more than they need.
    pub async fn read_clamped(&self, offset: u64, length: u64) -> Result<Bytes> {
        if offset >= self.size {
            return Ok(Bytes::new());
        }
        let actual = length.min(self.size - offset);
        self.read(offset, actual).await
    }
}

#[cfg(unix)]
fn read_exact_at(file: &std::fs::File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &std::fs::File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Decode a little-endian `u16` from the first two bytes of `b`.
pub fn u16le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

/// Decode a little-endian `u32` from the first four bytes of `b`.
pub fn u32le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Decode a little-endian `f32` from the first four bytes of `b`.
pub fn f32le(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Lowercase hex encoding, used for math-image content hashes.
pub fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Strip a `?query` and/or `#fragment` suffix from a URL-shaped string, the
/// way the hosting application's resource shim normalizes article titles
/// pulled out of an href before handing them to a title lookup.
pub fn strip_url_query_and_fragment(s: &str) -> &str {
    let s = match s.find('?') {
        Some(i) => &s[..i],
        None => s,
    };
    match s.find('#') {
        Some(i) => &s[..i],
        None => s,
    }
}
