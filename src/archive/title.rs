//! Title index: the sorted, newline-terminated record file and the binary
//! probe that answers both exact and prefix lookups (§4.5).
//!
//! Record layout (on-disk, not separately specified by the distilled
//! format beyond the redirect payload — see DESIGN.md for the resolution):
//! a 16-byte fixed header shared between ordinary title records and
//! redirect target payloads (§9's "redirect entries share a field layout
//! with titles" note, taken literally): `[0]` flag bits (bit 0 = redirect,
//! bit 1 = has inline geolocation), `[1]` reserved, `[2]` file number,
//! `[3..=6]` block start (u32 LE), `[7..=10]` block offset (u32 LE),
//! `[11..=14]` article length (u32 LE), `[15]` reserved. For an ordinary
//! article record, the header is optionally followed by 8 bytes of
//! geolocation (latitude then longitude, matching the quadtree's own
//! on-disk order — see `crate::archive::spatial`), then the UTF-8 name,
//! then a single LF. For a redirect record the header's block-start field
//! is instead the byte offset *within the title file* of a 16-byte target
//! descriptor using the same field layout, per spec.

use crate::error::{ArchiveError, Result};
use crate::geometry::Point;
use crate::io::RandomAccessFile;

/// Bounds how far a single record decode will scan looking for the
/// terminating LF before concluding the archive is corrupt.
const MAX_TITLE_LENGTH: usize = 512;

const FLAG_REDIRECT: u8 = 0b01;
const FLAG_HAS_GEO: u8 = 0b10;

const HEADER_LEN: usize = 16;
const GEO_LEN: usize = 8;

/// One title-index entry. Tagged per §9's redesign flag instead of
/// conflating article and redirect fields in a single flat struct.
#[derive(Debug, Clone, PartialEq)]
pub enum Title {
    Article {
        name: String,
        file_nr: u32,
        block_start: u64,
        block_offset: u32,
        article_length: u32,
        geolocation: Option<Point>,
        title_offset: u64,
    },
    Redirect {
        name: String,
        /// Offset within the title file of the 16-byte target descriptor.
        target_descriptor_offset: u64,
        title_offset: u64,
    },
}

impl Title {
    pub fn name(&self) -> &str {
        match self {
            Title::Article { name, .. } => name,
            Title::Redirect { name, .. } => name,
        }
    }

    pub fn title_offset(&self) -> u64 {
        match self {
            Title::Article { title_offset, .. } => *title_offset,
            Title::Redirect { title_offset, .. } => *title_offset,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Title::Redirect { .. })
    }
}

struct RawHeader {
    file_nr: u32,
    block_start: u64,
    block_offset: u32,
    article_length: u32,
}

fn parse_header(b: &[u8]) -> RawHeader {
    RawHeader {
        file_nr: b[2] as u32,
        block_start: crate::io::u32le(&b[3..7]) as u64,
        block_offset: crate::io::u32le(&b[7..11]),
        article_length: crate::io::u32le(&b[11..15]),
    }
}

/// Decode one record starting at `offset`, returning the title and the
/// number of bytes consumed (including the terminating LF). `offset` must
/// be a valid record boundary; behavior is undefined otherwise (§4.5).
/// Returns `Ok(None)` at end of index.
pub async fn decode_record_at(
    file: &RandomAccessFile,
    offset: u64,
) -> Result<Option<(Title, u64)>> {
    if offset >= file.file_size() {
        return Ok(None);
    }

    let window = (MAX_TITLE_LENGTH as u64).min(file.file_size() - offset);
    let buf = file.read(offset, window).await?;

    let lf = buf.iter().position(|&b| b == b'\n').ok_or_else(|| {
        ArchiveError::InvalidArchive(format!(
            "no LF terminator found within {MAX_TITLE_LENGTH} bytes of title record at offset {offset}"
        ))
    })?;

    let record = &buf[..lf];
    if record.len() < HEADER_LEN {
        return Err(ArchiveError::InvalidArchive(format!(
            "title record at offset {offset} shorter than fixed header"
        )));
    }

    let flags = record[0];
    let header = parse_header(record);
    let mut cursor = HEADER_LEN;

    let title = if flags & FLAG_REDIRECT != 0 {
        let name = String::from_utf8_lossy(&record[cursor..]).into_owned();
        Title::Redirect {
            name,
            target_descriptor_offset: header.block_start,
            title_offset: offset,
        }
    } else {
        let geolocation = if flags & FLAG_HAS_GEO != 0 {
            if record.len() < cursor + GEO_LEN {
                return Err(ArchiveError::InvalidArchive(format!(
                    "title record at offset {offset} missing geolocation bytes"
                )));
            }
            let lat = crate::io::f32le(&record[cursor..cursor + 4]) as f64;
            let lon = crate::io::f32le(&record[cursor + 4..cursor + 8]) as f64;
            cursor += GEO_LEN;
            Some(Point::new(lon, lat))
        } else {
            None
        };

        let name = String::from_utf8_lossy(&record[cursor..]).into_owned();
        Title::Article {
            name,
            file_nr: header.file_nr,
            block_start: header.block_start,
            block_offset: header.block_offset,
            article_length: header.article_length,
            geolocation,
            title_offset: offset,
        }
    };

    Ok(Some((title, (lf + 1) as u64)))
}

/// Advance from `offset`, returning the decoded title and the offset of the
/// next record (or `file_size()` at end of index). Mirrors the source's
/// `sequentialFrom(offset).advance()`.
pub async fn sequential_from(file: &RandomAccessFile, offset: u64) -> Result<Option<Title>> {
    Ok(decode_record_at(file, offset).await?.map(|(t, _)| t))
}

/// Resolve a redirect in place, producing the equivalent `Article` variant
/// with the target's pointers. A no-op (returns a clone) when `title` is
/// already an article, matching §8's round-trip law.
pub async fn resolve_redirect(file: &RandomAccessFile, title: &Title) -> Result<Title> {
    match title {
        Title::Article { .. } => Ok(title.clone()),
        Title::Redirect {
            name,
            target_descriptor_offset,
            title_offset,
        } => {
            let bytes = file.read(*target_descriptor_offset, HEADER_LEN as u64).await?;
            let header = parse_header(&bytes);
            Ok(Title::Article {
                name: name.clone(),
                file_nr: header.file_nr,
                block_start: header.block_start,
                block_offset: header.block_offset,
                article_length: header.article_length,
                geolocation: None,
                title_offset: *title_offset,
            })
        }
    }
}

/// Scan forward from `pos` to the start of the next record: the offset of
/// the first byte after the next LF at or after `pos`, or `file_size()` if
/// none remains. Used by the binary probe to realign an arbitrary midpoint
/// onto a record boundary (§4.5).
async fn snap_forward(file: &RandomAccessFile, pos: u64) -> Result<u64> {
    let size = file.file_size();
    if pos >= size {
        return Ok(size);
    }

    const SCAN_CHUNK: u64 = 4096;
    let mut cursor = pos;
    loop {
        let window = SCAN_CHUNK.min(size - cursor);
        if window == 0 {
            return Ok(size);
        }
        let buf = file.read(cursor, window).await?;
        if let Some(i) = buf.iter().position(|&b| b == b'\n') {
            return Ok(cursor + i as u64 + 1);
        }
        cursor += window;
    }
}

/// Find the offset of the first record whose normalized name is `>=`
/// `normalized_probe`. Always implemented via binary search over the raw
/// title file: `titles_search.idx`'s format is opaque to this crate (§4.5,
/// §6 — "format defined by the existing iterator collaborator"), so its
/// presence only proves the archive's title file is sorted consistently
/// with it, it is never parsed directly. See DESIGN.md.
pub async fn find_prefix_offset(
    file: &RandomAccessFile,
    normalize: &impl Fn(&str) -> String,
    normalized_probe: &str,
) -> Result<u64> {
    let mut lo: u64 = 0;
    let mut hi: u64 = file.file_size();

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let snapped = if mid == lo { lo } else { snap_forward(file, mid).await? };

        if snapped >= hi {
            hi = mid;
            continue;
        }

        match decode_record_at(file, snapped).await? {
            None => {
                hi = snapped;
            }
            Some((title, consumed)) => {
                let key = normalize(title.name());
                if key.as_str() < normalized_probe {
                    lo = snapped + consumed;
                } else {
                    hi = snapped;
                }
            }
        }
    }

    Ok(lo)
}

/// Exact lookup: `findPrefixOffset` then scan while the normalized name
/// still matches, returning the first whose raw name equals `name`.
pub async fn get_title_by_name(
    file: &RandomAccessFile,
    normalize: impl Fn(&str) -> String,
    name: &str,
) -> Result<Option<Title>> {
    let key = normalize(name);
    let mut offset = find_prefix_offset(file, &normalize, &key).await?;

    loop {
        let Some((title, consumed)) = decode_record_at(file, offset).await? else {
            return Ok(None);
        };
        if normalize(title.name()) != key {
            return Ok(None);
        }
        if title.name() == name {
            return Ok(Some(title));
        }
        offset += consumed;
    }
}

/// Prefix lookup: collect up to `max_size` titles whose normalized name
/// starts with the normalized prefix, in on-disk order.
pub async fn find_titles_with_prefix(
    file: &RandomAccessFile,
    normalize: impl Fn(&str) -> String,
    prefix: &str,
    max_size: usize,
) -> Result<Vec<Title>> {
    let key = normalize(prefix);
    let mut offset = find_prefix_offset(file, &normalize, &key).await?;
    let mut out = Vec::new();

    while out.len() < max_size {
        let Some((title, consumed)) = decode_record_at(file, offset).await? else {
            break;
        };
        if !normalize(title.name()).starts_with(&key) {
            break;
        }
        out.push(title);
        offset += consumed;
    }

    Ok(out)
}

/// Read `count` consecutive titles starting at a known record boundary.
pub async fn get_titles_starting_at_offset(
    file: &RandomAccessFile,
    offset: u64,
    count: usize,
) -> Result<Vec<Title>> {
    let mut out = Vec::new();
    let mut cursor = offset;
    while out.len() < count {
        let Some((title, consumed)) = decode_record_at(file, cursor).await? else {
            break;
        };
        out.push(title);
        cursor += consumed;
    }
    Ok(out)
}

/// Pick a uniformly random byte offset in the file, scan forward to the
/// next record boundary, and decode it (§4.5).
pub async fn random_title(file: &RandomAccessFile, random_offset: u64) -> Result<Title> {
    let size = file.file_size();
    if size == 0 {
        return Err(ArchiveError::NotFound("title index is empty".to_string()));
    }
    let start = random_offset % size;
    let boundary = snap_forward(file, start).await?;
    let boundary = if boundary >= size { 0 } else { boundary };
    decode_record_at(file, boundary)
        .await?
        .map(|(t, _)| t)
        .ok_or_else(|| ArchiveError::NotFound("title index is empty".to_string()))
}
