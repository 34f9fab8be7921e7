//! Archive descriptor: owns every file handle and dispatches the nine
//! public operations (§4.4, §6).

pub mod math;
pub mod reader;
pub mod spatial;
pub mod title;

pub use title::Title;

use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::sync::Mutex;

use crate::error::{ArchiveError, Result};
use crate::geometry::Rectangle;
use crate::io::RandomAccessFile;

/// Parsed `metadata.txt` (§4.4).
#[derive(Debug, Clone)]
pub struct Metadata {
    pub language: String,
    pub date: String,
    pub normalized_titles: bool,
}

impl Metadata {
    fn parse(text: &str) -> Result<Self> {
        let mut language = None;
        let mut date = None;
        let mut normalized_titles = true;

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "language" => language = Some(value.to_string()),
                "date" => date = Some(value.to_string()),
                "normalized_titles" => normalized_titles = value != "0",
                _ => {}
            }
        }

        Ok(Metadata {
            language: language
                .ok_or_else(|| ArchiveError::InvalidArchive("metadata.txt missing language".to_string()))?,
            date: date
                .ok_or_else(|| ArchiveError::InvalidArchive("metadata.txt missing date".to_string()))?,
            normalized_titles,
        })
    }
}

/// One self-contained encyclopedia snapshot. Fields are populated once
/// during construction and read-only afterward; file handles issue
/// independent ranged reads and need no lock (§5).
#[derive(Debug)]
pub struct Archive {
    title_index: RandomAccessFile,
    title_search_index: Option<RandomAccessFile>,
    data_shards: Vec<Option<RandomAccessFile>>,
    coord_shards: Vec<RandomAccessFile>,
    math_index: Option<RandomAccessFile>,
    math_data: Option<RandomAccessFile>,
    metadata: Metadata,
    search_guard: Mutex<()>,
}

impl Archive {
    /// An archive is ready iff the title file is present and at least one
    /// data shard is present (§3's invariant). Both constructors already
    /// enforce this, so a successfully built `Archive` is always ready;
    /// exposed anyway to match §6's `isReady()` interface.
    pub fn is_ready(&self) -> bool {
        self.title_index.file_size() > 0 && self.data_shards.iter().any(Option::is_some)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn normalize_fn(&self) -> impl Fn(&str) -> String {
        crate::normalize::normalize_fn(self.metadata.normalized_titles)
    }

    /// Build an archive from a flat list of file paths, classifying each by
    /// name (§4.4, "from a flat file list").
    pub async fn from_files(paths: &[PathBuf]) -> Result<Self> {
        let data_shard_re = Regex::new(r"^wikipedia_(\d\d)\.dat$").unwrap();
        let coord_shard_re = Regex::new(r"^coordinates_(\d\d)\.idx$").unwrap();

        let mut title_index = None;
        let mut title_search_index = None;
        let mut math_index = None;
        let mut math_data = None;
        let mut metadata_text = None;
        let mut data_shard_files: Vec<(usize, PathBuf)> = Vec::new();
        let mut coord_shard_files: Vec<(usize, PathBuf)> = Vec::new();

        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if name == "titles.idx" {
                title_index = Some(RandomAccessFile::open(path).await?);
            } else if name == "titles_search.idx" {
                title_search_index = Some(RandomAccessFile::open(path).await?);
            } else if name == "math.idx" {
                math_index = Some(RandomAccessFile::open(path).await?);
            } else if name == "math.dat" {
                math_data = Some(RandomAccessFile::open(path).await?);
            } else if name == "metadata.txt" {
                metadata_text = Some(read_text(path).await?);
            } else if let Some(caps) = data_shard_re.captures(name) {
                let n: usize = caps[1].parse().expect("regex guarantees digits");
                data_shard_files.push((n, path.clone()));
            } else if let Some(caps) = coord_shard_re.captures(name) {
                let n: usize = caps[1].parse().expect("regex guarantees digits");
                coord_shard_files.push((n - 1, path.clone()));
            }
        }

        let title_index = title_index
            .ok_or_else(|| ArchiveError::InvalidArchive("titles.idx is required".to_string()))?;
        let metadata_text = metadata_text
            .ok_or_else(|| ArchiveError::InvalidArchive("metadata.txt is required".to_string()))?;
        let metadata = Metadata::parse(&metadata_text)?;

        let data_shards = build_slots(data_shard_files).await?;
        if !data_shards.iter().any(Option::is_some) {
            return Err(ArchiveError::InvalidArchive(
                "no data shards present".to_string(),
            ));
        }

        let coord_shards = build_dense_slots(coord_shard_files).await?;

        Ok(Archive {
            title_index,
            title_search_index,
            data_shards,
            coord_shards,
            math_index,
            math_data,
            metadata,
            search_guard: Mutex::new(()),
        })
    }

    /// Build an archive by probing a directory for the well-known file
    /// names, stopping shard enumeration at the first `NotFound` (§4.4,
    /// "from directory enumeration").
    pub async fn from_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let title_index = RandomAccessFile::open(dir.join("titles.idx")).await?;

        let title_search_index = match RandomAccessFile::open(dir.join("titles_search.idx")).await {
            Ok(f) => Some(f),
            Err(ArchiveError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let metadata_text = read_text(dir.join("metadata.txt")).await?;
        let metadata = Metadata::parse(&metadata_text)?;

        let math_index = match RandomAccessFile::open(dir.join("math.idx")).await {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open math.idx, math image lookup disabled");
                None
            }
        };
        let math_data = match RandomAccessFile::open(dir.join("math.dat")).await {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open math.dat, math image lookup disabled");
                None
            }
        };

        let mut data_shards = Vec::new();
        for n in 0..100u32 {
            let path = dir.join(format!("wikipedia_{n:02}.dat"));
            match RandomAccessFile::open(&path).await {
                Ok(f) => {
                    while data_shards.len() <= n as usize {
                        data_shards.push(None);
                    }
                    data_shards[n as usize] = Some(f);
                }
                Err(ArchiveError::NotFound(_)) => break,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "error enumerating data shards");
                    return Err(e);
                }
            }
        }
        if !data_shards.iter().any(Option::is_some) {
            return Err(ArchiveError::InvalidArchive(
                "no data shards present".to_string(),
            ));
        }

        let mut coord_shards = Vec::new();
        for n in 1..100u32 {
            let path = dir.join(format!("coordinates_{n:02}.idx"));
            match RandomAccessFile::open(&path).await {
                Ok(f) => coord_shards.push(f),
                Err(ArchiveError::NotFound(_)) => break,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "error enumerating coordinate shards");
                    return Err(e);
                }
            }
        }

        Ok(Archive {
            title_index,
            title_search_index,
            data_shards,
            coord_shards,
            math_index,
            math_data,
            metadata,
            search_guard: Mutex::new(()),
        })
    }

    pub async fn get_title_by_name(&self, name: &str) -> Result<Option<Title>> {
        title::get_title_by_name(&self.title_index, self.normalize_fn(), name).await
    }

    pub async fn find_titles_with_prefix(&self, prefix: &str, max_size: usize) -> Result<Vec<Title>> {
        title::find_titles_with_prefix(&self.title_index, self.normalize_fn(), prefix, max_size).await
    }

    pub async fn get_titles_starting_at_offset(&self, offset: u64, count: usize) -> Result<Vec<Title>> {
        title::get_titles_starting_at_offset(&self.title_index, offset, count).await
    }

    pub async fn get_random_title(&self, random_seed: u64) -> Result<Title> {
        title::random_title(&self.title_index, random_seed).await
    }

    pub async fn read_article(&self, title: &Title) -> Result<String> {
        reader::read_article(&self.data_shards, title).await
    }

    pub async fn resolve_redirect(&self, title: &Title) -> Result<Title> {
        title::resolve_redirect(&self.title_index, title).await
    }

    /// Rejects a concurrent call with `SearchInProgress` instead of the
    /// source's self-healing counter reset (§9).
    pub async fn get_titles_in_coords(&self, rect: Rectangle, max_titles: i64) -> Result<Vec<Title>> {
        let _guard = self
            .search_guard
            .try_lock()
            .map_err(|_| ArchiveError::SearchInProgress)?;
        spatial::get_titles_in_coords(&self.coord_shards, &self.title_index, rect, max_titles).await
    }

    pub async fn load_math_image(&self, hex_hash: &str) -> Result<bytes::Bytes> {
        let index = self
            .math_index
            .as_ref()
            .ok_or_else(|| ArchiveError::NotFound("math index is not available".to_string()))?;
        let data = self
            .math_data
            .as_ref()
            .ok_or_else(|| ArchiveError::NotFound("math data is not available".to_string()))?;
        math::load_math_image(index, data, hex_hash).await
    }
}

async fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ArchiveError::io(path, e))
}

/// Build a sparse vec of shards where slot N holds the shard whose filename
/// captured integer N (§9: "slot index equals the integer", implemented
/// literally rather than N-1).
async fn build_slots(mut files: Vec<(usize, PathBuf)>) -> Result<Vec<Option<RandomAccessFile>>> {
    files.sort_by_key(|(n, _)| *n);
    let max = files.iter().map(|(n, _)| *n).max().unwrap_or(0);
    let mut slots: Vec<Option<RandomAccessFile>> = (0..=max).map(|_| None).collect();
    for (n, path) in files {
        slots[n] = Some(RandomAccessFile::open(&path).await?);
    }
    Ok(slots)
}

/// Coordinate shards are always present where referenced (no gaps), so this
/// builds a dense, sorted vec rather than a sparse one.
async fn build_dense_slots(mut files: Vec<(usize, PathBuf)>) -> Result<Vec<RandomAccessFile>> {
    files.sort_by_key(|(n, _)| *n);
    let mut out = Vec::with_capacity(files.len());
    for (_, path) in files {
        out.push(RandomAccessFile::open(&path).await?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_article_record(name: &str, file_nr: u8, block_start: u32, block_offset: u32, article_length: u32) -> Vec<u8> {
        let mut rec = vec![0u8; 16];
        rec[2] = file_nr;
        rec[3..7].copy_from_slice(&block_start.to_le_bytes());
        rec[7..11].copy_from_slice(&block_offset.to_le_bytes());
        rec[11..15].copy_from_slice(&article_length.to_le_bytes());
        rec.extend_from_slice(name.as_bytes());
        rec.push(b'\n');
        rec
    }

    fn bzip2_compress(data: &[u8]) -> Vec<u8> {
        use bzip2::write::BzEncoder;
        use std::io::Write;
        let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::best());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    async fn build_sample_archive() -> (tempfile::TempDir, Archive) {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(
            dir.path().join("metadata.txt"),
            "language = en\ndate = 2014-06-01\nnormalized_titles = 0\n",
        )
        .unwrap();

        let body = "prefix<ARTICLE>hello</ARTICLE>suffix";
        let compressed = bzip2_compress(body.as_bytes());
        std::fs::write(dir.path().join("wikipedia_00.dat"), &compressed).unwrap();

        let mut titles = Vec::new();
        titles.extend(write_article_record(
            "Hello",
            0,
            0,
            "prefix<ARTICLE>".len() as u32,
            "hello".len() as u32,
        ));
        std::fs::write(dir.path().join("titles.idx"), &titles).unwrap();

        let archive = Archive::from_directory(dir.path()).await.unwrap();
        (dir, archive)
    }

    #[tokio::test]
    async fn directory_construction_reads_metadata_and_is_ready() {
        let (_dir, archive) = build_sample_archive().await;
        assert!(archive.is_ready());
        assert_eq!(archive.metadata().language, "en");
        assert_eq!(archive.metadata().date, "2014-06-01");
        assert!(!archive.metadata().normalized_titles);
    }

    #[tokio::test]
    async fn end_to_end_lookup_and_read() {
        let (_dir, archive) = build_sample_archive().await;
        let title = archive.get_title_by_name("Hello").await.unwrap().unwrap();
        let body = archive.read_article(&title).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn missing_optional_files_do_not_fail_construction() {
        let (_dir, archive) = build_sample_archive().await;
        assert!(archive.load_math_image("00").await.is_err());
    }

    #[test]
    fn metadata_parses_key_value_lines() {
        let m = Metadata::parse("language = en\ndate = 2014-06-01\nnormalized_titles = 0\n").unwrap();
        assert_eq!(m.language, "en");
        assert_eq!(m.date, "2014-06-01");
        assert!(!m.normalized_titles);
    }

    #[test]
    fn metadata_defaults_normalized_titles_to_true() {
        let m = Metadata::parse("language = fr\ndate = 2020-01-01\n").unwrap();
        assert!(m.normalized_titles);
    }

    #[test]
    fn metadata_requires_language_and_date() {
        assert!(Metadata::parse("date = 2020-01-01\n").is_err());
        assert!(Metadata::parse("language = en\n").is_err());
    }
}
