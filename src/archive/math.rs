//! Math-rendering image lookup by content hash (§4.8): classical binary
//! search over fixed 24-byte records, then a single ranged read of the
//! image data file.

use bytes::Bytes;

use crate::error::{ArchiveError, Result};
use crate::io::RandomAccessFile;

const RECORD_LEN: u64 = 24;
const HASH_LEN: usize = 16;

/// Look up the image bytes for `hex_hash` (lowercase hex, `HASH_LEN * 2`
/// characters). Returns `NotFound` when no record matches.
pub async fn load_math_image(
    math_index: &RandomAccessFile,
    math_data: &RandomAccessFile,
    hex_hash: &str,
) -> Result<Bytes> {
    let count = math_index.file_size() / RECORD_LEN;
    let mut lo = 0u64;
    let mut hi = count;

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let record = math_index.read(mid * RECORD_LEN, RECORD_LEN).await?;
        let hash = crate::io::hex(&record[0..HASH_LEN]);

        match hash.as_str().cmp(hex_hash) {
            std::cmp::Ordering::Equal => {
                let pos = crate::io::u32le(&record[16..20]) as u64;
                let len = crate::io::u32le(&record[20..24]) as u64;
                return math_data.read(pos, len).await;
            }
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
        }
    }

    Err(ArchiveError::NotFound(format!(
        "no math image for hash {hex_hash}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_record(hash_byte: u8, pos: u32, len: u32) -> Vec<u8> {
        let mut rec = vec![0u8; HASH_LEN];
        rec[HASH_LEN - 1] = hash_byte;
        rec.extend_from_slice(&pos.to_le_bytes());
        rec.extend_from_slice(&len.to_le_bytes());
        rec
    }

    async fn write_temp(name: &str, bytes: &[u8]) -> (tempfile::TempDir, RandomAccessFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        let f = RandomAccessFile::open(&path).await.unwrap();
        (dir, f)
    }

    #[tokio::test]
    async fn finds_the_matching_record() {
        let mut index = Vec::new();
        index.extend(encode_record(0x01, 0, 5));
        index.extend(encode_record(0x02, 5, 3));
        let (_idir, index_file) = write_temp("math.idx", &index).await;
        let (_ddir, data_file) = write_temp("math.dat", b"HELLOBYE").await;

        let hash = crate::io::hex(&{
            let mut h = [0u8; HASH_LEN];
            h[HASH_LEN - 1] = 0x02;
            h
        });

        let bytes = load_math_image(&index_file, &data_file, &hash).await.unwrap();
        assert_eq!(bytes.as_ref(), b"BYE");
    }

    #[tokio::test]
    async fn missing_hash_is_not_found() {
        let mut index = Vec::new();
        index.extend(encode_record(0x01, 0, 5));
        let (_idir, index_file) = write_temp("math.idx", &index).await;
        let (_ddir, data_file) = write_temp("math.dat", b"HELLO").await;

        let err = load_math_image(&index_file, &data_file, &"ff".repeat(HASH_LEN))
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }
}
