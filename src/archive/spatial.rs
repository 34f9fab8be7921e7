//! Geographic rectangle search over the disk-resident quadtree (§4.7).
//!
//! The descent fan-out is a `futures::future::join_all` over boxed
//! recursive futures rather than the source's pending-callback counter, and
//! the "one search at a time" invariant is a `tokio::sync::Mutex::try_lock`
//! that rejects a concurrent call outright instead of resetting a shared
//! counter — both are the redesigns §9 calls out by name.

use std::pin::Pin;

use futures::future::{join_all, BoxFuture};

use crate::error::{ArchiveError, Result};
use crate::geometry::{Point, Rectangle};
use crate::io::RandomAccessFile;

use super::title;

const INNER_SELECTOR: u16 = 0xFFFF;
const NODE_HEADER_LEN: u64 = 22;
const LEAF_ENTRY_LEN: u64 = 12;

struct Hit {
    title_offset: u64,
    geo: Point,
}

/// Search every coordinate shard for titles inside `rect`, merged and
/// sorted by ascending distance to `rect.center()`. `max_titles == -1`
/// means unbounded (§4.7).
pub async fn get_titles_in_coords(
    coord_shards: &[RandomAccessFile],
    title_index: &RandomAccessFile,
    rect: Rectangle,
    max_titles: i64,
) -> Result<Vec<title::Title>> {
    let rect = rect.normalized();
    let cap = if max_titles < 0 {
        usize::MAX
    } else {
        max_titles as usize
    };

    let mut hits = Vec::new();
    for shard in coord_shards {
        let mut shard_hits = Vec::new();
        descend(shard, 0, &crate::geometry::WHOLE_EARTH, &rect, cap, &mut shard_hits).await?;
        hits.extend(shard_hits);
    }

    let center = rect.center();
    hits.sort_by(|a, b| {
        center
            .distance(&a.geo)
            .partial_cmp(&center.distance(&b.geo))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(cap);

    let mut titles = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(t) = title::sequential_from(title_index, hit.title_offset).await? {
            titles.push(t);
        }
    }
    Ok(titles)
}

/// Recursive descent is boxed so it can be driven through
/// `futures::future::join_all` at each inner node's fan-out.
fn descend<'a>(
    shard: &'a RandomAccessFile,
    pos: u64,
    node_rect: &'a Rectangle,
    query: &'a Rectangle,
    cap: usize,
    out: &'a mut Vec<Hit>,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let header = shard.read_clamped(pos, NODE_HEADER_LEN).await?;
        if header.len() < 2 {
            return Ok(());
        }
        let selector = crate::io::u16le(&header[0..2]);

        if selector == INNER_SELECTOR {
            if header.len() < NODE_HEADER_LEN as usize {
                return Err(ArchiveError::InvalidArchive(format!(
                    "truncated quadtree inner node at {pos}"
                )));
            }
            let lat = crate::io::f32le(&header[2..6]) as f64;
            let lon = crate::io::f32le(&header[6..10]) as f64;
            let center = Point::new(lon, lat);
            let len_sw = crate::io::u32le(&header[10..14]) as u64;
            let len_se = crate::io::u32le(&header[14..18]) as u64;
            let len_nw = crate::io::u32le(&header[18..22]) as u64;

            let base = pos + NODE_HEADER_LEN;
            let pos_sw = base;
            let pos_se = pos_sw + len_sw;
            let pos_nw = pos_se + len_se;
            let pos_ne = pos_nw + len_nw;

            let rects = split_rect(node_rect, &center);
            let children = [
                (pos_sw, rects.sw),
                (pos_se, rects.se),
                (pos_nw, rects.nw),
                (pos_ne, rects.ne),
            ];

            let mut futs: Vec<Pin<Box<dyn std::future::Future<Output = Result<Vec<Hit>>> + Send + 'a>>> =
                Vec::new();
            for (child_pos, child_rect) in children {
                if !child_rect.intersect(query) {
                    continue;
                }
                futs.push(Box::pin(async move {
                    let mut local = Vec::new();
                    descend(shard, child_pos, &child_rect, query, cap, &mut local).await?;
                    Ok(local)
                }));
            }

            for result in join_all(futs).await {
                out.extend(result?);
            }
            Ok(())
        } else {
            let count = selector as usize;
            if count == 0 {
                return Ok(());
            }
            let entries = shard
                .read_clamped(pos + 2, count as u64 * LEAF_ENTRY_LEN)
                .await?;
            for i in 0..count {
                if out.len() >= cap {
                    break;
                }
                let base = i * LEAF_ENTRY_LEN as usize;
                if base + 12 > entries.len() {
                    break;
                }
                let lat = crate::io::f32le(&entries[base..base + 4]) as f64;
                let lon = crate::io::f32le(&entries[base + 4..base + 8]) as f64;
                let title_offset = crate::io::u32le(&entries[base + 8..base + 12]) as u64;
                let geo = Point::new(lon, lat);
                if query.contains_point(&geo) {
                    out.push(Hit { title_offset, geo });
                }
            }
            Ok(())
        }
    })
}

struct SplitRects {
    sw: Rectangle,
    se: Rectangle,
    nw: Rectangle,
    ne: Rectangle,
}

/// Split `rect` into its four quadrants at `center` (§4.7: "compute the
/// four child rectangles by splitting thisRect at center").
fn split_rect(rect: &Rectangle, center: &Point) -> SplitRects {
    let sw_origin = rect.sw();
    let ne_corner = rect.ne();

    let sw = Rectangle::from_corners(sw_origin, *center);
    let se = Rectangle::from_corners(Point::new(center.lon, sw_origin.lat), Point::new(ne_corner.lon, center.lat));
    let nw = Rectangle::from_corners(Point::new(sw_origin.lon, center.lat), Point::new(center.lon, ne_corner.lat));
    let ne = Rectangle::from_corners(*center, ne_corner);

    SplitRects { sw, se, nw, ne }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_inner(center: (f32, f32), len_sw: u32, len_se: u32, len_nw: u32) -> Vec<u8> {
        let mut b = vec![0u8; 22];
        b[0..2].copy_from_slice(&INNER_SELECTOR.to_le_bytes());
        b[2..6].copy_from_slice(&center.0.to_le_bytes());
        b[6..10].copy_from_slice(&center.1.to_le_bytes());
        b[10..14].copy_from_slice(&len_sw.to_le_bytes());
        b[14..18].copy_from_slice(&len_se.to_le_bytes());
        b[18..22].copy_from_slice(&len_nw.to_le_bytes());
        b
    }

    fn encode_leaf(entries: &[(f32, f32, u32)]) -> Vec<u8> {
        let mut b = vec![0u8; 2];
        b[0..2].copy_from_slice(&(entries.len() as u16).to_le_bytes());
        for (lat, lon, offset) in entries {
            b.extend_from_slice(&lat.to_le_bytes());
            b.extend_from_slice(&lon.to_le_bytes());
            b.extend_from_slice(&offset.to_le_bytes());
        }
        b
    }

    async fn shard_from(bytes: &[u8]) -> (tempfile::TempDir, RandomAccessFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coordinates_01.idx");
        std::fs::write(&path, bytes).unwrap();
        let f = RandomAccessFile::open(&path).await.unwrap();
        (dir, f)
    }

    async fn title_index_with(names: &[&str]) -> (tempfile::TempDir, RandomAccessFile) {
        let mut data = Vec::new();
        for name in names {
            let mut rec = vec![0u8; 16];
            rec.extend_from_slice(name.as_bytes());
            rec.push(b'\n');
            data.extend(rec);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titles.idx");
        std::fs::write(&path, &data).unwrap();
        let f = RandomAccessFile::open(&path).await.unwrap();
        (dir, f)
    }

    #[tokio::test]
    async fn leaf_node_returns_contained_entries() {
        let leaf = encode_leaf(&[(48.8, 2.3, 0), (40.7, -74.0, 1)]);
        let (_dir, shard) = shard_from(&leaf).await;
        let (_tdir, titles) = title_index_with(&["Paris", "New York"]).await;

        let rect = Rectangle::new(Point::new(0.0, 45.0), 10.0, 10.0);
        let result = get_titles_in_coords(&[shard], &titles, rect, -1)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name(), "Paris");
    }

    #[tokio::test]
    async fn results_are_sorted_by_distance_to_center() {
        let leaf = encode_leaf(&[(5.0, 5.0, 0), (0.5, 0.5, 1)]);
        let (_dir, shard) = shard_from(&leaf).await;
        let (_tdir, titles) = title_index_with(&["Far", "Near"]).await;

        let rect = Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0);
        let result = get_titles_in_coords(&[shard], &titles, rect, -1)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name(), "Near");
        assert_eq!(result[1].name(), "Far");
    }

    #[tokio::test]
    async fn inner_node_recurses_into_intersecting_children() {
        // Root splits the 0..10 / 0..10 box at (5,5). Only the NE quadrant
        // (lon>=5, lat>=5) holds data; its length runs to EOF.
        let ne_leaf = encode_leaf(&[(7.0, 7.0, 0)]);
        let mut root = encode_inner((5.0, 5.0), 0, 0, 0);
        root.extend_from_slice(&ne_leaf);

        let (_dir, shard) = shard_from(&root).await;
        let (_tdir, titles) = title_index_with(&["Inside"]).await;

        let rect = Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0);
        let result = get_titles_in_coords(&[shard], &titles, rect, -1)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name(), "Inside");
    }

    #[tokio::test]
    async fn max_titles_bounds_the_result() {
        let leaf = encode_leaf(&[(1.0, 1.0, 0), (2.0, 2.0, 1), (3.0, 3.0, 2)]);
        let (_dir, shard) = shard_from(&leaf).await;
        let (_tdir, titles) = title_index_with(&["A", "B", "C"]).await;

        let rect = Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0);
        let result = get_titles_in_coords(&[shard], &titles, rect, 2)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }
}
