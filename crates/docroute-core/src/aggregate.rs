//! Chunk aggregation: raw retrieval hits → ranked document groups.
//!
//! # Algorithm
//!
//! 1. Derive each chunk's source id (text before [`CHUNK_MARKER`]).
//! 2. Group by source id in first-discovery order; members keep
//!    retrieval order.
//! 3. Rank groups by mean member distance, ascending. The sort is stable,
//!    so equal averages keep discovery order.
//! 4. Truncate to the requested number of groups.

use std::collections::HashMap;

use crate::models::{DocumentGroup, RetrievedChunk, CHUNK_MARKER};

/// Source document id for a chunk id.
///
/// ```rust
/// use docroute_core::aggregate::source_id_of;
///
/// assert_eq!(source_id_of("guide.pdf#chunk-4"), "guide.pdf");
/// assert_eq!(source_id_of("notes.txt"), "notes.txt");
/// ```
pub fn source_id_of(chunk_id: &str) -> &str {
    match chunk_id.find(CHUNK_MARKER) {
        Some(pos) => &chunk_id[..pos],
        None => chunk_id,
    }
}

/// Group chunks by source document and return the best `desired_groups`.
///
/// Output length is at most `min(desired_groups, distinct source ids)`.
pub fn combine(chunks: Vec<RetrievedChunk>, desired_groups: usize) -> Vec<DocumentGroup> {
    if chunks.is_empty() || desired_groups == 0 {
        return Vec::new();
    }

    let mut groups: Vec<DocumentGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for chunk in chunks {
        match index.get(&chunk.source_id) {
            Some(&i) => groups[i].push(chunk),
            None => {
                index.insert(chunk.source_id.clone(), groups.len());
                groups.push(DocumentGroup::new(chunk));
            }
        }
    }

    groups.sort_by(|a, b| {
        a.average_distance
            .partial_cmp(&b.average_distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    groups.truncate(desired_groups);
    groups
}

/// One group per raw hit, in retrieval order. Used when combination is off.
pub fn singleton_groups(chunks: Vec<RetrievedChunk>) -> Vec<DocumentGroup> {
    chunks.into_iter().map(DocumentGroup::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn chunk(id: &str, text: &str, distance: f64) -> RetrievedChunk {
        RetrievedChunk::new(id, text, Metadata::new(), distance)
    }

    #[test]
    fn test_source_id_uses_first_marker() {
        assert_eq!(source_id_of("a#chunk-1#chunk-2"), "a");
        assert_eq!(source_id_of("#chunk-0"), "");
    }

    #[test]
    fn test_empty_input() {
        assert!(combine(Vec::new(), 3).is_empty());
    }

    #[test]
    fn test_zero_groups_requested() {
        assert!(combine(vec![chunk("a", "x", 0.1)], 0).is_empty());
    }

    #[test]
    fn test_shared_source_forms_one_group() {
        let groups = combine(
            vec![
                chunk("doc#chunk-0", "one", 0.1),
                chunk("doc#chunk-1", "two", 0.3),
                chunk("doc#chunk-2", "three", 0.5),
            ],
            5,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].source_id, "doc");
        assert!((groups[0].average_distance - 0.3).abs() < 1e-9);
        assert_eq!(groups[0].merged_text, "one\n\ntwo\n\nthree");
    }

    #[test]
    fn test_groups_sorted_by_average_distance() {
        let groups = combine(
            vec![
                chunk("far#chunk-0", "f0", 0.2),
                chunk("near#chunk-0", "n0", 0.1),
                chunk("far#chunk-1", "f1", 0.8),
                chunk("near#chunk-1", "n1", 0.3),
                chunk("solo", "s", 0.25),
            ],
            10,
        );
        let order: Vec<&str> = groups.iter().map(|g| g.source_id.as_str()).collect();
        assert_eq!(order, vec!["near", "solo", "far"]);
        for pair in groups.windows(2) {
            assert!(pair[0].average_distance <= pair[1].average_distance);
        }
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let groups = combine(
            vec![
                chunk("b#chunk-0", "b", 0.4),
                chunk("a#chunk-0", "a", 0.4),
                chunk("c#chunk-0", "c", 0.4),
            ],
            3,
        );
        let order: Vec<&str> = groups.iter().map(|g| g.source_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_truncates_to_desired_groups() {
        let chunks = (0..6)
            .map(|i| chunk(&format!("doc{}#chunk-0", i), "t", i as f64 / 10.0))
            .collect();
        let groups = combine(chunks, 2);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].source_id, "doc0");
        assert_eq!(groups[1].source_id, "doc1");
    }

    #[test]
    fn test_members_keep_retrieval_order() {
        let groups = combine(
            vec![
                chunk("doc#chunk-7", "seven", 0.1),
                chunk("doc#chunk-2", "two", 0.2),
            ],
            1,
        );
        assert_eq!(groups[0].member_ids(), vec!["doc#chunk-7", "doc#chunk-2"]);
    }

    #[test]
    fn test_singleton_groups_preserve_order() {
        let groups = singleton_groups(vec![
            chunk("doc#chunk-1", "x", 0.5),
            chunk("doc#chunk-0", "y", 0.1),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].chunks[0].id, "doc#chunk-1");
        assert_eq!(groups[0].merged_text, "x");
    }
}
