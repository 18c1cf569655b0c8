use crate::catalog::TagIndex;
use crate::types::TagName;

/// Per-tag frequency entry for build reports.
#[derive(Clone, Debug, PartialEq)]
pub struct TagCount {
    /// Tag name.
    pub tag: TagName,
    /// Number of item occurrences bearing the tag.
    pub count: usize,
    /// Share of all tag occurrences.
    pub share: f64,
}

/// Compute the `limit` most common tags in `index`.
///
/// Sorted by count descending, then tag name ascending for a stable report.
pub fn top_tags(index: &TagIndex, limit: usize) -> Vec<TagCount> {
    let total: usize = index.iter().map(|(_, ids)| ids.len()).sum();
    let mut counts: Vec<TagCount> = index
        .iter()
        .map(|(tag, ids)| TagCount {
            tag: tag.clone(),
            count: ids.len(),
            share: if total == 0 {
                0.0
            } else {
                ids.len() as f64 / total as f64
            },
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_tags_sorts_by_count_then_name() {
        let mut index = TagIndex::new();
        for id in [1, 2, 3] {
            index.add("Action".to_string(), id);
        }
        for id in [1, 2] {
            index.add("RPG".to_string(), id);
        }
        for id in [4, 5] {
            index.add("Indie".to_string(), id);
        }

        let top = top_tags(&index, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].tag, "Action");
        assert_eq!(top[0].count, 3);
        assert!((top[0].share - 3.0 / 7.0).abs() < 1e-9);
        // "Indie" ties with "RPG" on count; name order breaks the tie.
        assert_eq!(top[1].tag, "Indie");
    }

    #[test]
    fn top_tags_of_empty_index_is_empty() {
        assert!(top_tags(&TagIndex::new(), 5).is_empty());
    }
}
