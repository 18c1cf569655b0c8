//! Catalog payload types shared by the builder and the engine.
//!
//! Ownership model:
//! - `TagIndex` is the published tag→ids artifact, decoded once per engine.
//! - `TagSet` is the raw per-item tag field as it appears in source catalogs.
//! - `parse_id_lines` decodes the newline-separated id artifacts.

use indexmap::IndexMap;
use serde::de::{IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::types::{ItemId, TagName};

/// Inverted index mapping tag name → ids bearing that tag.
///
/// Tags keep first-seen order and ids keep per-tag insertion order, so the
/// serialized artifact reproduces the builder's observation order exactly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagIndex(IndexMap<TagName, Vec<ItemId>>);

impl TagIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` to the bucket for `tag`, creating the bucket on first sight.
    pub fn add(&mut self, tag: TagName, id: ItemId) {
        self.0.entry(tag).or_default().push(id);
    }

    /// Ids bearing `tag`; unknown tags yield an empty slice.
    pub fn ids_for(&self, tag: &str) -> &[ItemId] {
        self.0.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct tags in the index.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no tag has been observed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (tag, ids) entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&TagName, &Vec<ItemId>)> {
        self.0.iter()
    }

    /// Distinct tag names, lexicographically sorted.
    pub fn sorted_tags(&self) -> Vec<TagName> {
        let mut tags: Vec<TagName> = self.0.keys().cloned().collect();
        tags.sort();
        tags
    }
}

/// Raw per-item tag field as found in source catalogs.
///
/// Accepts an array of tag strings, an object whose keys are the tag names
/// (values ignored), or `null`/absent for an untagged item. Tag order is
/// preserved as written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagSet(Vec<TagName>);

impl TagSet {
    /// Build a tag set from owned names, preserving order.
    pub fn from_names(names: Vec<TagName>) -> Self {
        Self(names)
    }

    /// Tag names in source order.
    pub fn names(&self) -> &[TagName] {
        &self.0
    }

    /// Returns `true` for an untagged item.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for TagSet {
    type Item = TagName;
    type IntoIter = std::vec::IntoIter<TagName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TagSetVisitor;

        impl<'de> Visitor<'de> for TagSetVisitor {
            type Value = TagSet;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a tag array, a tag-keyed object, or null")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<TagSet, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut names = Vec::new();
                while let Some(name) = seq.next_element::<TagName>()? {
                    names.push(name);
                }
                Ok(TagSet(names))
            }

            fn visit_map<A>(self, mut map: A) -> Result<TagSet, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut names = Vec::new();
                while let Some((name, _)) = map.next_entry::<TagName, IgnoredAny>()? {
                    names.push(name);
                }
                Ok(TagSet(names))
            }

            fn visit_unit<E>(self) -> Result<TagSet, E>
            where
                E: serde::de::Error,
            {
                Ok(TagSet::default())
            }

            fn visit_none<E>(self) -> Result<TagSet, E>
            where
                E: serde::de::Error,
            {
                Ok(TagSet::default())
            }
        }

        deserializer.deserialize_any(TagSetVisitor)
    }
}

/// Decode a newline-separated id artifact.
///
/// Keeps every non-empty line consisting solely of ASCII digits and skips
/// everything else, so stray blanks or carriage returns never abort a load.
pub fn parse_id_lines(text: &str) -> Vec<ItemId> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            trimmed.parse::<ItemId>().ok()
        })
        .collect()
}
