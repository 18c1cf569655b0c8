use std::collections::BTreeSet;

/// Catalog item identifier (stable, externally assigned).
/// Example: `570`
pub type ItemId = u64;
/// Free-form, case-sensitive tag label attached to items.
/// Examples: `Action`, `Co-op`, `Turn-Based Strategy`
pub type TagName = String;
/// Identifier for a loadable data source (relative path or URL).
/// Examples: `data/released_appids.csv`, `data/Batch_3.csv`
pub type SourceId = String;
/// Caller-supplied set of active tag filters, read per query.
pub type SelectedTags = BTreeSet<TagName>;
