// mod.rs - Search result data structures module

pub mod caf;
pub mod collection;
pub mod record;

// Re-export main types for convenience
pub use caf::{cigar_string, decode_alignment, encode_alignment};
pub use collection::{HitLinks, OverlapStrategy, RepeatField, SearchResultCollection};
pub use record::{ColumnCounts, Orientation, SearchResult};
