// lib.rs - rmsearch library root

//! # rmsearch - Repeat-search alignment results for RepeatMasker style pipelines
//!
//! This library turns the reports of sequence search engines (cross_match,
//! NCBI rmblast, WU-Blast, WU-BlastX and DeCypher) into a common alignment
//! record, and recomputes scores and divergences from the aligned strings.
//!
//! ## Features
//!
//! - **Report parsers**: streaming, line-driven parsers for every supported engine
//! - **Divergence**: Kimura and K2P-with-gaps divergence with optional CpG adjustment
//! - **Rescoring**: matrix/gap rescoring, xDrop fragmentation and complexity adjustment
//! - **Filtering**: minimum score, subject regexes and the cross_match masklevel rule
//! - **Annotation cleanup**: overlap resolution plus length and divergence windows
//! - **Multiple formats**: CAF, CIGAR, alignment blocks, .out, TSV, JSON and BED
//! - **Caching**: LZ4 compressed result caches with metadata
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use rmsearch::prelude::*;
//! use rmsearch::engines::{CrossmatchEngine, ParseOptions, ResultSink, SearchEngine};
//!
//! let file = std::fs::File::open("chr1.cross_match").map_err(|e| e.to_string())?;
//! let mut reader = std::io::BufReader::new(file);
//! let mut results = SearchResultCollection::new();
//! CrossmatchEngine
//!     .parse_output(&mut reader, &mut ResultSink::Collection(&mut results), &ParseOptions::default())
//!     .map_err(|e| e.to_string())?;
//!
//! // Annotate Kimura divergence with CpG adjustment
//! results.annotate_kimura(true).map_err(|e| e.to_string())?;
//! # Ok::<(), String>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod engines;
pub mod error;
pub mod output;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{calc_k2p_gap_divergence, calc_kimura_divergence, rescore};
    pub use crate::core::{MatrixKind, RescoreParams, ScoringMatrix};
    pub use crate::data::{Orientation, OverlapStrategy, RepeatField, SearchResult, SearchResultCollection};
    pub use crate::engines::{EngineRegistry, SearchEngine};
    pub use crate::error::SearchError;
    pub use crate::output::{write_results, OutputFormat};
}

// Re-export main types at the root level for convenience
pub use cli::{Args, ValidationResult};
pub use core::{RescoreParams, ScoringMatrix};
pub use data::{Orientation, SearchResult, SearchResultCollection};
pub use error::{Result, SearchError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!("rmsearch v{} - Repeat-search alignment parsing and rescoring", VERSION)
}
