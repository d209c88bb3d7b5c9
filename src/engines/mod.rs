// mod.rs - Search engine report parsers module root

pub mod crossmatch;
pub mod decypher;
pub(crate) mod hit;
pub mod ncbi;
pub mod registry;
pub mod traits;
pub mod wublast;
pub mod wublastx;

// Re-export main types for convenience
pub use crossmatch::{CrossmatchEngine, CrossmatchParser};
pub use decypher::DecypherEngine;
pub use ncbi::{NcbiEngine, NcbiParser};
pub use registry::EngineRegistry;
pub use traits::{
    parse_report, EngineParameters, EngineRun, ParseOptions, ParseSummary, ReportParser, ResultSink, SearchEngine,
};
pub use wublast::{WuBlastEngine, WuBlastParser, WuFlavor};
pub use wublastx::WuBlastXEngine;
