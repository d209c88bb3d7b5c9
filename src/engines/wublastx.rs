// wublastx.rs - WU-BLASTX engine (translated nucleotide query vs protein library)

use crate::engines::traits::{EngineParameters, ParseOptions, ReportParser, SearchEngine};
use crate::engines::wublast::{WuBlastParser, WuFlavor};

#[derive(Debug)]
pub struct WuBlastXEngine;

impl SearchEngine for WuBlastXEngine {
    fn name(&self) -> &'static str {
        "wublastx"
    }

    fn description(&self) -> &'static str {
        "WU-BLASTX translated search against protein repeats"
    }

    fn parameters(&self) -> EngineParameters {
        EngineParameters {
            program: "blastx".to_string(),
            matrix: Some("BLOSUM62".to_string()),
            min_score: 100,
            gap_init: -12,
            ins_gap_ext: -2,
            del_gap_ext: -2,
            mask_level: None,
            alignments: true,
        }
    }

    fn new_parser(&self, options: &ParseOptions) -> Box<dyn ReportParser> {
        Box::new(WuBlastParser::new(WuFlavor::BlastX, options))
    }
}
