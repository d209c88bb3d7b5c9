// decypher.rs - TimeLogic DeCypher engine

use crate::engines::traits::{EngineParameters, ParseOptions, ReportParser, SearchEngine};
use crate::engines::wublast::{WuBlastParser, WuFlavor};

/// DeCypher prints WU-BLAST reports with a known off-by-one on plus strand subject rows
#[derive(Debug)]
pub struct DecypherEngine;

impl SearchEngine for DecypherEngine {
    fn name(&self) -> &'static str {
        "decypher"
    }

    fn description(&self) -> &'static str {
        "TimeLogic DeCypher (WU-BLAST compatible reports)"
    }

    fn parameters(&self) -> EngineParameters {
        EngineParameters {
            program: "dc_template_rt".to_string(),
            matrix: None,
            min_score: 225,
            gap_init: -30,
            ins_gap_ext: -6,
            del_gap_ext: -6,
            mask_level: Some(80),
            alignments: true,
        }
    }

    fn new_parser(&self, options: &ParseOptions) -> Box<dyn ReportParser> {
        Box::new(WuBlastParser::new(WuFlavor::DeCypher, options))
    }
}
