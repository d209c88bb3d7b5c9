// ncbi.rs - NCBI BLAST / RMBlast report parser

use crate::data::SearchResult;
use crate::engines::hit::{parse_blast_row, parse_evalue, parse_length, parse_strand, value_after, HitAccumulator};
use crate::engines::traits::{EngineParameters, ParseOptions, ReportParser, SearchEngine};
use crate::error::{Result, SearchError};

const COMPONENT: &str = "NcbiParser";

/// Which sequence a `Length=` line describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthContext {
    Query,
    Subject,
}

/// Line-driven parser for rmblastn/blastn pairwise reports
#[derive(Debug)]
pub struct NcbiParser {
    options: ParseOptions,
    query_name: Option<String>,
    query_length: Option<usize>,
    subject_name: Option<String>,
    subject_length: Option<usize>,
    length_context: LengthContext,
    current: Option<HitAccumulator>,
    in_alignment: bool,
}

impl NcbiParser {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            options: options.clone(),
            query_name: None,
            query_length: None,
            subject_name: None,
            subject_length: None,
            length_context: LengthContext::Query,
            current: None,
            in_alignment: false,
        }
    }

    fn close(&mut self) -> Result<Option<SearchResult>> {
        self.in_alignment = false;
        match self.current.take() {
            Some(hit) => hit.finalize(&self.options, COMPONENT).map(Some),
            None => Ok(None),
        }
    }

    /// ` Score = 250 bits (500),  Expect = 1e-70`
    fn start_hit(&mut self, line: &str) -> Result<()> {
        let query = self
            .query_name
            .as_deref()
            .ok_or_else(|| SearchError::grammar(COMPONENT, line, "Score line before any Query= line"))?;
        let subject = self
            .subject_name
            .as_deref()
            .ok_or_else(|| SearchError::grammar(COMPONENT, line, "Score line before any subject header"))?;

        let bits = value_after(line, "Score")
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| SearchError::grammar(COMPONENT, line, "unreadable bit score"))?;
        let raw = line
            .split_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .and_then(|(value, _)| value.trim().parse::<i32>().ok())
            .ok_or_else(|| SearchError::grammar(COMPONENT, line, "unreadable raw score"))?;

        let mut hit = HitAccumulator::new(query, subject);
        hit.score = raw;
        hit.bit_score = Some(bits);
        hit.evalue = line
            .find("Expect")
            .and_then(|at| line[at..].split_once('='))
            .and_then(|(_, value)| value.split_whitespace().next())
            .and_then(parse_evalue);
        hit.query_length = self.query_length;
        hit.subject_length = self.subject_length;
        self.current = Some(hit);
        Ok(())
    }
}

impl ReportParser for NcbiParser {
    fn consume(&mut self, line: &str) -> Result<Option<SearchResult>> {
        if let Some((label, row)) = parse_blast_row(line) {
            let hit = self
                .current
                .as_mut()
                .ok_or_else(|| SearchError::grammar(COMPONENT, line, "alignment row outside a hit"))?;
            hit.add_row(label, &row);
            self.in_alignment = true;
            return Ok(None);
        }

        let trimmed = line.trim_start();
        if self.in_alignment && (trimmed.is_empty() || line.starts_with("     ")) {
            // blank separator or match line
            return Ok(None);
        }

        if let Some(rest) = line.strip_prefix("Query=") {
            let closed = self.close()?;
            self.query_name = rest.split_whitespace().next().map(str::to_string);
            self.query_length = None;
            self.subject_name = None;
            self.length_context = LengthContext::Query;
            return Ok(closed);
        }
        if let Some(rest) = line.strip_prefix('>') {
            let closed = self.close()?;
            self.subject_name = rest.split_whitespace().next().map(str::to_string);
            self.subject_length = None;
            self.length_context = LengthContext::Subject;
            return Ok(closed);
        }
        if trimmed.starts_with("Score") && line.contains("bits") {
            let closed = self.close()?;
            self.start_hit(line)?;
            return Ok(closed);
        }
        if let Some(length) = parse_length(line) {
            match self.length_context {
                LengthContext::Query => self.query_length = Some(length),
                LengthContext::Subject => self.subject_length = Some(length),
            }
            return Ok(None);
        }

        if self.in_alignment {
            // any other text ends the alignment block
            return self.close();
        }
        if trimmed.starts_with("Strand") {
            if let (Some(hit), Some((_, subject_minus))) = (self.current.as_mut(), parse_strand(line)) {
                hit.subject_minus = subject_minus;
            }
        }
        Ok(None)
    }

    fn finish(&mut self) -> Result<Option<SearchResult>> {
        self.close()
    }
}

/// NCBI BLAST+ with the RMBlast extensions
#[derive(Debug)]
pub struct NcbiEngine;

impl SearchEngine for NcbiEngine {
    fn name(&self) -> &'static str {
        "ncbi"
    }

    fn description(&self) -> &'static str {
        "NCBI rmblastn (BLAST+ with RepeatMasker extensions)"
    }

    fn parameters(&self) -> EngineParameters {
        EngineParameters {
            program: "rmblastn".to_string(),
            matrix: None,
            min_score: 180,
            gap_init: -20,
            ins_gap_ext: -5,
            del_gap_ext: -5,
            mask_level: Some(80),
            alignments: true,
        }
    }

    fn new_parser(&self, options: &ParseOptions) -> Box<dyn ReportParser> {
        Box::new(NcbiParser::new(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Orientation, SearchResultCollection};
    use crate::engines::traits::ResultSink;
    use std::io::Cursor;

    const REPORT: &str = "\
RMBLASTN 2.14.1+

Query= chr1:1-1000 test region

Length=1000

> AluY#SINE/Alu
Length=311

 Score = 40.1 bits (52),  Expect = 2e-05
 Identities = 22/24 (92%), Gaps = 1/24 (4%)
 Strand=Plus/Minus

Query  101  ACGTACGTAC-TACGTACGTACGT  123
            |||||||||| |||||||||| ||
Sbjct  300  ACGTACGTACGTACGTACGTAAGT  277

 Score = 30.0 bits (40),  Expect = e-10
 Identities = 10/10 (100%), Gaps = 0/10 (0%)
 Strand=Plus/Plus

Query  501  GGGGCCCCAA  510
            ||||||||||
Sbjct  11   GGGGCCCCAA  20


Lambda      K        H
    1.28    0.460    0.850
";

    fn parse(text: &str, options: &ParseOptions) -> SearchResultCollection {
        let mut results = SearchResultCollection::new();
        NcbiEngine
            .parse_output(&mut Cursor::new(text), &mut ResultSink::Collection(&mut results), options)
            .unwrap();
        results
    }

    #[test]
    fn test_latin1_description_is_tolerated() {
        let mut bytes = REPORT.replacen("test region", "caf~ region", 1).into_bytes();
        let pos = bytes.iter().position(|&b| b == b'~').unwrap();
        bytes[pos] = 0xE9;

        let mut results = SearchResultCollection::new();
        let summary = NcbiEngine
            .parse_output(
                &mut Cursor::new(bytes),
                &mut ResultSink::Collection(&mut results),
                &ParseOptions::default(),
            )
            .unwrap();
        assert_eq!(summary.results, 2);
        assert_eq!(results.get(0).unwrap().query_name, "chr1:1-1000");
    }

    #[test]
    fn test_parses_two_hsps() {
        let results = parse(REPORT, &ParseOptions::default());
        assert_eq!(results.len(), 2);

        let first = results.get(0).unwrap();
        assert_eq!(first.query_name, "chr1:1-1000");
        assert_eq!(first.subject_name, "AluY#SINE/Alu");
        assert_eq!(first.score, 52);
        assert_eq!(first.bit_score, Some(40.1));
        assert_eq!(first.evalue, Some(2e-5));
        assert_eq!(first.orientation, Orientation::Complement);
        assert_eq!((first.query_start, first.query_end, first.query_remaining), (101, 123, 877));
        assert_eq!((first.subject_start, first.subject_end, first.subject_remaining), (277, 300, 11));
        assert_eq!(first.query_string, "ACGTACGTAC-TACGTACGTACGT");

        let second = results.get(1).unwrap();
        assert_eq!(second.orientation, Orientation::Forward);
        assert_eq!(second.evalue, Some(1e-10));
        assert_eq!((second.subject_start, second.subject_end), (11, 20));
        assert_eq!(second.pct_diverge, 0.0);
    }

    #[test]
    fn test_gap_only_rows_keep_coordinates() {
        let report = "\
Query= q1
Length=100
>rep
Length=50
 Score = 20.0 bits (25),  Expect = 0.001

Query  1   ACGTAC  6
Sbjct  1   ACGTAC  6

Query  7   ACGT  10
Sbjct  6   ----  6
";
        let results = parse(report, &ParseOptions::default());
        let hit = results.get(0).unwrap();
        assert_eq!((hit.query_start, hit.query_end), (1, 10));
        assert_eq!((hit.subject_start, hit.subject_end), (1, 6));
        assert_eq!(hit.subject_string, "ACGTAC----");
        assert!((hit.pct_insert - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_callback_sink_receives_every_hit() {
        let mut seen = Vec::new();
        let mut callback = |result: SearchResult| -> Result<()> {
            seen.push(result.score);
            Ok(())
        };
        let summary = NcbiEngine
            .parse_output(
                &mut Cursor::new(REPORT),
                &mut ResultSink::Callback(&mut callback),
                &ParseOptions::default(),
            )
            .unwrap();
        assert_eq!(summary.results, 2);
        assert_eq!(seen, vec![52, 40]);
    }

    #[test]
    fn test_exclude_alignments() {
        let options = ParseOptions {
            exclude_alignments: true,
            matrix_name: Some("14p41g.matrix".to_string()),
        };
        let results = parse(REPORT, &options);
        assert!(results.iter().all(|r| !r.has_alignment()));
        assert!(results.iter().all(|r| r.matrix_name.as_deref() == Some("14p41g.matrix")));
    }

    #[test]
    fn test_row_outside_hit_reports_line_number() {
        let report = "Query= q1\nLength=10\nQuery  1  ACGT  4\n";
        let mut results = SearchResultCollection::new();
        let err = NcbiEngine
            .parse_output(
                &mut Cursor::new(report),
                &mut ResultSink::Collection(&mut results),
                &ParseOptions::default(),
            )
            .unwrap_err();
        match err {
            SearchError::Grammar { component, line_number, .. } => {
                assert_eq!(component, COMPONENT);
                assert_eq!(line_number, 3);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
