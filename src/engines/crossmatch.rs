// crossmatch.rs - cross_match / RepeatMasker alignment and .out parser

use crate::data::{Orientation, SearchResult};
use crate::engines::hit::{is_aligned_chunk, value_after, AlignmentRow, HitAccumulator, ReportedHit, RowLabel};
use crate::engines::traits::{EngineParameters, ParseOptions, ReportParser, SearchEngine};
use crate::error::Result;

const COMPONENT: &str = "CrossmatchParser";

/// `(123)` -> 123
fn parenthesized(token: &str) -> Option<usize> {
    token.strip_prefix('(')?.strip_suffix(')')?.parse().ok()
}

fn is_coordinate(token: &str) -> bool {
    token.parse::<usize>().is_ok() || parenthesized(token).is_some()
}

/// Parse a summary line in any of the three layouts:
///
/// ```text
///  463  1.3  0.6  1.7  chr1  1001  1100 (0) C  AluSx  SINE/Alu  (0)  311  212  7
///  230 12.50 4.00 4.00 chr1   101   125 (875) C AluY#SINE/Alu (11) 300 276 5
///  180 10.00 0.00 0.00 chr1   301   310 (690) MIR SINE/MIR 1 10 (252) *
/// ```
fn parse_summary(line: &str) -> Option<HitAccumulator> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 12 {
        return None;
    }
    let score = tokens[0].parse::<i32>().ok()?;
    let pct_diverge = tokens[1].parse::<f64>().ok()?;
    let pct_delete = tokens[2].parse::<f64>().ok()?;
    let pct_insert = tokens[3].parse::<f64>().ok()?;
    let query_name = tokens[4];
    let query_start = tokens[5].parse::<usize>().ok()?;
    let query_end = tokens[6].parse::<usize>().ok()?;
    let query_remaining = parenthesized(tokens[7])?;

    let (orientation, mut at) = match tokens[8] {
        "C" => (Orientation::Complement, 9),
        "+" => (Orientation::Forward, 9),
        _ => (Orientation::Forward, 8),
    };
    let name = *tokens.get(at)?;
    let next = *tokens.get(at + 1)?;
    let subject_name = if is_coordinate(next) {
        at += 1;
        name.to_string()
    } else {
        at += 2;
        format!("{}#{}", name, next)
    };

    let coords = tokens.get(at..at + 3)?;
    let (subject_start, subject_end, subject_remaining) = match orientation {
        Orientation::Forward => (coords[0].parse().ok()?, coords[1].parse().ok()?, parenthesized(coords[2])?),
        Orientation::Complement => (coords[2].parse().ok()?, coords[1].parse().ok()?, parenthesized(coords[0])?),
    };

    let mut hit = HitAccumulator::new(query_name, &subject_name);
    hit.score = score;
    for token in &tokens[at + 3..] {
        if *token == "*" {
            hit.overlap = true;
        } else if token.parse::<u64>().is_ok() {
            hit.id = Some(token.to_string());
        }
    }
    hit.reported = Some(ReportedHit {
        query_start,
        query_end,
        query_remaining,
        subject_start,
        subject_end,
        subject_remaining,
        orientation,
        pct_diverge,
        pct_delete,
        pct_insert,
    });
    Some(hit)
}

/// `[C ]name start chunk end`
fn parse_row(line: &str) -> Option<AlignmentRow<'_>> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() == 5 && tokens[0] == "C" {
        tokens.remove(0);
    }
    match *tokens.as_slice() {
        [_, start, chunk, end] if is_aligned_chunk(chunk) => Some(AlignmentRow {
            start: Some(start.parse().ok()?),
            chunk,
            end: Some(end.parse().ok()?),
        }),
        _ => None,
    }
}

/// Line-driven parser for cross_match output, RepeatMasker `.align`/`.cat` and `.out` files
#[derive(Debug)]
pub struct CrossmatchParser {
    options: ParseOptions,
    current: Option<HitAccumulator>,
    next_row: RowLabel,
}

impl CrossmatchParser {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            options: options.clone(),
            current: None,
            next_row: RowLabel::Query,
        }
    }

    fn close(&mut self) -> Result<Option<SearchResult>> {
        self.next_row = RowLabel::Query;
        match self.current.take() {
            Some(hit) => hit.finalize(&self.options, COMPONENT).map(Some),
            None => Ok(None),
        }
    }

    /// Trailer lines printed after each alignment
    fn consume_trailer(&mut self, line: &str) -> bool {
        let Some(hit) = self.current.as_mut() else {
            return false;
        };
        if line.starts_with("Matrix") {
            hit.matrix_name = value_after(line, "Matrix").map(str::to_string);
            true
        } else if line.starts_with("Kimura") {
            hit.kimura = line
                .rsplit_once('=')
                .and_then(|(_, value)| value.trim().parse::<f64>().ok());
            true
        } else {
            line.starts_with("Transitions /") || line.starts_with("Gap_init rate")
        }
    }
}

impl ReportParser for CrossmatchParser {
    fn consume(&mut self, line: &str) -> Result<Option<SearchResult>> {
        if let Some(hit) = parse_summary(line) {
            let closed = self.close()?;
            self.current = Some(hit);
            return Ok(closed);
        }

        if let Some(hit) = self.current.as_mut() {
            if let Some(row) = parse_row(line) {
                hit.add_row(self.next_row, &row);
                self.next_row = match self.next_row {
                    RowLabel::Query => RowLabel::Subject,
                    RowLabel::Subject => RowLabel::Query,
                };
                return Ok(None);
            }
        }

        if self.consume_trailer(line) {
            return Ok(None);
        }
        // blank lines and annotation rows
        if line.trim().is_empty() || line.starts_with(char::is_whitespace) {
            return Ok(None);
        }
        if self.current.as_ref().is_some_and(|hit| hit.has_rows()) {
            return self.close();
        }
        Ok(None)
    }

    fn finish(&mut self) -> Result<Option<SearchResult>> {
        self.close()
    }
}

/// Phil Green's cross_match (swat) aligner
#[derive(Debug)]
pub struct CrossmatchEngine;

impl SearchEngine for CrossmatchEngine {
    fn name(&self) -> &'static str {
        "crossmatch"
    }

    fn description(&self) -> &'static str {
        "cross_match banded Smith-Waterman (also reads RepeatMasker .align/.out)"
    }

    fn parameters(&self) -> EngineParameters {
        EngineParameters {
            program: "cross_match".to_string(),
            matrix: None,
            min_score: 225,
            gap_init: -25,
            ins_gap_ext: -5,
            del_gap_ext: -5,
            mask_level: Some(80),
            alignments: true,
        }
    }

    fn new_parser(&self, options: &ParseOptions) -> Box<dyn ReportParser> {
        Box::new(CrossmatchParser::new(options))
    }
}
