// wublast.rs - WU-BLAST / AB-BLAST report parser, shared by the BlastX and DeCypher engines

use crate::data::SearchResult;
use crate::engines::hit::{
    parse_blast_row, parse_evalue, parse_frame, parse_length, parse_strand, value_after, AlignmentRow, HitAccumulator,
    RowLabel,
};
use crate::engines::traits::{EngineParameters, ParseOptions, ReportParser, SearchEngine};
use crate::error::{Result, SearchError};

/// Report dialects sharing the WU-BLAST grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WuFlavor {
    /// Nucleotide vs nucleotide (wublastn / AB-BLASTN)
    Blastn,
    /// Translated query vs protein subject
    BlastX,
    /// TimeLogic DeCypher accelerated output
    DeCypher,
}

impl WuFlavor {
    pub fn component(self) -> &'static str {
        match self {
            WuFlavor::Blastn => "WuBlastParser",
            WuFlavor::BlastX => "WuBlastXParser",
            WuFlavor::DeCypher => "DecypherParser",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthContext {
    Query,
    Subject,
}

/// Line-driven parser for WU-BLAST style reports
#[derive(Debug)]
pub struct WuBlastParser {
    flavor: WuFlavor,
    options: ParseOptions,
    query_name: Option<String>,
    query_length: Option<usize>,
    subject_name: Option<String>,
    subject_length: Option<usize>,
    subject_anti: bool,
    length_context: LengthContext,
    current: Option<HitAccumulator>,
    in_alignment: bool,
}

impl WuBlastParser {
    pub fn new(flavor: WuFlavor, options: &ParseOptions) -> Self {
        Self {
            flavor,
            options: options.clone(),
            query_name: None,
            query_length: None,
            subject_name: None,
            subject_length: None,
            subject_anti: false,
            length_context: LengthContext::Query,
            current: None,
            in_alignment: false,
        }
    }

    fn component(&self) -> &'static str {
        self.flavor.component()
    }

    fn close(&mut self) -> Result<Option<SearchResult>> {
        self.in_alignment = false;
        match self.current.take() {
            Some(hit) => hit.finalize(&self.options, self.flavor.component()).map(Some),
            None => Ok(None),
        }
    }

    /// ` Score = 500 (87.2 bits), Expect = 1.0e-70, P = 1.0e-70`
    fn start_hit(&mut self, line: &str) -> Result<()> {
        let component = self.component();
        let query = self
            .query_name
            .as_deref()
            .ok_or_else(|| SearchError::grammar(component, line, "Score line before any Query= line"))?;
        let subject = self
            .subject_name
            .as_deref()
            .ok_or_else(|| SearchError::grammar(component, line, "Score line before any subject header"))?;

        let raw = value_after(line, "Score")
            .and_then(|v| v.parse::<i32>().ok())
            .ok_or_else(|| SearchError::grammar(component, line, "unreadable raw score"))?;
        let bits = line
            .split_once('(')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| SearchError::grammar(component, line, "unreadable bit score"))?;

        let mut hit = HitAccumulator::new(query, subject);
        hit.score = raw;
        hit.bit_score = Some(bits);
        hit.evalue = value_after(line, "Expect").and_then(parse_evalue);
        hit.pvalue = line
            .split(',')
            .map(str::trim)
            .find(|part| part.starts_with("P") || part.starts_with("Sum P"))
            .and_then(|part| part.split_once('='))
            .and_then(|(_, value)| parse_evalue(value));
        hit.query_length = self.query_length;
        hit.subject_length = self.subject_length;
        hit.anti = self.subject_anti;
        hit.protein_subject = self.flavor == WuFlavor::BlastX;
        self.current = Some(hit);
        Ok(())
    }

    /// DeCypher sometimes prints ascending subject rows one base backwards
    fn checked_row<'a>(&self, line: &str, label: RowLabel, row: AlignmentRow<'a>) -> Result<AlignmentRow<'a>> {
        if self.flavor != WuFlavor::DeCypher || label != RowLabel::Subject || row.is_all_gaps() {
            return Ok(row);
        }
        let minus = self.current.as_ref().is_some_and(|hit| hit.subject_minus);
        match (row.start, row.end) {
            (Some(start), Some(end)) if end < start && !minus => {
                if start - end == 1 {
                    Ok(AlignmentRow {
                        start: Some(end),
                        end: Some(start),
                        ..row
                    })
                } else {
                    Err(SearchError::grammar(
                        self.component(),
                        line,
                        format!("subject coordinates descend from {} to {} on a plus strand hit", start, end),
                    ))
                }
            }
            _ => Ok(row),
        }
    }
}

impl ReportParser for WuBlastParser {
    fn consume(&mut self, line: &str) -> Result<Option<SearchResult>> {
        if let Some((label, row)) = parse_blast_row(line) {
            let row = self.checked_row(line, label, row)?;
            let component = self.component();
            let hit = self
                .current
                .as_mut()
                .ok_or_else(|| SearchError::grammar(component, line, "alignment row outside a hit"))?;
            hit.add_row(label, &row);
            self.in_alignment = true;
            return Ok(None);
        }

        let trimmed = line.trim_start();
        if self.in_alignment && (trimmed.is_empty() || line.starts_with("     ")) {
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
            self.subject_anti = rest.contains("(anti)");
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
            return self.close();
        }
        if let Some(hit) = self.current.as_mut() {
            if let Some((_, subject_minus)) = parse_strand(line) {
                hit.subject_minus = subject_minus;
            }
            if let Some(frame) = parse_frame(line) {
                hit.frame = Some(frame);
            }
        }
        Ok(None)
    }

    fn finish(&mut self) -> Result<Option<SearchResult>> {
        self.close()
    }
}

/// WU-BLAST / AB-BLAST nucleotide searches
#[derive(Debug)]
pub struct WuBlastEngine;

impl SearchEngine for WuBlastEngine {
    fn name(&self) -> &'static str {
        "wublast"
    }

    fn description(&self) -> &'static str {
        "WU-BLAST / AB-BLAST blastn"
    }

    fn parameters(&self) -> EngineParameters {
        EngineParameters {
            program: "blastn".to_string(),
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
        Box::new(WuBlastParser::new(WuFlavor::Blastn, options))
    }
}
