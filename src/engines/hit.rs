// hit.rs - Per-hit accumulation and finalisation shared by all report parsers

use crate::data::{Orientation, SearchResult};
use crate::engines::traits::ParseOptions;
use crate::error::{Result, SearchError};

/// Which row of a BLAST-style alignment block a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowLabel {
    Query,
    Subject,
}

/// One printed alignment row: optional start, aligned chunk, optional end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AlignmentRow<'a> {
    pub start: Option<usize>,
    pub chunk: &'a str,
    pub end: Option<usize>,
}

impl AlignmentRow<'_> {
    pub fn is_all_gaps(&self) -> bool {
        self.chunk.bytes().all(|b| b == b'-')
    }
}

pub(crate) fn is_aligned_chunk(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_alphabetic() || b == b'-' || b == b'*')
}

/// Parse `Query: 1 ACGT 4` / `Sbjct  10  AC-T  12` rows (coordinates optional)
pub(crate) fn parse_blast_row(line: &str) -> Option<(RowLabel, AlignmentRow<'_>)> {
    let mut tokens = line.split_whitespace();
    let label = match tokens.next()? {
        "Query" | "Query:" => RowLabel::Query,
        "Sbjct" | "Sbjct:" => RowLabel::Subject,
        _ => return None,
    };
    let rest: Vec<&str> = tokens.collect();
    let number = |t: &str| t.parse::<usize>().ok();
    let row = match *rest.as_slice() {
        [chunk] if is_aligned_chunk(chunk) => AlignmentRow {
            start: None,
            chunk,
            end: None,
        },
        [a, b] if number(a).is_some() && is_aligned_chunk(b) => AlignmentRow {
            start: number(a),
            chunk: b,
            end: None,
        },
        [a, b] if is_aligned_chunk(a) && number(b).is_some() => AlignmentRow {
            start: None,
            chunk: a,
            end: number(b),
        },
        [a, chunk, b] if is_aligned_chunk(chunk) && number(a).is_some() && number(b).is_some() => AlignmentRow {
            start: number(a),
            chunk,
            end: number(b),
        },
        _ => return None,
    };
    Some((label, row))
}

/// Text following `key` and an optional `=`, e.g. `value_after(" Expect = 1e-5,", "Expect")`
pub(crate) fn value_after<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let at = line.find(key)?;
    let rest = line[at + key.len()..].trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();
    let end = rest.find(|c: char| c == ',' || c.is_whitespace()).unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// BLAST e-values may be printed without mantissa (`e-120`)
pub(crate) fn parse_evalue(text: &str) -> Option<f64> {
    let text = text.trim().trim_end_matches(',');
    if text.starts_with('e') || text.starts_with('E') {
        format!("1{}", text).parse().ok()
    } else {
        text.parse().ok()
    }
}

/// Sequence length from `Length=311`, `Length = 311` or `(1,000 letters)`
pub(crate) fn parse_length(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("Length") {
        let rest = rest.trim_start();
        let value = rest.strip_prefix('=').unwrap_or(rest).split_whitespace().next()?;
        return value.replace(',', "").parse().ok();
    }
    let inner = trimmed.strip_prefix('(')?.strip_suffix("letters)")?;
    inner.trim().replace(',', "").parse().ok()
}

/// `(query_minus, subject_minus)` from `Strand=Plus/Minus` or `Strand = Plus / Minus`
pub(crate) fn parse_strand(line: &str) -> Option<(bool, bool)> {
    let at = line.find("Strand")?;
    let compact: String = line[at + "Strand".len()..].chars().filter(|c| !c.is_whitespace()).collect();
    let (query, subject) = compact.strip_prefix('=')?.split_once('/')?;
    let minus = |s: &str| -> Option<bool> {
        if s.starts_with("Minus") {
            Some(true)
        } else if s.starts_with("Plus") {
            Some(false)
        } else {
            None
        }
    };
    Some((minus(query)?, minus(subject)?))
}

/// Reading frame from `Frame = -2`
pub(crate) fn parse_frame(line: &str) -> Option<i32> {
    let value = value_after(line, "Frame")?;
    value.trim_start_matches('+').parse().ok()
}

/// Coordinates and percentages printed on a summary line
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ReportedHit {
    pub query_start: usize,
    pub query_end: usize,
    pub query_remaining: usize,
    pub subject_start: usize,
    pub subject_end: usize,
    pub subject_remaining: usize,
    pub orientation: Orientation,
    pub pct_diverge: f64,
    pub pct_delete: f64,
    pub pct_insert: f64,
}

/// Printed coordinates of one side of an alignment
#[derive(Debug, Clone, Copy, Default)]
struct Span {
    first: Option<usize>,
    last: Option<usize>,
    min: Option<usize>,
    max: Option<usize>,
}

impl Span {
    fn extend(&mut self, start: Option<usize>, end: Option<usize>) {
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            (Some(s), None) => (s, s),
            (None, Some(e)) => (e, e),
            (None, None) => return,
        };
        self.first.get_or_insert(start);
        self.last = Some(end);
        let low = start.min(end);
        let high = start.max(end);
        self.min = Some(self.min.map_or(low, |m| m.min(low)));
        self.max = Some(self.max.map_or(high, |m| m.max(high)));
    }

    fn bounds(&self) -> Option<(usize, usize)> {
        Some((self.min?, self.max?))
    }

    fn descending(&self) -> bool {
        matches!((self.first, self.last), (Some(f), Some(l)) if f > l)
    }

    fn directed(&self) -> bool {
        matches!((self.first, self.last), (Some(f), Some(l)) if f != l)
    }
}

/// State of the hit currently being read
#[derive(Debug, Clone, Default)]
pub(crate) struct HitAccumulator {
    pub query_name: String,
    pub subject_name: String,
    pub score: i32,
    pub evalue: Option<f64>,
    pub pvalue: Option<f64>,
    pub bit_score: Option<f64>,
    pub query_length: Option<usize>,
    pub subject_length: Option<usize>,
    /// Strand line said the subject is on the minus strand
    pub subject_minus: bool,
    pub frame: Option<i32>,
    /// Subject printed as its reverse complement entry
    pub anti: bool,
    pub protein_subject: bool,
    pub matrix_name: Option<String>,
    pub kimura: Option<f64>,
    pub id: Option<String>,
    pub overlap: bool,
    pub reported: Option<ReportedHit>,
    query_string: String,
    subject_string: String,
    query_span: Span,
    subject_span: Span,
}

impl HitAccumulator {
    pub fn new(query_name: &str, subject_name: &str) -> Self {
        Self {
            query_name: query_name.to_string(),
            subject_name: subject_name.to_string(),
            ..Default::default()
        }
    }

    pub fn has_rows(&self) -> bool {
        !self.query_string.is_empty() || !self.subject_string.is_empty()
    }

    /// Append a row; gap-only chunks leave the coordinates alone
    pub fn add_row(&mut self, label: RowLabel, row: &AlignmentRow<'_>) {
        let (string, span) = match label {
            RowLabel::Query => (&mut self.query_string, &mut self.query_span),
            RowLabel::Subject => (&mut self.subject_string, &mut self.subject_span),
        };
        string.push_str(row.chunk);
        if !row.is_all_gaps() {
            span.extend(row.start, row.end);
        }
    }

    fn corrupt(&self, component: &'static str, message: impl Into<String>) -> SearchError {
        SearchError::CorruptAlignment {
            component,
            query: self.query_name.clone(),
            subject: self.subject_name.clone(),
            message: message.into(),
        }
    }

    /// Turn the accumulated state into a normalised record
    pub fn finalize(self, options: &ParseOptions, component: &'static str) -> Result<SearchResult> {
        if self.query_string.len() != self.subject_string.len() {
            return Err(self.corrupt(
                component,
                format!(
                    "aligned strings differ in length ({} vs {})",
                    self.query_string.len(),
                    self.subject_string.len()
                ),
            ));
        }

        let mut record = SearchResult {
            query_name: self.query_name.clone(),
            subject_name: self.subject_name.clone(),
            score: self.score,
            evalue: self.evalue,
            pvalue: self.pvalue,
            bit_score: self.bit_score,
            matrix_name: self.matrix_name.clone().or_else(|| options.matrix_name.clone()),
            pct_kimura_diverge: self.kimura,
            id: self.id.clone(),
            overlap: self.overlap,
            ..Default::default()
        };

        if let Some(reported) = &self.reported {
            record.query_start = reported.query_start;
            record.query_end = reported.query_end;
            record.query_remaining = reported.query_remaining;
            record.subject_start = reported.subject_start;
            record.subject_end = reported.subject_end;
            record.subject_remaining = reported.subject_remaining;
            record.orientation = reported.orientation;
            record.pct_diverge = reported.pct_diverge;
            record.pct_delete = reported.pct_delete;
            record.pct_insert = reported.pct_insert;
            record.query_string = self.query_string;
            record.subject_string = self.subject_string;
        } else {
            let (q_min, q_max) = self
                .query_span
                .bounds()
                .ok_or_else(|| self.corrupt(component, "hit has no query coordinates"))?;
            let (s_min, s_max) = self
                .subject_span
                .bounds()
                .ok_or_else(|| self.corrupt(component, "hit has no subject coordinates"))?;
            let query_reversed = self.query_span.descending();

            let orientation = if self.protein_subject {
                if self.subject_span.descending() {
                    return Err(self.corrupt(component, "descending subject coordinates in a protein alignment"));
                }
                if query_reversed || self.frame.is_some_and(|f| f < 0) {
                    Orientation::Complement
                } else {
                    Orientation::Forward
                }
            } else {
                let subject_reversed = self.subject_span.descending()
                    || (!self.subject_span.directed() && self.subject_minus);
                if query_reversed == subject_reversed {
                    Orientation::Forward
                } else {
                    Orientation::Complement
                }
            };

            record.query_string = self.query_string;
            record.subject_string = self.subject_string;
            if query_reversed && !self.protein_subject {
                // keep the query forward
                record.reverse_complement_alignment();
            }
            record.orientation = orientation;
            record.query_start = q_min;
            record.query_end = q_max;
            record.subject_start = s_min;
            record.subject_end = s_max;

            if self.anti {
                let length = self.subject_length.ok_or_else(|| SearchError::CorruptAlignment {
                    component,
                    query: record.query_name.clone(),
                    subject: record.subject_name.clone(),
                    message: "(anti) subject without a length".to_string(),
                })?;
                if s_max > length {
                    return Err(SearchError::CorruptAlignment {
                        component,
                        query: record.query_name.clone(),
                        subject: record.subject_name.clone(),
                        message: format!("subject end {} beyond length {}", s_max, length),
                    });
                }
                record.subject_start = length - s_max + 1;
                record.subject_end = length - s_min + 1;
                record.orientation = record.orientation.flipped();
            }

            record.query_remaining = self
                .query_length
                .map_or(0, |len| len.saturating_sub(record.query_end));
            record.subject_remaining = self
                .subject_length
                .map_or(0, |len| len.saturating_sub(record.subject_end));
        }

        record.recompute_percentages();
        if options.exclude_alignments {
            record.clear_alignment();
        }
        Ok(record)
    }
}
