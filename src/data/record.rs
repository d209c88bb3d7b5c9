// record.rs - Alignment result record shared by every search engine

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::core::divergence::{calc_kimura_divergence, DivergenceReport};
use crate::core::sequence::{is_gap, mutation_type, reverse_complement, MutationType};
use crate::error::{Result, SearchError};

/// Width of the name column in alignment blocks
const ALIGN_NAME_WIDTH: usize = 13;
/// Aligned columns per alignment block row
const ALIGN_CHUNK: usize = 50;

/// Strand of the subject relative to the (always forward) query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Forward,
    Complement,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Complement,
            Orientation::Complement => Orientation::Forward,
        }
    }

    pub fn is_complement(self) -> bool {
        self == Orientation::Complement
    }
}

/// One local alignment between a query region and a subject (consensus) region.
///
/// Coordinates are 1-based and inclusive with `start <= end` on both sides.
/// For `Complement` hits the aligned strings keep the query forward, so the
/// subject row holds the reverse complement of the consensus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query_name: String,
    pub query_sequence_id: Option<String>,
    pub query_start: usize,
    pub query_end: usize,
    pub query_remaining: usize,
    pub subject_name: String,
    pub subject_start: usize,
    pub subject_end: usize,
    pub subject_remaining: usize,
    pub orientation: Orientation,
    pub score: i32,
    pub pct_diverge: f64,
    pub pct_insert: f64,
    pub pct_delete: f64,
    pub pct_kimura_diverge: Option<f64>,
    pub query_string: String,
    pub subject_string: String,
    pub matrix_name: Option<String>,
    pub evalue: Option<f64>,
    pub pvalue: Option<f64>,
    pub bit_score: Option<f64>,
    pub id: Option<String>,
    pub lineage_id: Option<String>,
    pub overlap: bool,
}

/// Per-column counts used by the percentage and trailer computations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnCounts {
    pub aligned: usize,
    pub mismatches: usize,
    pub transitions: usize,
    pub transversions: usize,
    /// Columns with a gap in the subject row
    pub insert_columns: usize,
    /// Columns with a gap in the query row
    pub delete_columns: usize,
    /// Number of gap runs on either side
    pub gap_runs: usize,
    pub query_bases: usize,
    pub subject_bases: usize,
}

impl ColumnCounts {
    pub fn from_strings(query: &str, subject: &str) -> Self {
        let mut counts = ColumnCounts::default();
        let mut prev_gap: Option<bool> = None; // Some(true) = query gap run, Some(false) = subject gap run
        for (q, s) in query.bytes().zip(subject.bytes()) {
            if !is_gap(q) {
                counts.query_bases += 1;
            }
            if !is_gap(s) {
                counts.subject_bases += 1;
            }
            let gap_side = if is_gap(q) {
                counts.delete_columns += 1;
                Some(true)
            } else if is_gap(s) {
                counts.insert_columns += 1;
                Some(false)
            } else {
                None
            };
            if gap_side.is_some() && gap_side != prev_gap {
                counts.gap_runs += 1;
            }
            prev_gap = gap_side;
            if gap_side.is_none() {
                counts.aligned += 1;
                match mutation_type(q, s) {
                    MutationType::Match => {}
                    MutationType::Transition => {
                        counts.mismatches += 1;
                        counts.transitions += 1;
                    }
                    MutationType::Transversion => {
                        counts.mismatches += 1;
                        counts.transversions += 1;
                    }
                    _ => counts.mismatches += 1,
                }
            }
        }
        counts
    }
}

impl SearchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_alignment(&self) -> bool {
        !self.query_string.is_empty() && !self.subject_string.is_empty()
    }

    /// Repeat name without its class (`AluY#SINE/Alu` -> `AluY`)
    pub fn subject_hit_name(&self) -> &str {
        match self.subject_name.split_once('#') {
            Some((name, _)) => name,
            None => &self.subject_name,
        }
    }

    /// Repeat class after `#`, if any
    pub fn subject_class_name(&self) -> Option<&str> {
        self.subject_name.split_once('#').map(|(_, class)| class)
    }

    /// Class part of the repeat classification (`SINE/Alu` -> `SINE`)
    pub fn repeat_class(&self) -> &str {
        match self.subject_class_name() {
            Some(class) => class.split_once('/').map_or(class, |(class, _)| class),
            None => "unknown",
        }
    }

    /// Subclass part of the repeat classification (`SINE/Alu` -> `Alu`)
    pub fn repeat_subclass(&self) -> &str {
        self.subject_class_name()
            .and_then(|class| class.split_once('/'))
            .map_or("unknown", |(_, subclass)| subclass)
    }

    /// Simple repeats carry no meaningful divergence from their consensus
    pub fn is_simple_repeat(&self) -> bool {
        self.repeat_class() == "Simple_repeat"
    }

    /// Kimura divergence when annotated, else the raw substitution level
    pub fn divergence(&self) -> f64 {
        self.pct_kimura_diverge.unwrap_or(self.pct_diverge)
    }

    pub fn query_length(&self) -> usize {
        (self.query_end + 1).saturating_sub(self.query_start)
    }

    pub fn subject_length(&self) -> usize {
        (self.subject_end + 1).saturating_sub(self.subject_start)
    }

    pub fn column_counts(&self) -> ColumnCounts {
        ColumnCounts::from_strings(&self.query_string, &self.subject_string)
    }

    /// Recompute divergence, insertion and deletion percentages from the aligned strings
    pub fn recompute_percentages(&mut self) {
        if !self.has_alignment() {
            return;
        }
        let counts = self.column_counts();
        self.pct_diverge = percent(counts.mismatches, counts.aligned);
        self.pct_insert = percent(counts.insert_columns, counts.query_bases);
        self.pct_delete = percent(counts.delete_columns, counts.query_bases);
    }

    /// Reverse-complement both aligned strings and flip the orientation
    pub fn reverse_complement_alignment(&mut self) {
        self.query_string = reverse_complement(&self.query_string);
        self.subject_string = reverse_complement(&self.subject_string);
        self.orientation = self.orientation.flipped();
    }

    /// Kimura divergence of the aligned strings
    pub fn kimura_divergence(&self, div_cpg_mod: bool) -> Result<DivergenceReport> {
        calc_kimura_divergence(&self.query_string, &self.subject_string, div_cpg_mod)
    }

    /// Drop the aligned strings once statistics no longer need them
    pub fn clear_alignment(&mut self) {
        self.query_string.clear();
        self.subject_string.clear();
    }

    pub(crate) fn corrupt(&self, component: &'static str, message: impl Into<String>) -> SearchError {
        SearchError::CorruptAlignment {
            component,
            query: format!("{}:{}-{}", self.query_name, self.query_start, self.query_end),
            subject: format!("{}:{}-{}", self.subject_name, self.subject_start, self.subject_end),
            message: message.into(),
        }
    }

    /// New record covering alignment columns `first_col..=last_col`
    pub fn sub_alignment(&self, first_col: usize, last_col: usize) -> Result<SearchResult> {
        let len = self.query_string.len();
        if !self.has_alignment() || self.subject_string.len() != len {
            return Err(self.corrupt("SearchResult", "sub_alignment needs aligned strings of equal length"));
        }
        if first_col > last_col || last_col >= len {
            return Err(self.corrupt(
                "SearchResult",
                format!("column range {}..={} outside alignment of {} columns", first_col, last_col, len),
            ));
        }

        let before = ColumnCounts::from_strings(&self.query_string[..first_col], &self.subject_string[..first_col]);
        let query_part = &self.query_string[first_col..=last_col];
        let subject_part = &self.subject_string[first_col..=last_col];
        let inside = ColumnCounts::from_strings(query_part, subject_part);
        if inside.query_bases == 0 || inside.subject_bases == 0 {
            return Err(self.corrupt("SearchResult", "column range holds only gaps on one side"));
        }

        let mut part = self.clone();
        part.query_start = self.query_start + before.query_bases;
        part.query_end = part.query_start + inside.query_bases - 1;
        part.query_remaining = self.query_remaining + (self.query_end - part.query_end);

        // the subject row of a complement hit runs down the consensus
        match self.orientation {
            Orientation::Forward => {
                part.subject_start = self.subject_start + before.subject_bases;
                part.subject_end = part.subject_start + inside.subject_bases - 1;
            }
            Orientation::Complement => {
                part.subject_end = self.subject_end - before.subject_bases;
                part.subject_start = part.subject_end + 1 - inside.subject_bases;
            }
        }
        part.subject_remaining = self.subject_remaining + (self.subject_end - part.subject_end);

        part.query_string = query_part.to_string();
        part.subject_string = subject_part.to_string();
        part.pct_kimura_diverge = None;
        part.recompute_percentages();
        Ok(part)
    }

    /// New record covering query positions `start..=end` of this hit.
    ///
    /// Aligned records are cut at the matching columns. A piece whose query
    /// bases face only subject gaps, or a record without alignment, keeps
    /// trimmed coordinates only. The annotated divergence is carried over.
    pub fn trim_query(&self, start: usize, end: usize) -> Result<SearchResult> {
        if start > end || start < self.query_start || end > self.query_end {
            return Err(self.corrupt(
                "SearchResult",
                format!("query range {}-{} outside the hit", start, end),
            ));
        }

        let mut columns = (None, None);
        let mut position = self.query_start;
        for (col, base) in self.query_string.bytes().enumerate() {
            if is_gap(base) {
                continue;
            }
            if position == start {
                columns.0 = Some(col);
            }
            if position == end {
                columns.1 = Some(col);
                break;
            }
            position += 1;
        }

        let cut = match columns {
            (Some(first), Some(last)) if self.has_alignment() => self.sub_alignment(first, last).ok(),
            _ => None,
        };
        let mut part = match cut {
            Some(part) => part,
            None => {
                let mut part = self.clone();
                part.clear_alignment();
                part.query_start = start;
                part.query_end = end;
                part.query_remaining = self.query_remaining + (self.query_end - end);
                part
            }
        };
        part.pct_kimura_diverge = self.pct_kimura_diverge;
        Ok(part)
    }

    /// Subject coordinates in print order: (start, end) for forward hits, (end, start) for complement
    fn subject_print_span(&self) -> (usize, usize) {
        match self.orientation {
            Orientation::Forward => (self.subject_start, self.subject_end),
            Orientation::Complement => (self.subject_end, self.subject_start),
        }
    }

    /// BED6 row (0-based half-open) followed by class, subclass, divergence and id.
    ///
    /// Simple repeats without a Kimura value print `-1.0`.
    pub fn to_bed_line(&self) -> String {
        let divergence = if self.pct_kimura_diverge.is_none() && self.is_simple_repeat() {
            "-1.0".to_string()
        } else {
            format!("{:.2}", self.divergence())
        };
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query_name,
            self.query_start.saturating_sub(1),
            self.query_end,
            self.subject_hit_name().replace('/', "_"),
            self.score,
            if self.orientation.is_complement() { '-' } else { '+' },
            self.repeat_class(),
            self.repeat_subclass(),
            divergence,
            self.id.as_deref().unwrap_or("."),
        )
    }

    /// RepeatMasker `.out` style table row
    pub fn to_out_line(&self) -> String {
        let strand = if self.orientation.is_complement() { "C" } else { "+" };
        let class = self.subject_class_name().unwrap_or("Unspecified");
        let subject_cols = match self.orientation {
            Orientation::Forward => format!(
                "{:>7} {:>7} {:>7}",
                self.subject_start,
                self.subject_end,
                format!("({})", self.subject_remaining)
            ),
            Orientation::Complement => format!(
                "{:>7} {:>7} {:>7}",
                format!("({})", self.subject_remaining),
                self.subject_end,
                self.subject_start
            ),
        };
        let mut line = format!(
            "{:>6} {:>5.1} {:>4.1} {:>4.1}  {:<16} {:>9} {:>9} {:>11} {} {:<16} {:<18} {}",
            self.score,
            self.pct_diverge,
            self.pct_delete,
            self.pct_insert,
            self.query_name,
            self.query_start,
            self.query_end,
            format!("({})", self.query_remaining),
            strand,
            self.subject_hit_name(),
            class,
            subject_cols
        );
        if let Some(id) = &self.id {
            let _ = write!(line, " {:>6}", id);
        }
        if self.overlap {
            line.push_str(" *");
        }
        line
    }

    /// cross_match style summary line used at the top of alignment blocks
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} {:.2} {:.2} {:.2} {} {} {} ({})",
            self.score,
            self.pct_diverge,
            self.pct_delete,
            self.pct_insert,
            self.query_name,
            self.query_start,
            self.query_end,
            self.query_remaining
        );
        match self.orientation {
            Orientation::Forward => {
                let _ = write!(
                    line,
                    " {} {} {} ({})",
                    self.subject_name, self.subject_start, self.subject_end, self.subject_remaining
                );
            }
            Orientation::Complement => {
                let _ = write!(
                    line,
                    " C {} ({}) {} {}",
                    self.subject_name, self.subject_remaining, self.subject_end, self.subject_start
                );
            }
        }
        if let Some(id) = &self.id {
            let _ = write!(line, " {}", id);
        }
        if self.overlap {
            line.push_str(" *");
        }
        line
    }

    /// Human-readable alignment block in cross_match layout
    pub fn to_align_block(&self) -> String {
        let mut out = self.summary_line();
        out.push_str("\n\n");
        if !self.has_alignment() {
            return out;
        }

        let query = self.query_string.as_bytes();
        let subject = self.subject_string.as_bytes();
        let subject_prefix = if self.orientation.is_complement() { "C " } else { "  " };
        let mut q_pos = self.query_start.saturating_sub(1);
        let (mut s_pos, s_step): (i64, i64) = match self.orientation {
            Orientation::Forward => (self.subject_start as i64 - 1, 1),
            Orientation::Complement => (self.subject_end as i64 + 1, -1),
        };

        for (q_chunk, s_chunk) in query.chunks(ALIGN_CHUNK).zip(subject.chunks(ALIGN_CHUNK)) {
            let q_bases = q_chunk.iter().filter(|&&b| !is_gap(b)).count();
            let s_bases = s_chunk.iter().filter(|&&b| !is_gap(b)).count() as i64;

            let (q_first, q_last) = if q_bases == 0 {
                (q_pos, q_pos)
            } else {
                (q_pos + 1, q_pos + q_bases)
            };
            q_pos += q_bases;
            let (s_first, s_last) = if s_bases == 0 {
                (s_pos, s_pos)
            } else {
                (s_pos + s_step, s_pos + s_step * s_bases)
            };
            s_pos += s_step * s_bases;

            let annotation: String = q_chunk
                .iter()
                .zip(s_chunk.iter())
                .map(|(&q, &s)| mutation_type(q, s).symbol())
                .collect();

            let _ = writeln!(
                out,
                "  {} {:>10} {} {}",
                block_name(&self.query_name),
                q_first,
                String::from_utf8_lossy(q_chunk),
                q_last
            );
            let _ = writeln!(out, "{:width$}{}", "", annotation, width = 2 + ALIGN_NAME_WIDTH + 1 + 10 + 1);
            let _ = writeln!(
                out,
                "{}{} {:>10} {} {}",
                subject_prefix,
                block_name(&self.subject_name),
                s_first,
                String::from_utf8_lossy(s_chunk),
                s_last
            );
            out.push('\n');
        }

        let counts = self.column_counts();
        let _ = writeln!(out, "Matrix = {}", self.matrix_name.as_deref().unwrap_or("Unknown"));
        if let Some(kimura) = self.pct_kimura_diverge {
            let _ = writeln!(out, "Kimura = {:.2}", kimura);
        }
        let ratio = if counts.transversions > 0 {
            counts.transitions as f64 / counts.transversions as f64
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "Transitions / transversions = {:.2} ({}/{})",
            ratio, counts.transitions, counts.transversions
        );
        let gap_bases = counts.insert_columns + counts.delete_columns;
        let gap_rate = if counts.query_bases > 1 {
            counts.gap_runs as f64 / (counts.query_bases - 1) as f64
        } else {
            0.0
        };
        let avg_gap = if counts.gap_runs > 0 {
            gap_bases as f64 / counts.gap_runs as f64
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "Gap_init rate = {:.2} ({} / {}), avg. gap size = {:.2} ({} / {})",
            gap_rate,
            counts.gap_runs,
            counts.query_bases.saturating_sub(1),
            avg_gap,
            gap_bases,
            counts.gap_runs
        );
        out
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn block_name(name: &str) -> String {
    let truncated: String = name.chars().take(ALIGN_NAME_WIDTH).collect();
    format!("{:<width$}", truncated, width = ALIGN_NAME_WIDTH)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn sample_record() -> SearchResult {
        let mut record = SearchResult {
            query_name: "chr1".to_string(),
            query_start: 101,
            query_end: 110,
            query_remaining: 890,
            subject_name: "AluY#SINE/Alu".to_string(),
            subject_start: 20,
            subject_end: 29,
            subject_remaining: 282,
            score: 42,
            query_string: "ACGTA-CGTTA".to_string(),
            subject_string: "ACGCACCG-TA".to_string(),
            matrix_name: Some("14p41g.matrix".to_string()),
            ..Default::default()
        };
        record.recompute_percentages();
        record
    }

    #[test]
    fn test_hit_and_class_names() {
        let record = sample_record();
        assert_eq!(record.subject_hit_name(), "AluY");
        assert_eq!(record.subject_class_name(), Some("SINE/Alu"));

        let plain = SearchResult {
            subject_name: "L1PA2".to_string(),
            ..Default::default()
        };
        assert_eq!(plain.subject_hit_name(), "L1PA2");
        assert_eq!(plain.subject_class_name(), None);
    }

    #[test]
    fn test_repeat_classification() {
        let record = sample_record();
        assert_eq!((record.repeat_class(), record.repeat_subclass()), ("SINE", "Alu"));
        assert!(!record.is_simple_repeat());

        let simple = SearchResult {
            subject_name: "(CA)n#Simple_repeat".to_string(),
            pct_diverge: 4.5,
            ..Default::default()
        };
        assert_eq!((simple.repeat_class(), simple.repeat_subclass()), ("Simple_repeat", "unknown"));
        assert!(simple.is_simple_repeat());
        assert_eq!(simple.divergence(), 4.5);

        let bare = SearchResult::default();
        assert_eq!((bare.repeat_class(), bare.repeat_subclass()), ("unknown", "unknown"));
    }

    #[test]
    fn test_trim_query_cuts_alignment_columns() {
        let mut record = sample_record();
        record.pct_kimura_diverge = Some(12.5);

        let part = record.trim_query(103, 108).unwrap();
        assert_eq!((part.query_start, part.query_end, part.query_remaining), (103, 108, 892));
        assert_eq!((part.subject_start, part.subject_end), (22, 27));
        assert_eq!(part.query_string, "GTA-CGT");
        assert_eq!(part.subject_string, "GCACCG-");
        assert_eq!(part.pct_kimura_diverge, Some(12.5));

        assert!(record.trim_query(100, 105).is_err());
        assert!(record.trim_query(106, 105).is_err());
    }

    #[test]
    fn test_trim_query_without_alignment_keeps_coordinates() {
        let mut record = sample_record();
        record.clear_alignment();
        let part = record.trim_query(101, 104).unwrap();
        assert_eq!((part.query_start, part.query_end, part.query_remaining), (101, 104, 896));
        assert_eq!((part.subject_start, part.subject_end), (20, 29));
        assert!(!part.has_alignment());
    }

    #[test]
    fn test_bed_line() {
        let mut record = sample_record();
        record.orientation = Orientation::Complement;
        record.pct_kimura_diverge = Some(11.5);
        record.id = Some("7".to_string());
        assert_eq!(record.to_bed_line(), "chr1\t100\t110\tAluY\t42\t-\tSINE\tAlu\t11.50\t7");

        let simple = SearchResult {
            query_name: "chr2".to_string(),
            query_start: 1,
            query_end: 40,
            subject_name: "ALR/Alpha#Simple_repeat".to_string(),
            score: 300,
            ..Default::default()
        };
        assert_eq!(simple.to_bed_line(), "chr2\t0\t40\tALR_Alpha\t300\t+\tSimple_repeat\tunknown\t-1.0\t.");
    }

    #[test]
    fn test_recompute_percentages() {
        let record = sample_record();
        // 9 aligned columns, one T/C mismatch; 10 query bases, one subject gap, one query gap
        assert!((record.pct_diverge - 100.0 / 9.0).abs() < 1e-9);
        assert!((record.pct_insert - 10.0).abs() < 1e-9);
        assert!((record.pct_delete - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentages_untouched_without_alignment() {
        let mut record = SearchResult {
            pct_diverge: 12.5,
            ..Default::default()
        };
        record.recompute_percentages();
        assert_eq!(record.pct_diverge, 12.5);
    }

    #[test]
    fn test_sub_alignment_forward() {
        let record = sample_record();
        let part = record.sub_alignment(2, 7).unwrap();
        assert_eq!(part.query_string, "GTA-CG");
        assert_eq!(part.subject_string, "GCACCG");
        assert_eq!((part.query_start, part.query_end), (103, 107));
        assert_eq!(part.query_remaining, 893);
        assert_eq!((part.subject_start, part.subject_end), (22, 27));
        assert_eq!(part.subject_remaining, 284);
    }

    #[test]
    fn test_sub_alignment_complement_counts_down() {
        let mut record = sample_record();
        record.orientation = Orientation::Complement;
        let part = record.sub_alignment(2, 7).unwrap();
        assert_eq!((part.subject_start, part.subject_end), (22, 27));
        let tail = record.sub_alignment(0, 1).unwrap();
        assert_eq!((tail.subject_start, tail.subject_end), (28, 29));
        assert_eq!(tail.subject_remaining, 282);
    }

    #[test]
    fn test_sub_alignment_rejects_bad_ranges() {
        let record = sample_record();
        assert!(record.sub_alignment(5, 3).is_err());
        assert!(record.sub_alignment(0, 11).is_err());
        assert!(record.sub_alignment(5, 5).is_err()); // gap-only query column
    }

    #[test]
    fn test_out_line_layout() {
        let mut record = sample_record();
        record.orientation = Orientation::Complement;
        record.overlap = true;
        let line = record.to_out_line();
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields[4], "chr1");
        assert_eq!(fields[7], "(890)");
        assert_eq!(fields[8], "C");
        assert_eq!(fields[9], "AluY");
        assert_eq!(fields[10], "SINE/Alu");
        assert_eq!(&fields[11..14], &["(282)", "29", "20"]);
        assert_eq!(fields.last(), Some(&"*"));
    }

    #[test]
    fn test_align_block_layout() {
        let mut record = sample_record();
        record.pct_kimura_diverge = Some(11.5);
        let block = record.to_align_block();
        let lines: Vec<&str> = block.lines().collect();
        assert!(lines[0].starts_with("42 11.11 10.00 10.00 chr1 101 110 (890) AluY#SINE/Alu 20 29 (282)"));
        assert_eq!(lines[2], "  chr1                 101 ACGTA-CGTTA 110");
        assert_eq!(lines[3], format!("{}   i -  -  ", " ".repeat(27)));
        assert_eq!(lines[4], "  AluY#SINE/Alu         20 ACGCACCG-TA 29");
        assert!(block.contains("Matrix = 14p41g.matrix"));
        assert!(block.contains("Kimura = 11.50"));
        assert!(!block.contains("divCpGMod"));
        assert!(block.contains("Transitions / transversions = 0.00 (1/0)"));
        assert!(block.contains("avg. gap size = 1.00 (2 / 2)"));
    }

    #[test]
    fn test_complement_block_numbers_subject_downward() {
        let mut record = sample_record();
        record.orientation = Orientation::Complement;
        let block = record.to_align_block();
        assert!(block.contains("C AluY#SINE/Alu         29 ACGCACCG-TA 20"));
    }

    proptest! {
        #[test]
        fn reverse_complement_twice_is_identity(
            cols in proptest::collection::vec((0usize..23, 0usize..23), 1..60)
        ) {
            let alphabet = b"ACGTURYKMSWBDHVNX-acgtn";
            let mut record = sample_record();
            record.query_string = cols.iter().map(|(q, _)| alphabet[*q] as char).collect();
            record.subject_string = cols.iter().map(|(_, s)| alphabet[*s] as char).collect();
            let original = record.clone();
            record.reverse_complement_alignment();
            prop_assert_ne!(record.orientation, original.orientation);
            record.reverse_complement_alignment();
            prop_assert_eq!(record, original);
        }
    }
}
