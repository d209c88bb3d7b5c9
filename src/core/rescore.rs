// rescore.rs - Affine-gap rescoring with CpG adjustment, xDrop fragmentation and complexity correction

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::divergence::MutationTally;
use crate::core::matrix::ScoringMatrix;
use crate::core::sequence::is_gap;
use crate::data::record::{ColumnCounts, SearchResult};
use crate::error::Result;

/// Trailing xDrop segments shorter than this are dropped
const MIN_TRAILING_FRAGMENT: usize = 6;

/// Rescoring parameters; penalties are added to the score and are negative by convention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescoreParams {
    pub gap_open: i32,
    pub ins_gap_ext: i32,
    pub del_gap_ext: i32,
    pub score_cpg_mod: bool,
    pub div_cpg_mod: bool,
    pub complexity_adjust: bool,
    pub x_drop: Option<i32>,
}

impl Default for RescoreParams {
    fn default() -> Self {
        Self {
            gap_open: -25,
            ins_gap_ext: -5,
            del_gap_ext: -5,
            score_cpg_mod: false,
            div_cpg_mod: false,
            complexity_adjust: false,
            x_drop: None,
        }
    }
}

/// Scores and statistics produced by [`rescore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescoreResult {
    pub score: i32,
    pub kimura: f64,
    pub cpg_sites: u32,
    pub pct_insert: f64,
    pub pct_delete: f64,
    /// Running score after each alignment column
    pub position_scores: Vec<i32>,
    /// (first column, peak column) of every xDrop fragment
    pub xdrop_fragments: Vec<(usize, usize)>,
    pub well_characterized_bases: u32,
    pub transitions: f64,
    pub transversions: u32,
}

fn validate(record: &SearchResult) -> Result<()> {
    if !record.has_alignment() {
        return Err(record.corrupt("AlignmentRescorer", "aligned strings are empty"));
    }
    if record.query_string.len() != record.subject_string.len() {
        return Err(record.corrupt(
            "AlignmentRescorer",
            format!(
                "aligned strings differ in length ({} vs {})",
                record.query_string.len(),
                record.subject_string.len()
            ),
        ));
    }
    let counts = record.column_counts();
    if counts.query_bases != record.query_length() || counts.subject_bases != record.subject_length() {
        return Err(record.corrupt(
            "AlignmentRescorer",
            format!(
                "{} query / {} subject bases do not fit spans of {} / {}",
                counts.query_bases,
                counts.subject_bases,
                record.query_length(),
                record.subject_length()
            ),
        ));
    }
    Ok(())
}

/// Raise an earlier column to a new score, shifting every running total after it
fn patch_column(
    column_scores: &mut [i32],
    position_scores: &mut [i32],
    score: &mut i32,
    column: usize,
    new_score: i32,
) {
    let delta = new_score - column_scores[column];
    if delta == 0 {
        return;
    }
    column_scores[column] = new_score;
    for running in &mut position_scores[column..] {
        *running += delta;
    }
    *score += delta;
}

/// Rescore an alignment against `matrix` with affine gaps and optional CpG handling
pub fn rescore(record: &SearchResult, matrix: &ScoringMatrix, params: &RescoreParams) -> Result<RescoreResult> {
    validate(record)?;

    let query = record.query_string.as_bytes();
    let subject = record.subject_string.as_bytes();
    let mut column_scores = Vec::with_capacity(query.len());
    let mut position_scores = Vec::with_capacity(query.len());
    let mut tally = MutationTally::new(params.div_cpg_mod);
    let mut score = 0i32;

    let mut in_insertion = false;
    let mut in_deletion = false;
    let mut prev_subject: Option<u8> = None;
    // column holding a subject C aligned to a query T, awaiting a G
    let mut pending_c_to_t: Option<usize> = None;

    for (i, (&q_raw, &s_raw)) in query.iter().zip(subject.iter()).enumerate() {
        tally.push(q_raw, s_raw);
        let q = q_raw.to_ascii_uppercase();
        let s = s_raw.to_ascii_uppercase();

        let column_score = if is_gap(s) {
            let penalty = if in_insertion { params.ins_gap_ext } else { params.gap_open };
            in_insertion = true;
            in_deletion = false;
            penalty
        } else {
            let cpg = params.score_cpg_mod && prev_subject == Some(b'C') && s == b'G';
            if cpg {
                if let Some(c_col) = pending_c_to_t {
                    patch_column(
                        &mut column_scores,
                        &mut position_scores,
                        &mut score,
                        c_col,
                        matrix.score(b'C', b'C'),
                    );
                }
            }
            pending_c_to_t = None;
            prev_subject = Some(s);

            if is_gap(q) {
                let penalty = if in_deletion { params.del_gap_ext } else { params.gap_open };
                in_deletion = true;
                in_insertion = false;
                penalty
            } else {
                in_insertion = false;
                in_deletion = false;
                if s == b'C' && q == b'T' {
                    pending_c_to_t = Some(i);
                }
                if cpg && q == b'A' {
                    matrix.score(b'G', b'G')
                } else {
                    matrix.score(s, q)
                }
            }
        };

        score += column_score;
        column_scores.push(column_score);
        position_scores.push(score);
    }
    tally.finish();

    if params.complexity_adjust {
        score = complexity_adjust_score(score, &record.query_string, matrix);
    }
    let xdrop = match params.x_drop {
        Some(x_drop) => xdrop_fragments(&position_scores, x_drop),
        None => Vec::new(),
    };

    let counts = ColumnCounts::from_strings(&record.query_string, &record.subject_string);
    let query_bases = counts.query_bases.max(1) as f64;
    Ok(RescoreResult {
        score,
        kimura: tally.kimura(),
        cpg_sites: tally.cpg_sites,
        pct_insert: counts.insert_columns as f64 * 100.0 / query_bases,
        pct_delete: counts.delete_columns as f64 * 100.0 / query_bases,
        position_scores,
        xdrop_fragments: xdrop,
        well_characterized_bases: tally.well_characterized,
        transitions: tally.transitions,
        transversions: tally.transversions,
    })
}

/// Split a running score trace wherever it falls more than `x_drop` below its peak.
///
/// Scores are taken relative to the baseline at the start of each segment.
/// Returns (segment start, peak column) pairs for segments with a positive peak.
pub fn xdrop_fragments(position_scores: &[i32], x_drop: i32) -> Vec<(usize, usize)> {
    let mut fragments = Vec::new();
    let mut baseline = 0i64;
    let mut segment_start = 0usize;
    let mut peak = 0i64;
    let mut peak_col: Option<usize> = None;

    for (i, &running) in position_scores.iter().enumerate() {
        let value = running as i64 - baseline;
        if value > peak {
            peak = value;
            peak_col = Some(i);
        }
        if peak - value > x_drop as i64 {
            if let Some(col) = peak_col {
                fragments.push((segment_start, col));
            }
            segment_start = i + 1;
            baseline = running as i64;
            peak = 0;
            peak_col = None;
        }
    }

    if let Some(col) = peak_col {
        if position_scores.len() - segment_start >= MIN_TRAILING_FRAGMENT {
            fragments.push((segment_start, col));
        }
    }
    fragments
}

/// Penalise low-complexity queries by the composition's information deficit.
///
/// adjusted = floor(raw + (Σ n·ln f − Σ n·ln n + N·ln N) / λ + 0.999), counting
/// only symbols with a non-zero background frequency. Negative results become 0.
pub fn complexity_adjust_score(raw: i32, query: &str, matrix: &ScoringMatrix) -> i32 {
    let mut counts: HashMap<u8, usize> = HashMap::new();
    for base in query.bytes() {
        let base = base.to_ascii_uppercase();
        if matrix.frequency(base) > 0.0 {
            *counts.entry(base).or_insert(0) += 1;
        }
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return raw.max(0);
    }

    let mut information = (total as f64) * (total as f64).ln();
    for (&base, &n) in &counts {
        let n = n as f64;
        information += n * matrix.frequency(base).ln() - n * n.ln();
    }
    let adjusted = (raw as f64 + information / matrix.lambda() + 0.999).floor();
    if adjusted.is_nan() || adjusted < 0.0 {
        0
    } else {
        adjusted as i32
    }
}

/// Write rescoring output back into a record
pub fn apply_rescore(record: &mut SearchResult, result: &RescoreResult) {
    record.score = result.score;
    record.pct_kimura_diverge = Some(result.kimura);
    record.pct_insert = result.pct_insert;
    record.pct_delete = result.pct_delete;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matrix::tests::{TS_MATRIX, UNIT_MATRIX};
    use crate::error::SearchError;
    use proptest::prelude::*;

    fn ts_matrix() -> ScoringMatrix {
        ScoringMatrix::from_str_named("ts", TS_MATRIX).unwrap()
    }

    fn record(query: &str, subject: &str) -> SearchResult {
        let q_bases = query.bytes().filter(|&b| b != b'-').count();
        let s_bases = subject.bytes().filter(|&b| b != b'-').count();
        SearchResult {
            query_name: "seq1".to_string(),
            query_start: 1,
            query_end: q_bases,
            subject_name: "Rep#DNA".to_string(),
            subject_start: 1,
            subject_end: s_bases,
            query_string: query.to_string(),
            subject_string: subject.to_string(),
            ..Default::default()
        }
    }

    fn cpg_params(score_cpg_mod: bool) -> RescoreParams {
        RescoreParams {
            score_cpg_mod,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_matches_and_mismatches() {
        let result = rescore(&record("ATGA", "ACGA"), &ts_matrix(), &cpg_params(false)).unwrap();
        assert_eq!(result.score, 24);
        assert_eq!(result.position_scores, vec![9, 5, 15, 24]);
    }

    #[test]
    fn test_cpg_c_to_t_rescored_as_match() {
        let result = rescore(&record("ATGA", "ACGA"), &ts_matrix(), &cpg_params(true)).unwrap();
        assert_eq!(result.score, 38);
        assert_eq!(result.position_scores, vec![9, 19, 29, 38]);
    }

    #[test]
    fn test_cpg_g_to_a_scored_as_match() {
        let plain = rescore(&record("ACAA", "ACGA"), &ts_matrix(), &cpg_params(false)).unwrap();
        let modded = rescore(&record("ACAA", "ACGA"), &ts_matrix(), &cpg_params(true)).unwrap();
        assert_eq!(plain.score, 24);
        assert_eq!(modded.score, 38);
    }

    #[test]
    fn test_deletion_at_cpg_patches_previous_column() {
        let plain = rescore(&record("AT-A", "ACGA"), &ts_matrix(), &cpg_params(false)).unwrap();
        let modded = rescore(&record("AT-A", "ACGA"), &ts_matrix(), &cpg_params(true)).unwrap();
        assert_eq!(plain.score, 9 - 4 - 25 + 9);
        assert_eq!(modded.score, 9 + 10 - 25 + 9);
        assert_eq!(modded.position_scores, vec![9, 19, -6, 3]);
    }

    #[test]
    fn test_affine_insertion_and_deletion() {
        let result = rescore(&record("ACCGTA", "AC--TA"), &ts_matrix(), &RescoreParams::default()).unwrap();
        assert_eq!(result.score, 9 + 10 - 25 - 5 + 9 + 9);
        assert!((result.pct_insert - 100.0 / 3.0).abs() < 1e-9);

        let params = RescoreParams {
            del_gap_ext: -1,
            ..Default::default()
        };
        let result = rescore(&record("AC---A", "ACGTCA"), &ts_matrix(), &params).unwrap();
        assert_eq!(result.score, 9 + 10 - 25 - 1 - 1 + 9);
        assert!((result.pct_delete - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_div_cpg_mod_drives_kimura() {
        let modded = rescore(
            &record("AATGAA", "AACGAA"),
            &ts_matrix(),
            &RescoreParams {
                div_cpg_mod: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!((modded.transitions - 0.1).abs() < 1e-12);
        assert_eq!(modded.cpg_sites, 1);
        assert_eq!(modded.well_characterized_bases, 6);
    }

    #[test]
    fn test_corrupt_alignments_rejected() {
        let matrix = ts_matrix();
        let params = RescoreParams::default();

        let empty = record("", "");
        assert!(matches!(rescore(&empty, &matrix, &params), Err(SearchError::CorruptAlignment { .. })));

        let mut uneven = record("ACGT", "ACGT");
        uneven.subject_string = "ACG".to_string();
        assert!(matches!(rescore(&uneven, &matrix, &params), Err(SearchError::CorruptAlignment { .. })));

        let mut bad_span = record("ACGT", "ACGT");
        bad_span.query_end = 10;
        assert!(matches!(rescore(&bad_span, &matrix, &params), Err(SearchError::CorruptAlignment { .. })));
    }

    #[test]
    fn test_xdrop_scenario() {
        let scores = [5, 10, 3, -2, 8, 15, 20, 5, 30];
        assert_eq!(xdrop_fragments(&scores, 8), vec![(0, 1), (4, 6)]);
    }

    #[test]
    fn test_xdrop_keeps_long_trailing_fragment() {
        let scores = [5, 10, -5, 0, 5, 10, 15, 20, 25];
        assert_eq!(xdrop_fragments(&scores, 8), vec![(0, 1), (3, 8)]);
    }

    #[test]
    fn test_xdrop_skips_segments_without_positive_peak() {
        let scores = [-3, -6, -12, -20];
        assert!(xdrop_fragments(&scores, 8).is_empty());
    }

    #[test]
    fn test_xdrop_in_rescore() {
        let params = RescoreParams {
            x_drop: Some(8),
            ..Default::default()
        };
        let result = rescore(&record("ACGTACGT", "ACGTACGT"), &ts_matrix(), &params).unwrap();
        assert_eq!(result.xdrop_fragments, vec![(0, 7)]);
    }

    #[test]
    fn test_uniform_composition_leaves_score_unchanged() {
        let matrix = ScoringMatrix::from_str_named("unit", UNIT_MATRIX).unwrap();
        assert_eq!(complexity_adjust_score(100, "ACGTACGTACGTACGT", &matrix), 100);
    }

    #[test]
    fn test_low_complexity_is_penalised() {
        let matrix = ScoringMatrix::from_str_named("unit", UNIT_MATRIX).unwrap();
        let adjusted = complexity_adjust_score(30, "AAAAAAAAAAAAAAAAAAAA", &matrix);
        // 20·ln(0.25) / ln(3) ≈ -25.2
        assert_eq!(adjusted, 5);
        assert_eq!(complexity_adjust_score(10, "AAAAAAAAAAAAAAAAAAAA", &matrix), 0);
    }

    #[test]
    fn test_apply_rescore() {
        let mut rec = record("ATGA", "ACGA");
        let result = rescore(&rec, &ts_matrix(), &cpg_params(true)).unwrap();
        apply_rescore(&mut rec, &result);
        assert_eq!(rec.score, 38);
        assert_eq!(rec.pct_kimura_diverge, Some(result.kimura));
    }

    proptest! {
        #[test]
        fn rescoring_is_deterministic(
            cols in proptest::collection::vec((0usize..5, 0usize..4), 1..60),
            cpg in any::<bool>()
        ) {
            let alphabet = b"ACGT-";
            let query: String = cols.iter().map(|(q, _)| alphabet[*q] as char).collect();
            let subject: String = cols.iter().map(|(_, s)| alphabet[*s] as char).collect();
            prop_assume!(query.bytes().any(|b| b != b'-'));
            let rec = record(&query, &subject);
            let params = RescoreParams { score_cpg_mod: cpg, div_cpg_mod: cpg, x_drop: Some(20), ..Default::default() };
            let matrix = ts_matrix();
            let first = rescore(&rec, &matrix, &params).unwrap();
            let second = rescore(&rec.clone(), &matrix, &params).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.position_scores.len(), query.len());
            prop_assert_eq!(*first.position_scores.last().unwrap(), first.score);
        }
    }
}
