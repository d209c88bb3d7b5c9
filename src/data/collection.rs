// collection.rs - Ordered result arena with filtering, linked hits and batch rescoring

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::core::matrix::ScoringMatrix;
use crate::core::rescore::{apply_rescore, rescore, RescoreParams};
use crate::data::record::SearchResult;
use crate::error::{Result, SearchError};

/// Neighbours of a hit in a chain of fragments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitLinks {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

/// Which hit keeps contested query bases when annotations overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapStrategy {
    HigherScore,
    LongerElement,
    /// Simple repeats rank below every interspersed repeat
    LowerDivergence,
}

impl OverlapStrategy {
    /// Priority order inside a cluster; ties keep the leftmost hit first
    fn rank(self, a: &SearchResult, b: &SearchResult) -> Ordering {
        match self {
            OverlapStrategy::HigherScore => b.score.cmp(&a.score),
            OverlapStrategy::LongerElement => b.query_length().cmp(&a.query_length()),
            OverlapStrategy::LowerDivergence => overlap_divergence(a).total_cmp(&overlap_divergence(b)),
        }
    }
}

impl FromStr for OverlapStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "higher_score" => Ok(OverlapStrategy::HigherScore),
            "longer_element" => Ok(OverlapStrategy::LongerElement),
            "lower_divergence" => Ok(OverlapStrategy::LowerDivergence),
            _ => Err(format!(
                "Invalid overlap resolution '{}'. Use: higher_score, longer_element, lower_divergence",
                s
            )),
        }
    }
}

/// Annotation field used to group or order hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatField {
    Family,
    Class,
    Subclass,
}

impl RepeatField {
    pub fn value(self, result: &SearchResult) -> &str {
        match self {
            RepeatField::Family => result.subject_hit_name(),
            RepeatField::Class => result.repeat_class(),
            RepeatField::Subclass => result.repeat_subclass(),
        }
    }
}

impl FromStr for RepeatField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "family" | "name" => Ok(RepeatField::Family),
            "class" => Ok(RepeatField::Class),
            "subclass" => Ok(RepeatField::Subclass),
            _ => Err(format!("Invalid repeat field '{}'. Use: family, class, subclass", s)),
        }
    }
}

/// Owns the records of one search; links between hits are indices into it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResultCollection {
    results: Vec<SearchResult>,
    links: Vec<HitLinks>,
}

impl From<Vec<SearchResult>> for SearchResultCollection {
    fn from(results: Vec<SearchResult>) -> Self {
        let links = vec![HitLinks::default(); results.len()];
        Self { results, links }
    }
}

impl FromIterator<SearchResult> for SearchResultCollection {
    fn from_iter<I: IntoIterator<Item = SearchResult>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl SearchResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its index
    pub fn push(&mut self, result: SearchResult) -> usize {
        self.results.push(result);
        self.links.push(HitLinks::default());
        self.results.len() - 1
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SearchResult> {
        self.results.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SearchResult> {
        self.results.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn into_vec(self) -> Vec<SearchResult> {
        self.results
    }

    pub fn links(&self, index: usize) -> Option<HitLinks> {
        self.links.get(index).copied()
    }

    /// Rebuild the arena in `order`, remapping links; indices missing from `order` are dropped
    fn reorder(&mut self, order: Vec<usize>) {
        let mut remap = vec![None; self.results.len()];
        for (new_index, &old_index) in order.iter().enumerate() {
            remap[old_index] = Some(new_index);
        }
        let mut old_results: Vec<Option<SearchResult>> = std::mem::take(&mut self.results).into_iter().map(Some).collect();
        let old_links = std::mem::take(&mut self.links);

        for &old_index in &order {
            if let Some(result) = old_results[old_index].take() {
                self.results.push(result);
                let link = old_links[old_index];
                self.links.push(HitLinks {
                    left: link.left.and_then(|i| remap[i]),
                    right: link.right.and_then(|i| remap[i]),
                });
            }
        }
    }

    fn retain_where<F: Fn(&SearchResult) -> bool>(&mut self, keep: F) -> usize {
        let before = self.results.len();
        let order: Vec<usize> = (0..before).filter(|&i| keep(&self.results[i])).collect();
        self.reorder(order);
        before - self.results.len()
    }

    /// Order by query name, query start, then descending score
    pub fn sort_by_query(&mut self) {
        let mut order: Vec<usize> = (0..self.results.len()).collect();
        order.sort_by(|&a, &b| {
            let (ra, rb) = (&self.results[a], &self.results[b]);
            ra.query_name
                .cmp(&rb.query_name)
                .then(ra.query_start.cmp(&rb.query_start))
                .then(rb.score.cmp(&ra.score))
        });
        self.reorder(order);
    }

    /// Order by descending score, ties by query position
    pub fn sort_by_score(&mut self) {
        let mut order: Vec<usize> = (0..self.results.len()).collect();
        order.sort_by(|&a, &b| score_order(&self.results[a], &self.results[b]));
        self.reorder(order);
    }

    /// Stable sort by `compare`, query position breaking ties
    fn sort_with<F: Fn(&SearchResult, &SearchResult) -> Ordering>(&mut self, compare: F) {
        let mut order: Vec<usize> = (0..self.results.len()).collect();
        order.sort_by(|&a, &b| {
            let (ra, rb) = (&self.results[a], &self.results[b]);
            compare(ra, rb)
                .then_with(|| ra.query_name.cmp(&rb.query_name))
                .then(ra.query_start.cmp(&rb.query_start))
        });
        self.reorder(order);
    }

    /// Order by family, class or subclass name
    pub fn sort_by_field(&mut self, field: RepeatField) {
        self.sort_with(|a, b| field.value(a).cmp(field.value(b)));
    }

    /// Longest query span first
    pub fn sort_by_length(&mut self) {
        self.sort_with(|a, b| b.query_length().cmp(&a.query_length()));
    }

    /// Lowest divergence first
    pub fn sort_by_divergence(&mut self) {
        self.sort_with(|a, b| a.divergence().total_cmp(&b.divergence()));
    }

    /// Drop hits scoring below `min_score`; returns the number removed
    pub fn filter_min_score(&mut self, min_score: i32) -> usize {
        self.retain_where(|r| r.score >= min_score)
    }

    /// Drop hits spanning fewer than `min_length` query bases
    pub fn filter_min_length(&mut self, min_length: usize) -> usize {
        self.retain_where(|r| r.query_length() >= min_length)
    }

    /// Keep hits whose divergence lies within the given bounds (inclusive)
    pub fn filter_divergence(&mut self, min: Option<f64>, max: Option<f64>) -> usize {
        self.retain_where(|r| {
            let divergence = r.divergence();
            min.map_or(true, |min| divergence >= min) && max.map_or(true, |max| divergence <= max)
        })
    }

    /// Keep only subjects matching `include` and not matching `exclude`
    pub fn retain_subjects(&mut self, include: Option<&Regex>, exclude: Option<&Regex>) -> usize {
        self.retain_where(|r| {
            include.map_or(true, |re| re.is_match(&r.subject_name))
                && !exclude.map_or(false, |re| re.is_match(&r.subject_name))
        })
    }

    /// Remove hits whose query span is mostly covered by higher-scoring hits.
    ///
    /// A hit survives when at least (100 - masklevel)% of its query bases lie
    /// outside every higher-scoring hit on the same query. Equal scores rank by
    /// collection order.
    pub fn mask_level_filter(&mut self, masklevel: u32) -> usize {
        let masklevel = masklevel.min(100) as usize;
        let mut by_query: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, r) in self.results.iter().enumerate() {
            by_query.entry(r.query_name.as_str()).or_default().push(i);
        }

        let mut keep = vec![true; self.results.len()];
        for indices in by_query.values_mut() {
            indices.sort_by(|&a, &b| self.results[b].score.cmp(&self.results[a].score).then(a.cmp(&b)));
            let mut higher: Vec<(usize, usize)> = Vec::new();
            for &i in indices.iter() {
                let r = &self.results[i];
                let span = r.query_length();
                let unique = span - covered_bases(&higher, r.query_start, r.query_end);
                if unique * 100 < (100 - masklevel) * span {
                    keep[i] = false;
                }
                higher.push((r.query_start, r.query_end));
            }
        }

        let before = self.results.len();
        let order: Vec<usize> = (0..before).filter(|&i| keep[i]).collect();
        self.reorder(order);
        before - self.results.len()
    }

    /// Make annotations on each query disjoint.
    ///
    /// Hits form clusters of transitively overlapping query spans. Inside a
    /// cluster hits are visited in `strategy` order: a lower-ranked hit that is
    /// contained in, or contains, a kept hit is dropped, and a partial overlap
    /// is trimmed off the lower-ranked hit. Returns the number of hits dropped.
    pub fn resolve_overlaps(&mut self, strategy: OverlapStrategy) -> Result<usize> {
        let mut spans: Vec<Option<(usize, usize)>> =
            self.results.iter().map(|r| Some((r.query_start, r.query_end))).collect();

        let mut by_query: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, r) in self.results.iter().enumerate() {
            by_query.entry(r.query_name.as_str()).or_default().push(i);
        }
        for indices in by_query.values_mut() {
            indices.sort_by_key(|&i| (self.results[i].query_start, i));
            let mut cluster: Vec<usize> = Vec::new();
            let mut reach = 0;
            for &i in indices.iter() {
                let r = &self.results[i];
                if !cluster.is_empty() && r.query_start > reach {
                    resolve_cluster(&self.results, &mut cluster, strategy, &mut spans);
                    cluster.clear();
                }
                if cluster.is_empty() {
                    reach = r.query_end;
                }
                reach = reach.max(r.query_end);
                cluster.push(i);
            }
            resolve_cluster(&self.results, &mut cluster, strategy, &mut spans);
        }

        for (i, span) in spans.iter().enumerate() {
            if let Some((start, end)) = *span {
                let record = &self.results[i];
                if (start, end) != (record.query_start, record.query_end) {
                    let trimmed = record.trim_query(start, end)?;
                    self.results[i] = trimmed;
                }
                self.results[i].overlap = false;
            }
        }

        let before = self.results.len();
        let order: Vec<usize> = (0..before).filter(|&i| spans[i].is_some()).collect();
        self.reorder(order);
        Ok(before - self.results.len())
    }

    /// Split into one collection per field value, in value order; links inside a group survive
    pub fn group_by(&self, field: RepeatField) -> BTreeMap<String, SearchResultCollection> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, r) in self.results.iter().enumerate() {
            groups.entry(field.value(r).to_string()).or_default().push(i);
        }
        groups
            .into_iter()
            .map(|(value, indices)| {
                let mut subset = self.clone();
                subset.reorder(indices);
                (value, subset)
            })
            .collect()
    }

    /// Link `left` to `right` as neighbouring fragments of one element
    pub fn link(&mut self, left: usize, right: usize) -> Result<()> {
        let len = self.results.len();
        if left >= len || right >= len {
            return Err(SearchError::InvalidLink { left, right, len });
        }
        self.links[left].right = Some(right);
        self.links[right].left = Some(left);
        Ok(())
    }

    /// Check that every record has a link slot and every link stays inside the arena
    pub fn validate_links(&self) -> Result<()> {
        let len = self.results.len();
        if self.links.len() != len {
            return Err(SearchError::LinkTable {
                links: self.links.len(),
                results: len,
            });
        }
        for (index, link) in self.links.iter().enumerate() {
            if let Some(right) = link.right.filter(|&r| r >= len) {
                return Err(SearchError::InvalidLink { left: index, right, len });
            }
            if let Some(left) = link.left.filter(|&l| l >= len) {
                return Err(SearchError::InvalidLink { left, right: index, len });
            }
        }
        Ok(())
    }

    /// Indices reached by following right links from `start`, bounded by the collection size
    pub fn chain_from(&self, start: usize) -> Result<Vec<usize>> {
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            if index >= self.results.len() {
                break;
            }
            if chain.len() >= self.results.len() {
                return Err(SearchError::LinkLoop { start });
            }
            chain.push(index);
            current = self.links.get(index).and_then(|link| link.right);
        }
        Ok(chain)
    }

    /// Rescore every record in parallel, writing scores and percentages back
    pub fn rescore_all(&mut self, matrix: &ScoringMatrix, params: &RescoreParams) -> Result<()> {
        self.results.par_iter_mut().try_for_each(|record| {
            let result = rescore(record, matrix, params)?;
            apply_rescore(record, &result);
            Ok(())
        })
    }

    /// Fill `pct_kimura_diverge` for every record that carries its alignment
    pub fn annotate_kimura(&mut self, div_cpg_mod: bool) -> Result<()> {
        self.results
            .par_iter_mut()
            .filter(|record| record.has_alignment())
            .try_for_each(|record| {
                let report = record.kimura_divergence(div_cpg_mod)?;
                record.pct_kimura_diverge = Some(report.divergence);
                Ok(())
            })
    }

    /// Replace each record with the rescored sub-alignments of its xDrop fragments.
    /// Links are reset since indices change. Does nothing without an xDrop value.
    pub fn split_xdrop(&mut self, matrix: &ScoringMatrix, params: &RescoreParams) -> Result<()> {
        if params.x_drop.is_none() {
            return Ok(());
        }
        let pieces: Vec<Vec<SearchResult>> = self
            .results
            .par_iter()
            .map(|record| {
                let scored = rescore(record, matrix, params)?;
                scored
                    .xdrop_fragments
                    .iter()
                    .map(|&(first, last)| {
                        let mut part = record.sub_alignment(first, last)?;
                        let part_score = rescore(&part, matrix, params)?;
                        apply_rescore(&mut part, &part_score);
                        Ok(part)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        *self = pieces.into_iter().flatten().collect();
        Ok(())
    }
}

impl IntoIterator for SearchResultCollection {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchResultCollection {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

fn score_order(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.query_name.cmp(&b.query_name))
        .then(a.query_start.cmp(&b.query_start))
}

/// Divergence used to rank hits for overlap resolution
fn overlap_divergence(result: &SearchResult) -> f64 {
    if result.is_simple_repeat() {
        f64::INFINITY
    } else {
        result.divergence()
    }
}

/// Greedy resolution of one cluster of overlapping hits, writing trimmed spans back
fn resolve_cluster(
    results: &[SearchResult],
    cluster: &mut [usize],
    strategy: OverlapStrategy,
    spans: &mut [Option<(usize, usize)>],
) {
    if cluster.len() < 2 {
        return;
    }
    cluster.sort_by(|&a, &b| strategy.rank(&results[a], &results[b]));
    for (pos, &kept) in cluster.iter().enumerate() {
        let (a_start, a_end) = match spans[kept] {
            Some(span) => span,
            None => continue,
        };
        let a_len = a_end - a_start + 1;
        for &other in &cluster[pos + 1..] {
            let (b_start, b_end) = match spans[other] {
                Some(span) => span,
                None => continue,
            };
            let (from, to) = (a_start.max(b_start), a_end.min(b_end));
            if from > to {
                continue;
            }
            let overlap = to - from + 1;
            let b_len = b_end - b_start + 1;
            spans[other] = if overlap == a_len || overlap == b_len {
                None
            } else if a_start < b_start {
                Some((b_start + overlap, b_end))
            } else {
                Some((b_start, b_end - overlap))
            };
        }
    }
}

/// Bases of `start..=end` covered by the union of `intervals`
fn covered_bases(intervals: &[(usize, usize)], start: usize, end: usize) -> usize {
    let mut clipped: Vec<(usize, usize)> = intervals
        .iter()
        .filter(|&&(s, e)| s <= end && e >= start)
        .map(|&(s, e)| (s.max(start), e.min(end)))
        .collect();
    clipped.sort_unstable();

    let mut covered = 0;
    let mut reach = 0usize; // last covered position so far
    for (s, e) in clipped {
        let from = s.max(reach + 1);
        if e >= from {
            covered += e - from + 1;
            reach = e;
        }
    }
    covered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matrix::tests::TS_MATRIX;

    fn hit(query: &str, start: usize, end: usize, score: i32, subject: &str) -> SearchResult {
        SearchResult {
            query_name: query.to_string(),
            query_start: start,
            query_end: end,
            subject_name: subject.to_string(),
            subject_start: 1,
            subject_end: end + 1 - start,
            score,
            ..Default::default()
        }
    }

    fn aligned(query: &str, subject: &str) -> SearchResult {
        let q = query.bytes().filter(|&b| b != b'-').count();
        let s = subject.bytes().filter(|&b| b != b'-').count();
        SearchResult {
            query_name: "seq".to_string(),
            query_start: 1,
            query_end: q,
            subject_name: "Rep".to_string(),
            subject_start: 1,
            subject_end: s,
            query_string: query.to_string(),
            subject_string: subject.to_string(),
            ..Default::default()
        }
    }

    fn annotated(query: &str, start: usize, end: usize, score: i32, subject: &str, kimura: Option<f64>) -> SearchResult {
        SearchResult {
            pct_kimura_diverge: kimura,
            ..hit(query, start, end, score, subject)
        }
    }

    fn spans(results: &SearchResultCollection) -> Vec<(&str, usize, usize)> {
        results
            .iter()
            .map(|r| (r.subject_hit_name(), r.query_start, r.query_end))
            .collect()
    }

    fn overlapping() -> SearchResultCollection {
        vec![
            hit("chr1", 1, 100, 300, "A#LINE/L2"),
            hit("chr1", 80, 150, 500, "B#SINE/Alu"),
            hit("chr1", 90, 120, 100, "C#DNA/hAT"),
            hit("chr1", 300, 400, 50, "D#LTR/ERVL"),
            hit("chr2", 1, 10, 20, "E#SINE/MIR"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_overlaps_by_score() {
        let mut results = overlapping();
        results.get_mut(0).unwrap().overlap = true;

        assert_eq!(results.resolve_overlaps(OverlapStrategy::HigherScore).unwrap(), 1);
        assert_eq!(
            spans(&results),
            vec![("A", 1, 79), ("B", 80, 150), ("D", 300, 400), ("E", 1, 10)]
        );
        let trimmed = results.get(0).unwrap();
        assert_eq!(trimmed.query_remaining, 21);
        assert!(!trimmed.overlap);
    }

    #[test]
    fn test_resolve_overlaps_by_length() {
        let mut results = overlapping();
        assert_eq!(results.resolve_overlaps(OverlapStrategy::LongerElement).unwrap(), 1);
        assert_eq!(
            spans(&results),
            vec![("A", 1, 100), ("B", 101, 150), ("D", 300, 400), ("E", 1, 10)]
        );
    }

    #[test]
    fn test_resolve_overlaps_ranks_simple_repeats_last() {
        let mut results: SearchResultCollection = vec![
            annotated("chr1", 1, 60, 900, "(CA)n#Simple_repeat", Some(1.0)),
            annotated("chr1", 40, 100, 250, "L2#LINE/L2", Some(25.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(results.resolve_overlaps(OverlapStrategy::LowerDivergence).unwrap(), 0);
        assert_eq!(spans(&results), vec![("(CA)n", 1, 39), ("L2", 40, 100)]);
        assert_eq!(results.get(0).unwrap().pct_kimura_diverge, Some(1.0));
    }

    #[test]
    fn test_equal_rank_keeps_leftmost_hit() {
        let mut results: SearchResultCollection =
            vec![hit("chr1", 50, 90, 300, "Right"), hit("chr1", 10, 90, 300, "Left")]
                .into_iter()
                .collect();
        assert_eq!(results.resolve_overlaps(OverlapStrategy::HigherScore).unwrap(), 1);
        assert_eq!(spans(&results), vec![("Left", 10, 90)]);
    }

    #[test]
    fn test_overlap_strategy_names() {
        assert_eq!("higher_score".parse::<OverlapStrategy>(), Ok(OverlapStrategy::HigherScore));
        assert_eq!("Longer_Element".parse::<OverlapStrategy>(), Ok(OverlapStrategy::LongerElement));
        assert_eq!("lower_divergence".parse::<OverlapStrategy>(), Ok(OverlapStrategy::LowerDivergence));
        assert!("split_between".parse::<OverlapStrategy>().is_err());
        assert_eq!("name".parse::<RepeatField>(), Ok(RepeatField::Family));
        assert!("order".parse::<RepeatField>().is_err());
    }

    #[test]
    fn test_length_and_divergence_filters() {
        let mut results: SearchResultCollection = vec![
            annotated("chr1", 1, 50, 300, "A", Some(5.0)),
            SearchResult {
                pct_diverge: 20.0,
                ..hit("chr1", 100, 299, 400, "B")
            },
            annotated("chr1", 400, 409, 200, "C", Some(30.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(results.filter_min_length(20), 1);
        assert_eq!(results.filter_divergence(Some(10.0), None), 1);
        assert_eq!(spans(&results), vec![("B", 100, 299)]);
        assert_eq!(results.filter_divergence(None, Some(20.0)), 0);
        assert_eq!(results.filter_divergence(None, Some(15.0)), 1);
        assert!(results.is_empty());
    }

    #[test]
    fn test_sort_by_annotation() {
        let mut results: SearchResultCollection = vec![
            annotated("chr1", 1, 10, 100, "MIR#SINE/MIR", Some(30.0)),
            annotated("chr1", 20, 120, 100, "L2#LINE/L2", Some(20.0)),
            annotated("chr1", 200, 250, 100, "AluY#SINE/Alu", Some(2.0)),
        ]
        .into_iter()
        .collect();

        results.sort_by_field(RepeatField::Family);
        let order = |r: &SearchResultCollection| r.iter().map(|h| h.subject_hit_name().to_string()).collect::<Vec<_>>();
        assert_eq!(order(&results), vec!["AluY", "L2", "MIR"]);
        results.sort_by_field(RepeatField::Subclass);
        assert_eq!(order(&results), vec!["AluY", "L2", "MIR"]);
        results.sort_by_field(RepeatField::Class);
        assert_eq!(order(&results), vec!["L2", "MIR", "AluY"]);
        results.sort_by_length();
        assert_eq!(order(&results), vec!["L2", "AluY", "MIR"]);
        results.sort_by_divergence();
        assert_eq!(order(&results), vec!["AluY", "L2", "MIR"]);
    }

    #[test]
    fn test_group_by_class_keeps_inner_links() {
        let mut results: SearchResultCollection = vec![
            hit("chr1", 1, 10, 100, "AluY#SINE/Alu"),
            hit("chr1", 20, 30, 100, "L2#LINE/L2"),
            hit("chr1", 40, 50, 100, "AluY#SINE/Alu"),
        ]
        .into_iter()
        .collect();
        results.link(0, 2).unwrap();
        results.link(1, 2).unwrap();

        let groups = results.group_by(RepeatField::Class);
        assert_eq!(groups.keys().map(String::as_str).collect::<Vec<_>>(), vec!["LINE", "SINE"]);
        let sine = &groups["SINE"];
        assert_eq!(sine.len(), 2);
        assert_eq!(sine.chain_from(0).unwrap(), vec![0, 1]);
        assert_eq!(groups["LINE"].links(0), Some(HitLinks::default()));
        assert!(sine.validate_links().is_ok());
    }

    #[test]
    fn test_push_and_access() {
        let mut results = SearchResultCollection::new();
        assert!(results.is_empty());
        let idx = results.push(hit("chr1", 1, 100, 300, "AluY#SINE/Alu"));
        assert_eq!(idx, 0);
        assert_eq!(results.len(), 1);
        assert_eq!(results.get(0).map(|r| r.score), Some(300));
        assert!(results.get(1).is_none());
    }

    #[test]
    fn test_sorting() {
        let mut results: SearchResultCollection = vec![
            hit("chr2", 10, 50, 100, "A"),
            hit("chr1", 30, 80, 200, "B"),
            hit("chr1", 30, 60, 500, "C"),
            hit("chr1", 5, 20, 50, "D"),
        ]
        .into_iter()
        .collect();

        results.sort_by_query();
        let names: Vec<&str> = results.iter().map(|r| r.subject_name.as_str()).collect();
        assert_eq!(names, vec!["D", "C", "B", "A"]);

        results.sort_by_score();
        let scores: Vec<i32> = results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![500, 200, 100, 50]);
    }

    #[test]
    fn test_filter_min_score_and_subjects() {
        let mut results: SearchResultCollection = vec![
            hit("chr1", 1, 10, 100, "AluY#SINE/Alu"),
            hit("chr1", 20, 30, 400, "L1PA2#LINE/L1"),
            hit("chr1", 40, 50, 250, "AluSx#SINE/Alu"),
        ]
        .into();
        assert_eq!(results.filter_min_score(200), 1);
        assert_eq!(results.len(), 2);

        let include = Regex::new("SINE").unwrap();
        assert_eq!(results.retain_subjects(Some(&include), None), 1);
        assert_eq!(results.get(0).map(|r| r.subject_name.as_str()), Some("AluSx#SINE/Alu"));

        let exclude = Regex::new("^Alu").unwrap();
        assert_eq!(results.retain_subjects(None, Some(&exclude)), 1);
        assert!(results.is_empty());
    }

    #[test]
    fn test_mask_level_filter() {
        let build = || -> SearchResultCollection {
            vec![
                hit("chr1", 1, 100, 500, "best"),
                hit("chr1", 11, 110, 300, "mostly-covered"),
                hit("chr1", 51, 150, 200, "half-covered"),
                hit("chr2", 1, 100, 100, "other-query"),
            ]
            .into()
        };

        let mut all = build();
        assert_eq!(all.mask_level_filter(100), 0);

        // 80: keep hits with at least 20% unique bases
        let mut eighty = build();
        assert_eq!(eighty.mask_level_filter(80), 1);
        let names: Vec<&str> = eighty.iter().map(|r| r.subject_name.as_str()).collect();
        assert_eq!(names, vec!["best", "half-covered", "other-query"]);

        let mut strict = build();
        assert_eq!(strict.mask_level_filter(0), 2);
        let names: Vec<&str> = strict.iter().map(|r| r.subject_name.as_str()).collect();
        assert_eq!(names, vec!["best", "other-query"]);
    }

    #[test]
    fn test_covered_bases_merges_overlaps() {
        assert_eq!(covered_bases(&[(1, 10), (5, 20), (30, 40)], 8, 35), 13 + 6);
        assert_eq!(covered_bases(&[], 1, 10), 0);
    }

    #[test]
    fn test_links_and_chains() {
        let mut results: SearchResultCollection =
            vec![hit("chr1", 1, 10, 10, "a"), hit("chr1", 20, 30, 10, "b"), hit("chr1", 40, 50, 10, "c")].into();
        results.link(0, 1).unwrap();
        results.link(1, 2).unwrap();
        assert_eq!(results.chain_from(0).unwrap(), vec![0, 1, 2]);
        assert_eq!(results.links(2).and_then(|l| l.left), Some(1));
        assert!(matches!(results.link(0, 9), Err(SearchError::InvalidLink { .. })));
    }

    #[test]
    fn test_link_loop_detected() {
        let mut results: SearchResultCollection = vec![hit("chr1", 1, 10, 10, "a"), hit("chr1", 20, 30, 10, "b")].into();
        results.link(0, 1).unwrap();
        results.link(1, 0).unwrap();
        assert!(matches!(results.chain_from(0), Err(SearchError::LinkLoop { start: 0 })));

        let mut single: SearchResultCollection = vec![hit("chr1", 1, 10, 10, "a")].into();
        single.link(0, 0).unwrap();
        assert!(matches!(single.chain_from(0), Err(SearchError::LinkLoop { .. })));
    }

    #[test]
    fn test_validate_links_rejects_short_link_table() {
        let mut results = SearchResultCollection::from(vec![hit("chr1", 1, 10, 100, "AluY"), hit("chr1", 20, 30, 90, "AluY")]);
        results.link(0, 1).unwrap();
        assert!(results.validate_links().is_ok());

        results.links.pop();
        assert!(matches!(results.validate_links(), Err(SearchError::LinkTable { links: 1, results: 2 })));
        assert_eq!(results.chain_from(1).unwrap(), vec![1]);

        results.links.push(HitLinks { left: None, right: Some(7) });
        assert!(matches!(results.validate_links(), Err(SearchError::InvalidLink { right: 7, .. })));
    }

    #[test]
    fn test_links_survive_sorting_and_filtering() {
        let mut results: SearchResultCollection =
            vec![hit("chr1", 1, 10, 10, "low"), hit("chr1", 20, 30, 90, "high"), hit("chr1", 40, 50, 5, "gone")].into();
        results.link(0, 1).unwrap();
        results.link(1, 2).unwrap();
        results.sort_by_score();
        // high=0, low=1, gone=2
        assert_eq!(results.chain_from(1).unwrap(), vec![1, 0, 2]);
        results.filter_min_score(10);
        assert_eq!(results.chain_from(1).unwrap(), vec![1, 0]);
        assert_eq!(results.links(0).and_then(|l| l.right), None);
    }

    #[test]
    fn test_rescore_all_and_kimura() {
        let matrix = ScoringMatrix::from_str_named("ts", TS_MATRIX).unwrap();
        let mut results: SearchResultCollection = vec![aligned("ACGT", "ACGT"), aligned("AAGAA", "AAAAA")].into();
        results.rescore_all(&matrix, &RescoreParams::default()).unwrap();
        assert_eq!(results.get(0).map(|r| r.score), Some(38));
        assert!(results.iter().all(|r| r.pct_kimura_diverge.is_some()));

        results.annotate_kimura(false).unwrap();
        let kimura = results.get(1).and_then(|r| r.pct_kimura_diverge).unwrap();
        assert!((kimura - 25.54).abs() < 0.01);
    }

    #[test]
    fn test_rescore_all_reports_corrupt_record() {
        let matrix = ScoringMatrix::from_str_named("ts", TS_MATRIX).unwrap();
        let mut broken = aligned("ACGT", "ACGT");
        broken.query_end = 9;
        let mut results: SearchResultCollection = vec![aligned("ACGT", "ACGT"), broken].into();
        assert!(matches!(
            results.rescore_all(&matrix, &RescoreParams::default()),
            Err(SearchError::CorruptAlignment { .. })
        ));
    }

    #[test]
    fn test_split_xdrop() {
        let matrix = ScoringMatrix::from_str_named("ts", TS_MATRIX).unwrap();
        // strong block, a run of transversions, strong block
        let query = "ACGTACGTAAAAAAACGTACGT";
        let subject = "ACGTACGTCCCCCCACGTACGT";
        let mut results: SearchResultCollection = vec![aligned(query, subject)].into();
        let params = RescoreParams {
            x_drop: Some(20),
            ..Default::default()
        };
        results.split_xdrop(&matrix, &params).unwrap();
        assert_eq!(results.len(), 2);
        let first = results.get(0).unwrap();
        assert_eq!((first.query_start, first.query_end), (1, 8));
        assert_eq!(first.score, 76);
        let second = results.get(1).unwrap();
        assert_eq!(second.query_end, 22);
        assert_eq!(second.query_string, "ACGTACGT");
    }
}
