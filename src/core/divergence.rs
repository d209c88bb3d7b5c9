// divergence.rs - Kimura and K2P-Gap divergence with CpG-aware mutation counting

use crate::core::sequence::{is_gap, is_masked, is_well_characterized, mutation_type, MutationType};
use crate::error::{Result, SearchError};

/// Weight of a lone transition inside a CpG dinucleotide
const CPG_SINGLE_TRANSITION_WEIGHT: f64 = 0.1;

/// Substitution statistics of an alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceReport {
    /// Percent divergence (0-100)
    pub divergence: f64,
    pub transitions: f64,
    pub transversions: u32,
    pub well_characterized_bases: u32,
    pub cpg_sites: u32,
    /// Columns with a gap on either side (only meaningful for K2P-Gap)
    pub gap_columns: u32,
}

/// Column-by-column mutation counter.
///
/// A transition is held back for one subject base: if the next subject base
/// completes a CpG (C then G on the subject) the pair is resolved together,
/// two transitions counting as one and a lone transition as a tenth.
#[derive(Debug, Clone, Default)]
pub struct MutationTally {
    div_cpg_mod: bool,
    prev_subject: Option<u8>,
    pending_transitions: u32,
    pub transitions: f64,
    pub transversions: u32,
    pub identities: u32,
    pub well_characterized: u32,
    pub cpg_sites: u32,
    pub gap_columns: u32,
    pub columns: u32,
}

impl MutationTally {
    pub fn new(div_cpg_mod: bool) -> Self {
        Self {
            div_cpg_mod,
            ..Default::default()
        }
    }

    /// Feed one aligned column
    pub fn push(&mut self, query: u8, subject: u8) {
        self.columns += 1;
        let q = query.to_ascii_uppercase();
        let s = subject.to_ascii_uppercase();

        if is_gap(s) {
            // insertion: the subject does not advance, CpG context is kept
            self.gap_columns += 1;
            return;
        }
        if is_gap(q) || is_masked(q) || is_masked(s) {
            if is_gap(q) {
                self.gap_columns += 1;
            }
            self.flush_pending();
            self.prev_subject = Some(s);
            return;
        }

        if is_well_characterized(q) && is_well_characterized(s) {
            self.well_characterized += 1;
        }
        let mutation = mutation_type(q, s);
        if mutation == MutationType::Match {
            self.identities += 1;
        }

        let cpg = self.prev_subject == Some(b'C') && s == b'G';
        if cpg {
            self.cpg_sites += 1;
        }

        if cpg && self.div_cpg_mod {
            match mutation {
                MutationType::Transition => self.pending_transitions += 1,
                MutationType::Transversion => self.transversions += 1,
                _ => {}
            }
            match self.pending_transitions {
                0 => {}
                1 => self.transitions += CPG_SINGLE_TRANSITION_WEIGHT,
                _ => self.transitions += 1.0,
            }
            self.pending_transitions = 0;
        } else {
            self.flush_pending();
            match mutation {
                MutationType::Transition => self.pending_transitions = 1,
                MutationType::Transversion => self.transversions += 1,
                _ => {}
            }
        }
        self.prev_subject = Some(s);
    }

    fn flush_pending(&mut self) {
        self.transitions += self.pending_transitions as f64;
        self.pending_transitions = 0;
    }

    /// Resolve any transition still waiting for its CpG partner
    pub fn finish(&mut self) {
        self.flush_pending();
    }

    /// Kimura 2-parameter divergence over well-characterized bases
    pub fn kimura(&self) -> f64 {
        if self.well_characterized == 0 {
            return 100.0;
        }
        let n = self.well_characterized as f64;
        let p = self.transitions / n;
        let q = self.transversions as f64 / n;
        let operand = (1.0 - 2.0 * p - q) * (1.0 - 2.0 * q).sqrt();
        if operand > 0.0 {
            ((-0.5 * operand.ln()).abs() * 100.0).min(100.0)
        } else {
            100.0
        }
    }

    /// K2P distance extended with a gap weight over the full alignment length.
    /// Every gap column weighs the same regardless of the length of its gap.
    pub fn k2p_gap(&self) -> f64 {
        if self.columns == 0 {
            return 100.0;
        }
        let len = self.columns as f64;
        let w = (2.0 * len - self.gap_columns as f64) / (2.0 * len);
        let s = self.identities as f64 / len;
        let p = self.transitions / len;
        let q = self.transversions as f64 / len;

        let gap_term = if w > 0.0 { 0.75 * w * w.ln() } else { 0.0 };
        let operand = (s - p) * (s + p - q).sqrt();
        let sub_term = if operand > 0.0 && operand.is_finite() {
            (w / 2.0) * operand.ln()
        } else {
            0.0
        };
        100.0 * (gap_term - sub_term)
    }

    fn report(&self, divergence: f64) -> DivergenceReport {
        DivergenceReport {
            divergence,
            transitions: self.transitions,
            transversions: self.transversions,
            well_characterized_bases: self.well_characterized,
            cpg_sites: self.cpg_sites,
            gap_columns: self.gap_columns,
        }
    }
}

fn tally_alignment(query: &str, subject: &str, div_cpg_mod: bool) -> Result<MutationTally> {
    if query.len() != subject.len() {
        return Err(SearchError::CorruptAlignment {
            component: "DivergenceEstimator",
            query: query.to_string(),
            subject: subject.to_string(),
            message: format!(
                "aligned strings differ in length ({} vs {})",
                query.len(),
                subject.len()
            ),
        });
    }
    let mut tally = MutationTally::new(div_cpg_mod);
    for (q, s) in query.bytes().zip(subject.bytes()) {
        tally.push(q, s);
    }
    tally.finish();
    Ok(tally)
}

/// Kimura divergence of an aligned query/subject pair
pub fn calc_kimura_divergence(query: &str, subject: &str, div_cpg_mod: bool) -> Result<DivergenceReport> {
    let tally = tally_alignment(query, subject, div_cpg_mod)?;
    Ok(tally.report(tally.kimura()))
}

/// K2P-Gap divergence of an aligned query/subject pair
pub fn calc_k2p_gap_divergence(query: &str, subject: &str, div_cpg_mod: bool) -> Result<DivergenceReport> {
    let tally = tally_alignment(query, subject, div_cpg_mod)?;
    Ok(tally.report(tally.k2p_gap()))
}
