// mod.rs - Core scoring and divergence module

pub mod divergence;
pub mod matrix;
pub mod rescore;
pub mod sequence;

// Re-export main types for convenience
pub use divergence::{calc_k2p_gap_divergence, calc_kimura_divergence, DivergenceReport, MutationTally};
pub use matrix::{MatrixKind, ScoringMatrix};
pub use rescore::{apply_rescore, complexity_adjust_score, rescore, xdrop_fragments, RescoreParams, RescoreResult};
pub use sequence::{complement, mutation_type, reverse_complement, MutationType};
