// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};

/// Replace a defaulted CLI string with the config value
fn merge_default(value: &mut String, default: &str, config: Option<String>) {
    if let Some(config) = config {
        if value == default {
            *value = config;
        }
    }
}

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        if self.report.is_none() {
            self.report = config.report;
        }
        if self.run.is_none() {
            self.run = config.run;
        }
        if self.output.is_none() {
            self.output = config.output;
        }
        merge_default(&mut self.engine, "crossmatch", config.engine);
        merge_default(&mut self.format, "caf", config.format);

        // Rescoring
        if self.matrix.is_none() {
            self.matrix = config.matrix;
        }
        if self.gap_init.is_none() {
            self.gap_init = config.gap_init;
        }
        if self.ins_gap_ext.is_none() {
            self.ins_gap_ext = config.ins_gap_ext;
        }
        if self.del_gap_ext.is_none() {
            self.del_gap_ext = config.del_gap_ext;
        }
        if self.x_drop.is_none() {
            self.x_drop = config.x_drop;
        }

        // Filtering
        if self.min_score.is_none() {
            self.min_score = config.min_score;
        }
        if self.mask_level.is_none() {
            self.mask_level = config.mask_level;
        }
        if self.include_subjects.is_none() {
            self.include_subjects = config.include_subjects;
        }
        if self.exclude_subjects.is_none() {
            self.exclude_subjects = config.exclude_subjects;
        }
        if self.min_length.is_none() {
            self.min_length = config.min_length;
        }
        if self.min_divergence.is_none() {
            self.min_divergence = config.min_divergence;
        }
        if self.max_divergence.is_none() {
            self.max_divergence = config.max_divergence;
        }
        if self.overlap_resolution.is_none() {
            self.overlap_resolution = config.overlap_resolution;
        }
        if self.split.is_none() {
            self.split = config.split;
        }
        if self.min_split_hits.is_none() {
            self.min_split_hits = config.min_split_hits;
        }
        merge_default(&mut self.sort, "query", config.sort);

        // Performance
        if self.threads.is_none() {
            self.threads = config.threads;
        }
        if self.cache_file.is_none() {
            self.cache_file = config.cache_file;
        }
        if self.cache_note.is_none() {
            self.cache_note = config.cache_note;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        self.rescore |= config.rescore.unwrap_or(false);
        self.score_cpg_mod |= config.score_cpg_mod.unwrap_or(false);
        self.div_cpg_mod |= config.div_cpg_mod.unwrap_or(false);
        self.complexity_adjust |= config.complexity_adjust.unwrap_or(false);
        self.kimura |= config.kimura.unwrap_or(false);
        self.exclude_alignments |= config.exclude_alignments.unwrap_or(false);
        self.dry_run |= config.dry_run.unwrap_or(false);

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self, String> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}
