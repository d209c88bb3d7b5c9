// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub report: Option<String>,
    pub run: Option<String>,
    pub engine: Option<String>,
    pub output: Option<String>,
    pub format: Option<String>,

    // Rescoring
    pub matrix: Option<String>,
    pub rescore: Option<bool>,
    pub gap_init: Option<i32>,
    pub ins_gap_ext: Option<i32>,
    pub del_gap_ext: Option<i32>,
    pub score_cpg_mod: Option<bool>,
    pub div_cpg_mod: Option<bool>,
    pub complexity_adjust: Option<bool>,
    pub x_drop: Option<i32>,
    pub kimura: Option<bool>,

    // Filtering
    pub min_score: Option<i32>,
    pub mask_level: Option<u32>,
    pub include_subjects: Option<String>,
    pub exclude_subjects: Option<String>,
    pub min_length: Option<usize>,
    pub min_divergence: Option<f64>,
    pub max_divergence: Option<f64>,
    pub overlap_resolution: Option<String>,
    pub split: Option<String>,
    pub min_split_hits: Option<usize>,
    pub sort: Option<String>,
    pub exclude_alignments: Option<bool>,

    // Performance
    pub threads: Option<usize>,
    pub cache_file: Option<String>,
    pub cache_note: Option<String>,

    // Flags
    pub dry_run: Option<bool>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, content).map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        println!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r##"# rmsearch.toml - Configuration file for rmsearch
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Engine report to parse (use - for stdin)
report = "/path/to/chr1.cross_match"

# Alternatively run an engine and parse its stdout
# run = "cross_match chr1.fa lib.fa -alignments -masklevel 80"

# Report grammar: crossmatch, ncbi, rmblast, wublast, wublastx, decypher
engine = "crossmatch"

# Output results file
output = "chr1.caf"

# Output format: caf, cigar, align, out, tsv, json, bed
format = "caf"

# =============================================================================
# RESCORING
# =============================================================================

# Scoring matrix file (required for rescore and x_drop)
matrix = "/path/to/14p41g.matrix"

# Recompute scores from the alignments
rescore = false

# Gap penalties, negative (defaults come from the engine)
# gap_init = -25
# ins_gap_ext = -5
# del_gap_ext = -5

# Score CpG transitions as matches when rescoring
score_cpg_mod = false

# Count CpG transitions at reduced weight in Kimura divergence
div_cpg_mod = true

# Composition based complexity adjustment of rescored hits
complexity_adjust = false

# Split hits into xDrop fragments
# x_drop = 500

# Annotate every hit with its Kimura divergence
kimura = true

# =============================================================================
# FILTERING
# =============================================================================

# Drop hits scoring below this value
min_score = 225

# cross_match masklevel filter (0-100, 100 keeps everything)
mask_level = 80

# Keep only subjects matching regex pattern
# include_subjects = "#SINE/"

# Drop subjects matching regex pattern
# exclude_subjects = "Simple_repeat|Low_complexity"

# Drop hits shorter than this many query bases
# min_length = 50

# Divergence window in percent (Kimura when annotated)
# min_divergence = 0.0
# max_divergence = 35.0

# Make annotations disjoint: higher_score, longer_element, lower_divergence
# overlap_resolution = "higher_score"

# Also write one file per family, class or subclass
# split = "class"
# min_split_hits = 10

# Sort order: query, score, family, class, subclass, length, divergence, none
sort = "query"

# Do not keep aligned strings once percentages are computed
exclude_alignments = false

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of threads (omit for auto-detection)
threads = 8

# Cache file for parsed results (.lz4 extension)
# cache_file = "chr1.lz4"

# User note to save with the cache for future reference
# cache_note = "chr1 vs Dfam curated"

# =============================================================================
# FLAGS
# =============================================================================

# Validate inputs without parsing (dry run)
dry_run = false
"##
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config = Config::from_toml(&Config::generate_sample()).unwrap();
        assert_eq!(config.engine.as_deref(), Some("crossmatch"));
        assert_eq!(config.mask_level, Some(80));
        assert_eq!(config.div_cpg_mod, Some(true));
        assert_eq!(config.gap_init, None);
        assert_eq!(config.threads, Some(8));
        assert_eq!(config.overlap_resolution, None);
    }

    #[test]
    fn test_annotation_options_parse() {
        let config = Config::from_toml(
            "min_length = 50\nmax_divergence = 35.0\noverlap_resolution = \"lower_divergence\"\nsplit = \"class\"\n",
        )
        .unwrap();
        assert_eq!(config.min_length, Some(50));
        assert_eq!(config.max_divergence, Some(35.0));
        assert_eq!(config.min_divergence, None);
        assert_eq!(config.overlap_resolution.as_deref(), Some("lower_divergence"));
        assert_eq!(config.split.as_deref(), Some("class"));
    }

    #[test]
    fn test_sample_keeps_class_patterns() {
        let sample = Config::generate_sample();
        assert!(sample.contains("# include_subjects = \"#SINE/\""));
        assert!(sample.contains("Simple_repeat|Low_complexity"));
        assert!(sample.trim_end().ends_with("dry_run = false"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(Config::from_toml("mask_level = \"high\"").is_err());
    }

    #[test]
    fn test_config_file_round_trip() {
        let path = std::env::temp_dir().join(format!("rmsearch-config-{}.toml", std::process::id()));
        let config = Config {
            engine: Some("ncbi".to_string()),
            x_drop: Some(300),
            rescore: Some(true),
            ..Config::default()
        };
        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
