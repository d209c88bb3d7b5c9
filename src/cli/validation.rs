// validation.rs - Input validation utilities

use regex::Regex;
use std::str::FromStr;

use crate::cli::args::Args;
use crate::core::RescoreParams;
use crate::data::{OverlapStrategy, RepeatField};
use crate::engines::{EngineParameters, EngineRegistry};
use crate::output::OutputFormat;

/// Order of the written results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Query name, start, then descending score
    Query,
    /// Descending score
    Score,
    /// Repeat family, class or subclass name
    Field(RepeatField),
    /// Longest query span first
    Length,
    /// Lowest divergence first
    Divergence,
    /// Report order
    None,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "query" => Ok(SortOrder::Query),
            "score" => Ok(SortOrder::Score),
            "length" | "size" => Ok(SortOrder::Length),
            "divergence" | "diverge" => Ok(SortOrder::Divergence),
            "none" => Ok(SortOrder::None),
            other => other.parse::<RepeatField>().map(SortOrder::Field).map_err(|_| {
                format!(
                    "Invalid sort order '{}'. Use: query, score, family, class, subclass, length, divergence, none",
                    s
                )
            }),
        }
    }
}

pub struct ValidationResult {
    pub engine_parameters: EngineParameters,
    pub output_format: OutputFormat,
    pub sort_order: SortOrder,
    pub rescore_params: RescoreParams,
    pub subject_include_regex: Option<Regex>,
    pub subject_exclude_regex: Option<Regex>,
    pub overlap_strategy: Option<OverlapStrategy>,
    pub split_field: Option<RepeatField>,
}

fn compile(pattern: Option<&String>, name: &str) -> Result<Option<Regex>, String> {
    pattern
        .map(|p| Regex::new(p).map_err(|e| format!("Invalid {} regex: {}", name, e)))
        .transpose()
}

fn check_percent(value: Option<f64>, name: &str) -> Result<(), String> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(format!("--{} must be between 0 and 100, got {}", name, v)),
        _ => Ok(()),
    }
}

fn check_penalty(value: i32, name: &str) -> Result<i32, String> {
    if value > 0 {
        return Err(format!("--{} must be zero or negative (penalties are added to the score), got {}", name, value));
    }
    Ok(value)
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult, String> {
    // Validate engine
    let registry = EngineRegistry::new();
    let engine = registry.get_engine(&args.engine).ok_or_else(|| {
        format!(
            "Invalid engine '{}'. Available: {}",
            args.engine,
            registry.get_engine_names().join(", ")
        )
    })?;
    let engine_parameters = engine.parameters();

    // Validate input source
    match (&args.report, &args.run) {
        (None, None) => return Err("Either --report or --run is required".to_string()),
        (Some(_), Some(_)) => return Err("--report and --run are mutually exclusive".to_string()),
        (Some(report), None) => {
            if report != "-" && !std::path::Path::new(report).exists() {
                return Err(format!("Report file '{}' does not exist", report));
            }
        }
        (None, Some(command)) => {
            if command.split_whitespace().next().is_none() {
                return Err("--run requires a non-empty command line".to_string());
            }
        }
    }

    // Rescoring needs a matrix and alignments
    if (args.rescore || args.x_drop.is_some()) && args.matrix.is_none() {
        return Err("--rescore and --x-drop require --matrix".to_string());
    }
    if args.exclude_alignments && (args.rescore || args.x_drop.is_some() || args.kimura) {
        return Err("--exclude-alignments cannot be combined with --rescore, --x-drop or --kimura".to_string());
    }
    if let Some(x_drop) = args.x_drop {
        if x_drop <= 0 {
            return Err(format!("--x-drop must be positive, got {}", x_drop));
        }
    }

    let rescore_params = RescoreParams {
        gap_open: check_penalty(args.gap_init.unwrap_or(engine_parameters.gap_init), "gap-init")?,
        ins_gap_ext: check_penalty(args.ins_gap_ext.unwrap_or(engine_parameters.ins_gap_ext), "ins-gap-ext")?,
        del_gap_ext: check_penalty(args.del_gap_ext.unwrap_or(engine_parameters.del_gap_ext), "del-gap-ext")?,
        score_cpg_mod: args.score_cpg_mod,
        div_cpg_mod: args.div_cpg_mod,
        complexity_adjust: args.complexity_adjust,
        x_drop: args.x_drop,
    };

    // Validate filters
    if let Some(mask_level) = args.mask_level {
        if mask_level > 100 {
            return Err(format!("Mask level must be between 0 and 100, got {}", mask_level));
        }
    }
    check_percent(args.min_divergence, "min-divergence")?;
    check_percent(args.max_divergence, "max-divergence")?;
    if let (Some(min), Some(max)) = (args.min_divergence, args.max_divergence) {
        if min > max {
            return Err(format!("--min-divergence {} exceeds --max-divergence {}", min, max));
        }
    }
    let overlap_strategy = args
        .overlap_resolution
        .as_deref()
        .map(OverlapStrategy::from_str)
        .transpose()?;
    let split_field = args.split.as_deref().map(RepeatField::from_str).transpose()?;
    if split_field.is_some() && args.output.is_none() {
        return Err("--split requires --output to name the split files".to_string());
    }
    if args.threads == Some(0) {
        return Err("--threads must be at least 1".to_string());
    }

    let output_format = OutputFormat::from_str(&args.format)?;
    let sort_order = SortOrder::from_str(&args.sort)?;
    if args.output.is_none() && args.cache_file.is_none() && !args.dry_run {
        return Err("--output or --cache-file is required".to_string());
    }

    // Compile regex patterns
    let subject_include_regex = compile(args.include_subjects.as_ref(), "include_subjects")?;
    let subject_exclude_regex = compile(args.exclude_subjects.as_ref(), "exclude_subjects")?;

    Ok(ValidationResult {
        engine_parameters,
        output_format,
        sort_order,
        rescore_params,
        subject_include_regex,
        subject_exclude_regex,
        overlap_strategy,
        split_field,
    })
}
