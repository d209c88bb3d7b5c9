// main.rs - CLI entry point

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rmsearch::cli::{Config, SortOrder};
use rmsearch::engines::{EngineRegistry, ParseOptions, ParseSummary, ResultSink, SearchEngine};
use rmsearch::error::SearchError;
use rmsearch::output::{save_cache, write_results, write_split_results, ResultCache};
use rmsearch::prelude::*;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    let registry = EngineRegistry::new();
    if args.list_engines {
        println!("Available engines:");
        for (name, desc) in registry.list_engines() {
            println!("  - {}: {}", name, desc);
        }
        return Ok(());
    }

    if args.matrix_info {
        let path = args.matrix.as_ref().ok_or("--matrix-info requires --matrix")?;
        let matrix = ScoringMatrix::from_file(path).map_err(|e| e.to_string())?;
        println!("📄 Matrix: {}", matrix.name());
        println!("  • Kind: {:?}", matrix.kind());
        println!("  • Alphabet: {}", String::from_utf8_lossy(matrix.alphabet()));
        println!("  • Lambda: {:.6}", matrix.lambda());
        println!("  • Expected score: {:.4}", matrix.expected_score());
        return Ok(());
    }

    // Validate all arguments
    let validation_result = validate_args(&args)?;
    let engine = registry
        .get_engine(&args.engine)
        .ok_or_else(|| format!("Invalid engine '{}'", args.engine))?;

    println!("🚀 rmsearch v{}", env!("CARGO_PKG_VERSION"));
    println!("🔍 Engine: {} ({})", engine.name(), engine.description());

    if args.dry_run {
        println!("✅ Dry run completed successfully");
        println!(
            "📊 Output: {} as {}",
            args.output.as_deref().unwrap_or("<none>"),
            validation_result.output_format
        );
        return Ok(());
    }

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        println!("🧵 Threads: {}", n);
    } else {
        println!("🧵 Threads: {} (auto-detected)", rayon::current_num_threads());
    }

    let total_start = Instant::now();

    // Load scoring matrix
    let matrix = match &args.matrix {
        Some(path) => {
            let matrix = ScoringMatrix::from_file(path).map_err(|e| e.to_string())?;
            println!("📄 Loaded matrix '{}' (lambda {:.4})", matrix.name(), matrix.lambda());
            Some(matrix)
        }
        None => None,
    };

    let options = ParseOptions {
        exclude_alignments: args.exclude_alignments,
        matrix_name: matrix
            .as_ref()
            .map(|m| m.name().to_string())
            .or_else(|| validation_result.engine_parameters.matrix.clone()),
    };

    // Parse the engine report
    let parse_start = Instant::now();
    let mut results = SearchResultCollection::new();
    let summary = parse_input(&args, engine, &options, &mut results)?;
    println!(
        "✅ Parsed {} results from {} lines in {:.2}s",
        summary.results,
        summary.lines,
        parse_start.elapsed().as_secs_f64()
    );

    // Rescoring and divergence
    if let Some(matrix) = &matrix {
        let params = &validation_result.rescore_params;
        if params.x_drop.is_some() {
            let before = results.len();
            results.split_xdrop(matrix, params).map_err(|e| e.to_string())?;
            println!("✂️  xDrop split: {} hits → {} fragments", before, results.len());
        } else if args.rescore {
            results.rescore_all(matrix, params).map_err(|e| e.to_string())?;
            println!(
                "🎯 Rescored {} hits{}",
                results.len(),
                if params.complexity_adjust { " (complexity adjusted)" } else { "" }
            );
        }
    }
    if args.kimura {
        results.annotate_kimura(args.div_cpg_mod).map_err(|e| e.to_string())?;
        println!(
            "🧬 Kimura divergence annotated{}",
            if args.div_cpg_mod { " (CpG adjusted)" } else { "" }
        );
    }

    // Filtering
    if let Some(min_score) = args.min_score {
        let removed = results.filter_min_score(min_score);
        println!("📏 Minimum score {}: removed {} hits", min_score, removed);
    }
    let removed = results.retain_subjects(
        validation_result.subject_include_regex.as_ref(),
        validation_result.subject_exclude_regex.as_ref(),
    );
    if removed > 0 {
        println!("🔍 Subject filters removed {} hits", removed);
    }
    if let Some(mask_level) = args.mask_level {
        let removed = results.mask_level_filter(mask_level);
        println!("📏 Mask level {}: removed {} hits", mask_level, removed);
    }
    if let Some(strategy) = validation_result.overlap_strategy {
        let removed = results.resolve_overlaps(strategy).map_err(|e| e.to_string())?;
        println!("✂️  Overlaps resolved by {:?}: removed {} hits", strategy, removed);
    }
    if let Some(min_length) = args.min_length {
        let removed = results.filter_min_length(min_length);
        println!("📏 Minimum length {}: removed {} hits", min_length, removed);
    }
    if args.min_divergence.is_some() || args.max_divergence.is_some() {
        let removed = results.filter_divergence(args.min_divergence, args.max_divergence);
        println!("🧬 Divergence window: removed {} hits", removed);
    }

    match validation_result.sort_order {
        SortOrder::Query => results.sort_by_query(),
        SortOrder::Score => results.sort_by_score(),
        SortOrder::Field(field) => results.sort_by_field(field),
        SortOrder::Length => results.sort_by_length(),
        SortOrder::Divergence => results.sort_by_divergence(),
        SortOrder::None => {}
    }

    if let Some(output) = &args.output {
        write_results(output, validation_result.output_format, &results, &command_line)
            .map_err(|e| e.to_string())?;
        if let Some(field) = validation_result.split_field {
            let written = write_split_results(
                output,
                validation_result.output_format,
                field,
                args.min_split_hits.unwrap_or(1),
                &results,
                &command_line,
            )
            .map_err(|e| e.to_string())?;
            println!("📁 Split by {:?} into {} files", field, written.len());
        }
    }

    if let Some(cache_path) = &args.cache_file {
        let cache = ResultCache::new(
            results,
            Some(engine.name().to_string()),
            options.matrix_name.clone(),
            args.cache_note.clone(),
        );
        save_cache(cache_path, &cache).map_err(|e| e.to_string())?;
    }

    println!("⏱️  Total time: {:.2}s", total_start.elapsed().as_secs_f64());
    Ok(())
}

/// Feed the report file, stdin or a launched engine through the parser
fn parse_input(
    args: &Args,
    engine: &dyn SearchEngine,
    options: &ParseOptions,
    results: &mut SearchResultCollection,
) -> Result<ParseSummary, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} results {msg}")
            .map_err(|e| format!("Invalid progress template: {}", e))?,
    );

    let mut on_result = |result: SearchResult| {
        results.push(result);
        pb.inc(1);
        Ok::<(), SearchError>(())
    };
    let mut sink = ResultSink::Callback(&mut on_result);

    let summary = if let Some(command) = &args.run {
        let command: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        println!("📂 Running: {}", command.join(" "));
        let run = engine
            .invoke(&command, &mut sink, options)
            .map_err(|e| e.to_string())?;
        if !run.succeeded() {
            if run.is_benign_failure() {
                println!("⚠️  {} exited with code {} (no usable hits)", command[0], run.result_code);
            } else {
                return Err(format!(
                    "{} exited with code {}: {}",
                    command[0],
                    run.result_code,
                    run.stderr.trim()
                ));
            }
        }
        run.summary
    } else {
        let report = args.report.as_deref().ok_or("--report or --run is required")?;
        let mut reader: Box<dyn BufRead> = if report == "-" {
            println!("📂 Reading report from stdin");
            Box::new(BufReader::new(io::stdin()))
        } else {
            println!("📂 Reading report: {}", report);
            let file = File::open(report).map_err(|e| format!("Failed to open report '{}': {}", report, e))?;
            Box::new(BufReader::new(file))
        };
        engine
            .parse_output(reader.as_mut(), &mut sink, options)
            .map_err(|e| e.to_string())?
    };

    pb.finish_and_clear();
    Ok(summary)
}
