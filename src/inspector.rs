// inspector.rs - Result cache inspector
// Features: LZ4 cache inspection, subject/query overviews, integrity checks, exports

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use argh::FromArgs;
use rmsearch::data::{SearchResult, SearchResultCollection};
use rmsearch::output::{load_cache, write_results, OutputFormat, ResultCache};

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

#[derive(FromArgs)]
/// Inspect rmsearch result cache files
struct Args {
    /// path to the cache file (.lz4)
    #[argh(option)]
    cache: String,

    /// show every subject instead of the top entries
    #[argh(switch)]
    detailed: bool,

    /// show the hits of one query sequence
    #[argh(option)]
    show_query: Option<String>,

    /// validate cache integrity (alignments, spans, links)
    #[argh(switch)]
    validate: bool,

    /// export per-subject summary to TSV file
    #[argh(option)]
    export_summary: Option<String>,

    /// re-export the cached results as a CAF file
    #[argh(option)]
    export_caf: Option<String>,

    /// show top N subjects by hit count (default: 10)
    #[argh(option, default = "10")]
    top_subjects: usize,

    /// quiet mode - minimal output
    #[argh(switch)]
    quiet: bool,
}

/// Aggregates for one subject
#[derive(Debug, Default, Clone)]
struct SubjectStats {
    hits: usize,
    total_score: i64,
    total_diverge: f64,
    total_kimura: f64,
    kimura_hits: usize,
    query_bases: usize,
}

impl SubjectStats {
    fn add(&mut self, result: &SearchResult) {
        self.hits += 1;
        self.total_score += i64::from(result.score);
        self.total_diverge += result.pct_diverge;
        if let Some(kimura) = result.pct_kimura_diverge {
            self.total_kimura += kimura;
            self.kimura_hits += 1;
        }
        self.query_bases += result.query_length();
    }

    fn avg_score(&self) -> f64 {
        self.total_score as f64 / self.hits.max(1) as f64
    }

    fn avg_diverge(&self) -> f64 {
        self.total_diverge / self.hits.max(1) as f64
    }

    fn avg_kimura(&self) -> Option<f64> {
        (self.kimura_hits > 0).then(|| self.total_kimura / self.kimura_hits as f64)
    }
}

fn subject_stats(results: &SearchResultCollection) -> Vec<(String, SubjectStats)> {
    let mut stats: HashMap<String, SubjectStats> = HashMap::new();
    for result in results {
        stats.entry(result.subject_name.clone()).or_default().add(result);
    }
    let mut stats: Vec<_> = stats.into_iter().collect();
    stats.sort_by(|a, b| b.1.hits.cmp(&a.1.hits).then_with(|| a.0.cmp(&b.0)));
    stats
}

// ============================================================================
// ANALYSIS FUNCTIONS
// ============================================================================

fn analyze_cache_overview(cache: &ResultCache, args: &Args) {
    if args.quiet {
        return;
    }

    let metadata = &cache.metadata;
    println!("\n=== CACHE SUMMARY ===");
    println!("Version: {}", metadata.version);
    println!("Format version: {}", metadata.format_version);
    println!("Created: {}", metadata.created);
    println!("Last modified: {}", metadata.last_modified);
    println!("Engine: {}", metadata.engine.as_deref().unwrap_or("unknown"));
    println!("Matrix: {}", metadata.matrix.as_deref().unwrap_or("none"));
    if let Some(note) = &metadata.user_note {
        println!("📝 User note: {}", note);
    }
    println!("Total results: {}", cache.results.len());
    println!("Unique queries: {}", metadata.unique_queries);

    let results = &cache.results;
    if results.is_empty() {
        return;
    }
    let with_alignment = results.iter().filter(|r| r.has_alignment()).count();
    let complement = results.iter().filter(|r| r.orientation.is_complement()).count();
    let count = results.len() as f64;
    println!("\n=== RESULT STATISTICS ===");
    println!("With alignments: {}", with_alignment);
    println!("Complement strand: {} ({:.1}%)", complement, complement as f64 * 100.0 / count);
    println!(
        "Average score: {:.2}",
        results.iter().map(|r| f64::from(r.score)).sum::<f64>() / count
    );
    println!(
        "Average divergence: {:.2}%",
        results.iter().map(|r| r.pct_diverge).sum::<f64>() / count
    );
}

fn analyze_subjects(cache: &ResultCache, args: &Args) {
    if args.quiet && !args.detailed {
        return;
    }

    println!("\n=== SUBJECT OVERVIEW ===");
    let stats = subject_stats(&cache.results);
    println!(
        "{:<30} {:>8} {:>10} {:>10} {:>10} {:>12}",
        "Subject", "Hits", "Avg score", "Avg div", "Avg Kimura", "Query bases"
    );
    println!("{}", "=".repeat(85));

    let show_count = if args.detailed {
        stats.len()
    } else {
        args.top_subjects.min(stats.len())
    };
    for (subject, stat) in stats.iter().take(show_count) {
        let kimura = stat.avg_kimura().map_or_else(|| "-".to_string(), |k| format!("{:.2}", k));
        println!(
            "{:<30} {:>8} {:>10.1} {:>10.2} {:>10} {:>12}",
            subject,
            stat.hits,
            stat.avg_score(),
            stat.avg_diverge(),
            kimura,
            stat.query_bases
        );
    }

    if !args.detailed && stats.len() > args.top_subjects {
        println!(
            "... and {} more subjects (use --detailed to show all)",
            stats.len() - args.top_subjects
        );
    }
}

fn analyze_query(cache: &ResultCache, query_name: &str) {
    println!("\n=== QUERY DETAILS: {} ===", query_name);

    let hits: Vec<&SearchResult> = cache.results.iter().filter(|r| r.query_name == query_name).collect();
    if hits.is_empty() {
        println!("❌ Query '{}' not found in cache", query_name);
        let mut available: Vec<&str> = cache
            .results
            .iter()
            .map(|r| r.query_name.as_str())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        available.sort();
        println!("Available queries: {:?}", available);
        return;
    }

    println!("Total hits: {}", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        if i >= 20 {
            println!("... and {} more hits", hits.len() - 20);
            break;
        }
        println!("{}", hit.summary_line());
    }
}

fn validate_cache_integrity(cache: &ResultCache) -> bool {
    println!("\n=== CACHE VALIDATION ===");

    let mut errors = 0;
    let mut warnings = 0;

    for (index, result) in cache.results.iter().enumerate() {
        if result.query_start > result.query_end || result.subject_start > result.subject_end {
            if errors < 5 {
                println!("❌ ERROR: result {} has reversed coordinates: {}", index, result.summary_line());
            }
            errors += 1;
            continue;
        }
        if !result.has_alignment() {
            continue;
        }
        let counts = result.column_counts();
        if result.query_string.len() != result.subject_string.len()
            || counts.query_bases != result.query_length()
            || counts.subject_bases != result.subject_length()
        {
            if errors < 5 {
                println!("❌ ERROR: result {} alignment does not fit its coordinates", index);
            }
            errors += 1;
        }
        if let Some(kimura) = result.pct_kimura_diverge {
            if !(0.0..=100.0).contains(&kimura) {
                println!("⚠️  WARNING: result {} has Kimura divergence {:.2}", index, kimura);
                warnings += 1;
            }
        }
    }

    for index in 0..cache.results.len() {
        if let Err(e) = cache.results.chain_from(index) {
            println!("❌ ERROR: {}", e);
            errors += 1;
            break;
        }
    }

    if cache.metadata.total_results != cache.results.len() {
        println!(
            "⚠️  WARNING: metadata lists {} results, cache holds {}",
            cache.metadata.total_results,
            cache.results.len()
        );
        warnings += 1;
    }

    if errors == 0 && warnings == 0 {
        println!("✅ Cache validation passed - no issues found");
        true
    } else {
        println!("⚠️  Cache validation completed: {} errors, {} warnings", errors, warnings);
        if errors > 0 {
            println!("❌ Cache has integrity issues that should be addressed");
            false
        } else {
            println!("✅ Cache is valid but has minor warnings");
            true
        }
    }
}

fn export_summary_to_tsv(cache: &ResultCache, output_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(output_path)?;

    writeln!(file, "# rmsearch cache summary")?;
    writeln!(file, "# Version: {}", cache.metadata.version)?;
    writeln!(file, "# Created: {}", cache.metadata.created)?;
    writeln!(file, "# Engine: {}", cache.metadata.engine.as_deref().unwrap_or("unknown"))?;
    writeln!(file, "# Matrix: {}", cache.metadata.matrix.as_deref().unwrap_or("none"))?;
    writeln!(file)?;
    writeln!(file, "subject\thits\tavg_score\tavg_diverge\tavg_kimura\tquery_bases")?;

    let mut stats = subject_stats(&cache.results);
    stats.sort_by(|a, b| a.0.cmp(&b.0));
    for (subject, stat) in stats {
        let kimura = stat.avg_kimura().map_or_else(String::new, |k| format!("{:.3}", k));
        writeln!(
            file,
            "{}\t{}\t{:.3}\t{:.3}\t{}\t{}",
            subject,
            stat.hits,
            stat.avg_score(),
            stat.avg_diverge(),
            kimura,
            stat.query_bases
        )?;
    }

    println!("✅ Summary exported to: {}", output_path);
    Ok(())
}

// ============================================================================
// MAIN FUNCTION
// ============================================================================

fn main() {
    let args: Args = argh::from_env();

    if !args.quiet {
        println!("🔍 rmsearch Cache Inspector");
        println!("===========================");
    }

    if !Path::new(&args.cache).exists() {
        eprintln!("❌ ERROR: Cache file does not exist: {}", args.cache);
        std::process::exit(1);
    }
    let cache = match load_cache(&args.cache) {
        Ok(cache) => cache,
        Err(e) => {
            eprintln!("❌ ERROR loading cache: {}", e);
            std::process::exit(1);
        }
    };

    analyze_cache_overview(&cache, &args);
    analyze_subjects(&cache, &args);

    if let Some(query_name) = &args.show_query {
        analyze_query(&cache, query_name);
    }

    if args.validate && !validate_cache_integrity(&cache) {
        std::process::exit(1);
    }

    if let Some(export_path) = &args.export_summary {
        if let Err(e) = export_summary_to_tsv(&cache, export_path) {
            eprintln!("❌ ERROR exporting summary: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(caf_path) = &args.export_caf {
        let command_line = std::env::args().collect::<Vec<String>>().join(" ");
        if let Err(e) = write_results(caf_path, OutputFormat::Caf, &cache.results, &command_line) {
            eprintln!("❌ ERROR exporting CAF: {}", e);
            std::process::exit(1);
        }
    }

    if !args.quiet {
        println!("\n✅ Cache inspection completed successfully");
        println!("\nUsage examples:");
        println!("  --detailed                           Show all subjects");
        println!("  --show-query chr1                    Show hits of one query");
        println!("  --validate                           Validate cache integrity");
        println!("  --export-summary out.tsv             Export per-subject summary to TSV");
        println!("  --export-caf out.caf                 Re-export cached results as CAF");
        println!("  --quiet                              Minimal output mode");
    }
}
