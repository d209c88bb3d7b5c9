// mod.rs - Output formatters module

pub mod cache;

use std::fmt;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::data::{RepeatField, SearchResult, SearchResultCollection};
use crate::error::{Result, SearchError};

pub use cache::{load_cache, save_cache, CacheMetadata, ResultCache, CACHE_FORMAT_VERSION};

/// Supported result file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Caf,
    Cigar,
    Align,
    Out,
    Tsv,
    Json,
    Bed,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Caf,
        OutputFormat::Cigar,
        OutputFormat::Align,
        OutputFormat::Out,
        OutputFormat::Tsv,
        OutputFormat::Json,
        OutputFormat::Bed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Caf => "caf",
            OutputFormat::Cigar => "cigar",
            OutputFormat::Align => "align",
            OutputFormat::Out => "out",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Bed => "bed",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unsupported output format: {}. Use: caf, cigar, align, out, tsv, json, bed", s))
    }
}

/// Ensure parent directory exists before creating file
fn ensure_parent_dir(file_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|e| SearchError::io(parent.display().to_string(), e))?;
        }
    }
    Ok(())
}

fn create_writer(file_path: &str) -> Result<BufWriter<File>> {
    ensure_parent_dir(file_path)?;
    let file = File::create(file_path).map_err(|e| SearchError::io(file_path, e))?;
    Ok(BufWriter::new(file))
}

fn generated_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Write one line per record using `render`
fn write_lines<W: Write>(writer: &mut W, results: &SearchResultCollection, render: fn(&SearchResult) -> String) -> std::io::Result<()> {
    for result in results {
        writeln!(writer, "{}", render(result))?;
    }
    Ok(())
}

/// Write records as CAF lines
pub fn write_caf<W: Write>(writer: &mut W, results: &SearchResultCollection) -> std::io::Result<()> {
    write_lines(writer, results, SearchResult::to_caf)
}

/// Write records as CAF leading fields plus CIGAR
pub fn write_cigar<W: Write>(writer: &mut W, results: &SearchResultCollection) -> std::io::Result<()> {
    write_lines(writer, results, SearchResult::to_cigar_line)
}

/// Write cross_match style alignment blocks
pub fn write_align<W: Write>(writer: &mut W, results: &SearchResultCollection) -> std::io::Result<()> {
    for result in results {
        writeln!(writer, "{}", result.to_align_block())?;
    }
    Ok(())
}

/// Write a RepeatMasker style `.out` table
pub fn write_out<W: Write>(writer: &mut W, results: &SearchResultCollection) -> std::io::Result<()> {
    writeln!(
        writer,
        "{:>6} {:>5} {:>4} {:>4}  {:<16} {:>9} {:>9} {:>11}   {:<16} {:<18} {:>7} {:>7} {:>7}",
        "SW", "perc", "perc", "perc", "query", "position", "in", "query", "matching", "repeat", "position", "in", "repeat"
    )?;
    writeln!(
        writer,
        "{:>6} {:>5} {:>4} {:>4}  {:<16} {:>9} {:>9} {:>11}   {:<16} {:<18} {:>7} {:>7} {:>7}",
        "score", "div.", "del.", "ins.", "sequence", "begin", "end", "(left)", "repeat", "class/family", "begin", "end", "(left)"
    )?;
    writeln!(writer)?;
    write_lines(writer, results, SearchResult::to_out_line)
}

/// Write BED rows (0-based half-open query spans) without a header
pub fn write_bed<W: Write>(writer: &mut W, results: &SearchResultCollection) -> std::io::Result<()> {
    write_lines(writer, results, SearchResult::to_bed_line)
}

/// Flattened record used for TSV output
#[derive(Debug, Serialize)]
struct TsvRow<'a> {
    score: i32,
    pct_diverge: String,
    pct_delete: String,
    pct_insert: String,
    pct_kimura: String,
    query: &'a str,
    query_start: usize,
    query_end: usize,
    query_remaining: usize,
    strand: &'static str,
    subject: &'a str,
    class: &'a str,
    subject_start: usize,
    subject_end: usize,
    subject_remaining: usize,
    evalue: String,
    matrix: &'a str,
    id: &'a str,
    overlap: bool,
}

impl<'a> TsvRow<'a> {
    fn from_result(result: &'a SearchResult) -> Self {
        Self {
            score: result.score,
            pct_diverge: format!("{:.2}", result.pct_diverge),
            pct_delete: format!("{:.2}", result.pct_delete),
            pct_insert: format!("{:.2}", result.pct_insert),
            pct_kimura: result.pct_kimura_diverge.map_or_else(String::new, |k| format!("{:.2}", k)),
            query: &result.query_name,
            query_start: result.query_start,
            query_end: result.query_end,
            query_remaining: result.query_remaining,
            strand: if result.orientation.is_complement() { "C" } else { "+" },
            subject: result.subject_hit_name(),
            class: result.subject_class_name().unwrap_or(""),
            subject_start: result.subject_start,
            subject_end: result.subject_end,
            subject_remaining: result.subject_remaining,
            evalue: result.evalue.map_or_else(String::new, |e| format!("{:e}", e)),
            matrix: result.matrix_name.as_deref().unwrap_or(""),
            id: result.id.as_deref().unwrap_or(""),
            overlap: result.overlap,
        }
    }
}

/// Write a tab-separated summary with `#` provenance comments
pub fn write_tsv<W: Write>(writer: &mut W, results: &SearchResultCollection, command_line: &str) -> Result<()> {
    let io_err = |e: std::io::Error| SearchError::io("<tsv output>", e);
    writeln!(writer, "# Command: {}", command_line).map_err(io_err)?;
    writeln!(writer, "# Generated: {}", generated_stamp()).map_err(io_err)?;
    writeln!(writer, "# rmsearch v{}", env!("CARGO_PKG_VERSION")).map_err(io_err)?;

    let mut tsv = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for result in results {
        tsv.serialize(TsvRow::from_result(result))
            .map_err(|e| SearchError::Serialization(format!("TSV row: {}", e)))?;
    }
    tsv.flush().map_err(io_err)?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated: String,
    version: &'static str,
    command: &'a str,
    total_results: usize,
    results: &'a [SearchResult],
}

/// Write every record, alignments included, as pretty JSON
pub fn write_json<W: Write>(writer: &mut W, results: &SearchResultCollection, command_line: &str) -> Result<()> {
    let report = JsonReport {
        generated: generated_stamp(),
        version: env!("CARGO_PKG_VERSION"),
        command: command_line,
        total_results: results.len(),
        results: results.as_slice(),
    };
    serde_json::to_writer_pretty(&mut *writer, &report)
        .map_err(|e| SearchError::Serialization(format!("JSON results: {}", e)))?;
    writeln!(writer).map_err(|e| SearchError::io("<json output>", e))
}

/// Write results to `file_path` in the requested format
pub fn write_results(
    file_path: &str,
    format: OutputFormat,
    results: &SearchResultCollection,
    command_line: &str,
) -> Result<()> {
    let mut writer = create_writer(file_path)?;
    let io_err = |e: std::io::Error| SearchError::io(file_path, e);
    match format {
        OutputFormat::Caf => write_caf(&mut writer, results).map_err(io_err)?,
        OutputFormat::Cigar => write_cigar(&mut writer, results).map_err(io_err)?,
        OutputFormat::Align => write_align(&mut writer, results).map_err(io_err)?,
        OutputFormat::Out => write_out(&mut writer, results).map_err(io_err)?,
        OutputFormat::Tsv => write_tsv(&mut writer, results, command_line)?,
        OutputFormat::Json => write_json(&mut writer, results, command_line)?,
        OutputFormat::Bed => write_bed(&mut writer, results).map_err(io_err)?,
    }
    writer.flush().map_err(io_err)?;
    println!("✅ {} results written to: {} ({} format)", results.len(), file_path, format);
    Ok(())
}

/// `dir/chr1.bed` + `AluY` -> `dir/chr1_AluY.bed`; `/` in the value becomes `_`
pub fn split_file_path(file_path: &str, value: &str) -> String {
    let path = Path::new(file_path);
    let stem = path.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let mut name = format!("{}_{}", stem, value.replace('/', "_"));
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name).to_string_lossy().into_owned()
}

/// Write one file per family, class or subclass next to `file_path`.
///
/// Groups with fewer than `min_hits` records are skipped. Returns the paths written.
pub fn write_split_results(
    file_path: &str,
    format: OutputFormat,
    field: RepeatField,
    min_hits: usize,
    results: &SearchResultCollection,
    command_line: &str,
) -> Result<Vec<String>> {
    let mut written = Vec::new();
    for (value, group) in results.group_by(field) {
        if group.len() < min_hits {
            continue;
        }
        let path = split_file_path(file_path, &value);
        write_results(&path, format, &group, command_line)?;
        written.push(path);
    }
    Ok(written)
}

/// Read a CAF file back into a collection; blank lines are skipped
pub fn read_caf(file_path: &str) -> Result<SearchResultCollection> {
    let text = std::fs::read_to_string(file_path).map_err(|e| SearchError::io(file_path, e))?;
    let mut results = SearchResultCollection::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let result = SearchResult::from_caf(line).map_err(|e| e.at_line(index + 1))?;
        results.push(result);
    }
    Ok(results)
}
