// traits.rs - Core traits and types for the search engine system

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};

use crate::data::{SearchResult, SearchResultCollection};
use crate::error::{Result, SearchError};

/// Substrings of engine stderr that accompany a harmless non-zero exit
const BENIGN_FAILURES: &[&str] = &[
    "no valid contexts",
    "Could not calculate ungapped Karlin-Altschul parameters",
    "sequence is too short",
    "shorter than the word size",
];

/// Options shared by every report parser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Drop aligned strings once percentages are computed
    pub exclude_alignments: bool,
    /// Matrix name attached to hits whose report does not name one
    pub matrix_name: Option<String>,
}

/// Counters returned by [`parse_report`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub lines: usize,
    pub results: usize,
}

/// Destination of finalised records: every record goes to exactly one place
pub enum ResultSink<'a> {
    Collection(&'a mut SearchResultCollection),
    Callback(&'a mut dyn FnMut(SearchResult) -> Result<()>),
}

impl ResultSink<'_> {
    pub fn accept(&mut self, result: SearchResult) -> Result<()> {
        match self {
            ResultSink::Collection(collection) => {
                collection.push(result);
                Ok(())
            }
            ResultSink::Callback(callback) => (*callback)(result),
        }
    }
}

/// Line-driven report parser; a line may close at most one hit
pub trait ReportParser: Send {
    /// Feed one line (without its newline), returning a hit closed by it
    fn consume(&mut self, line: &str) -> Result<Option<SearchResult>>;

    /// Close the hit still open at end of stream
    fn finish(&mut self) -> Result<Option<SearchResult>>;
}

/// Drive `parser` over every line of `reader`, attaching line numbers to grammar errors
pub fn parse_report<R: BufRead + ?Sized>(
    reader: &mut R,
    parser: &mut dyn ReportParser,
    sink: &mut ResultSink<'_>,
) -> Result<ParseSummary> {
    let mut summary = ParseSummary::default();
    let mut buffer: Vec<u8> = Vec::new();
    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .map_err(|e| SearchError::io("<report stream>", e))?;
        if read == 0 {
            break;
        }
        summary.lines += 1;
        // sequence descriptions are not always UTF-8
        let line = String::from_utf8_lossy(&buffer);
        let text = line.trim_end_matches(['\n', '\r']);
        if let Some(result) = parser.consume(text).map_err(|e| e.at_line(summary.lines))? {
            sink.accept(result)?;
            summary.results += 1;
        }
    }
    if let Some(result) = parser.finish().map_err(|e| e.at_line(summary.lines))? {
        sink.accept(result)?;
        summary.results += 1;
    }
    Ok(summary)
}

/// Default search settings of an engine, using the signed penalty convention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineParameters {
    /// Executable name looked up on PATH
    pub program: String,
    pub matrix: Option<String>,
    pub min_score: i32,
    pub gap_init: i32,
    pub ins_gap_ext: i32,
    pub del_gap_ext: i32,
    pub mask_level: Option<u32>,
    /// Whether the report carries full alignments
    pub alignments: bool,
}

/// Outcome of running an external engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineRun {
    pub result_code: i32,
    pub summary: ParseSummary,
    pub stderr: String,
}

impl EngineRun {
    pub fn succeeded(&self) -> bool {
        self.result_code == 0
    }

    /// Non-zero exits caused by queries the engine simply had nothing to do with
    pub fn is_benign_failure(&self) -> bool {
        !self.succeeded() && BENIGN_FAILURES.iter().any(|msg| self.stderr.contains(msg))
    }
}

/// Trait for alignment engines whose reports become [`SearchResult`]s
pub trait SearchEngine: Send + Sync + Debug {
    /// Registry name of this engine
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn parameters(&self) -> EngineParameters;

    /// Fresh parser for one report
    fn new_parser(&self, options: &ParseOptions) -> Box<dyn ReportParser>;

    /// Parse an already captured report
    fn parse_output(
        &self,
        reader: &mut dyn BufRead,
        sink: &mut ResultSink<'_>,
        options: &ParseOptions,
    ) -> Result<ParseSummary> {
        let mut parser = self.new_parser(options);
        parse_report(reader, parser.as_mut(), sink)
    }

    /// Run a prepared command line and stream its stdout through the parser.
    /// A non-zero exit is returned in [`EngineRun::result_code`], never as an error.
    fn invoke(&self, command: &[String], sink: &mut ResultSink<'_>, options: &ParseOptions) -> Result<EngineRun> {
        let (program, args) = command.split_first().ok_or_else(|| SearchError::Engine {
            component: self.name(),
            message: "empty command line".to_string(),
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SearchError::Engine {
                component: self.name(),
                message: format!("failed to start '{}': {}", program, e),
            })?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let stdout = child.stdout.take().ok_or_else(|| SearchError::Engine {
            component: self.name(),
            message: "engine stdout was not captured".to_string(),
        })?;
        let parsed = self.parse_output(&mut BufReader::new(stdout), sink, options);
        if parsed.is_err() {
            let _ = child.kill();
        }

        let status = child.wait().map_err(|e| SearchError::Engine {
            component: self.name(),
            message: format!("failed to wait for '{}': {}", program, e),
        })?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        Ok(EngineRun {
            result_code: status.code().unwrap_or(-1),
            summary: parsed?,
            stderr,
        })
    }
}
