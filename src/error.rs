// error.rs - Error taxonomy shared by parsers, matrices and rescoring

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors raised while loading matrices, parsing engine reports or scoring alignments
#[derive(Error, Debug)]
pub enum SearchError {
    /// A file could not be opened or read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Matrix file does not follow the header/rows/FREQS layout
    #[error("ScoringMatrix: malformed matrix '{path}' at line {line}: {message}")]
    MatrixFormat {
        path: String,
        line: usize,
        message: String,
    },

    /// Background frequencies do not sum to one
    #[error("ScoringMatrix: background frequency products of '{matrix}' sum to {sum:.4}, expected 1.0 +/- 0.001")]
    MalformedFrequencies { matrix: String, sum: f64 },

    /// Engine report line that breaks the grammar of its parser
    #[error("{component}: line {line_number}: {message}\n  offending line: {line}")]
    Grammar {
        component: &'static str,
        line_number: usize,
        line: String,
        message: String,
    },

    /// Aligned strings disagree with each other or with the coordinates
    #[error("{component}: corrupt alignment {query} vs {subject}: {message}")]
    CorruptAlignment {
        component: &'static str,
        query: String,
        subject: String,
        message: String,
    },

    /// Linked hit chain does not terminate
    #[error("linked hit chain starting at index {start} does not terminate")]
    LinkLoop { start: usize },

    /// Link between hits refers outside the collection
    #[error("hit link {left} -> {right} outside collection of {len} results")]
    InvalidLink { left: usize, right: usize, len: usize },

    /// Link table and result arena disagree in size
    #[error("link table holds {links} entries for {results} results")]
    LinkTable { links: usize, results: usize },

    /// External engine could not be run or its output could not be read
    #[error("{component}: {message}")]
    Engine {
        component: &'static str,
        message: String,
    },

    /// Result records could not be encoded as JSON/TSV
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Result cache exists but cannot be decoded
    #[error("invalid result cache '{path}': {message}")]
    Cache { path: String, message: String },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SearchError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        SearchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Grammar error whose line number is filled in by the report driver
    pub fn grammar(component: &'static str, line: &str, message: impl Into<String>) -> Self {
        SearchError::Grammar {
            component,
            line_number: 0,
            line: line.to_string(),
            message: message.into(),
        }
    }

    /// Attach a 1-based line number to a grammar error
    pub fn at_line(self, number: usize) -> Self {
        match self {
            SearchError::Grammar {
                component,
                line,
                message,
                ..
            } => SearchError::Grammar {
                component,
                line_number: number,
                line,
                message,
            },
            other => other,
        }
    }
}
