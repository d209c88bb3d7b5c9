// matrix.rs - Substitution matrix with background frequencies and Karlin-Altschul lambda

use std::fs;
use std::path::Path;

use crate::core::sequence::is_iub_code;
use crate::error::{Result, SearchError};

/// Lower bound on the doubling phase of the lambda search
const LAMBDA_START: f64 = 0.5;
/// Bisection stops once the bracket is narrower than this
const LAMBDA_TOLERANCE: f64 = 1e-5;
const MAX_DOUBLINGS: usize = 64;
const FREQ_SUM_MIN: f64 = 0.999;
const FREQ_SUM_MAX: f64 = 1.001;

/// Alphabet family of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    Nucleotide,
    Protein,
}

/// Square substitution-score table over a fixed alphabet
#[derive(Debug, Clone)]
pub struct ScoringMatrix {
    name: String,
    alphabet: Vec<u8>,
    lookup: Vec<Option<usize>>,
    scores: Vec<Vec<i32>>,
    freqs: Vec<f64>,
    lambda: f64,
}

impl ScoringMatrix {
    /// Load a matrix file; the file name becomes the matrix name
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| SearchError::io(path.display().to_string(), e))?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("matrix")
            .to_string();
        Self::parse(&name, &path.display().to_string(), &content)
    }

    /// Parse matrix text held in memory
    pub fn from_str_named(name: &str, text: &str) -> Result<Self> {
        Self::parse(name, name, text)
    }

    fn parse(name: &str, source: &str, text: &str) -> Result<Self> {
        let format_err = |line: usize, message: String| SearchError::MatrixFormat {
            path: source.to_string(),
            line,
            message,
        };

        let mut alphabet: Option<Vec<u8>> = None;
        let mut rows: Vec<Option<Vec<i32>>> = Vec::new();
        let mut next_row = 0usize;
        let mut freq_entries: Vec<(u8, f64)> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();

            if tokens[0].eq_ignore_ascii_case("FREQS") {
                if (tokens.len() - 1) % 2 != 0 {
                    return Err(format_err(line_no, "FREQS expects symbol/frequency pairs".to_string()));
                }
                for pair in tokens[1..].chunks(2) {
                    let symbol = single_symbol(pair[0]).ok_or_else(|| {
                        format_err(line_no, format!("invalid FREQS symbol '{}'", pair[0]))
                    })?;
                    let freq: f64 = pair[1].parse().map_err(|_| {
                        format_err(line_no, format!("invalid frequency '{}'", pair[1]))
                    })?;
                    freq_entries.push((symbol, freq));
                }
                continue;
            }

            let Some(symbols) = alphabet.as_ref() else {
                let header: Option<Vec<u8>> = tokens.iter().map(|t| single_symbol(t)).collect();
                match header {
                    Some(header) if header.len() >= 4 => {
                        rows = vec![None; header.len()];
                        alphabet = Some(header);
                    }
                    _ => {
                        return Err(format_err(
                            line_no,
                            "expected an alphabet header of at least 4 single-letter columns".to_string(),
                        ))
                    }
                }
                continue;
            };

            let (row_index, values) = match single_symbol(tokens[0]) {
                Some(label) => {
                    let pos = symbols.iter().position(|&s| s == label).ok_or_else(|| {
                        format_err(line_no, format!("row label '{}' is not in the alphabet", tokens[0]))
                    })?;
                    (pos, &tokens[1..])
                }
                None => (next_row, &tokens[..]),
            };
            if row_index >= symbols.len() {
                return Err(format_err(line_no, "more rows than alphabet symbols".to_string()));
            }
            if values.len() != symbols.len() {
                return Err(format_err(
                    line_no,
                    format!("row has {} scores, expected {}", values.len(), symbols.len()),
                ));
            }
            let parsed: std::result::Result<Vec<i32>, _> = values.iter().map(|v| v.parse::<i32>()).collect();
            let parsed = parsed.map_err(|_| format_err(line_no, "non-integer score".to_string()))?;
            rows[row_index] = Some(parsed);
            next_row = row_index + 1;
        }

        let alphabet = alphabet.ok_or_else(|| format_err(0, "missing alphabet header".to_string()))?;
        let scores: Vec<Vec<i32>> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                row.ok_or_else(|| format_err(0, format!("missing row for '{}'", alphabet[i] as char)))
            })
            .collect::<Result<_>>()?;

        let mut freqs: Vec<f64> = alphabet
            .iter()
            .map(|&s| if matches!(s, b'A' | b'C' | b'G' | b'T') { 0.25 } else { 0.0 })
            .collect();
        for (symbol, freq) in freq_entries {
            let pos = alphabet.iter().position(|&s| s == symbol).ok_or_else(|| {
                format_err(0, format!("FREQS symbol '{}' is not in the alphabet", symbol as char))
            })?;
            freqs[pos] = freq;
        }

        Self::build(name.to_string(), alphabet, scores, freqs)
    }

    fn build(name: String, alphabet: Vec<u8>, scores: Vec<Vec<i32>>, freqs: Vec<f64>) -> Result<Self> {
        let mut lookup = vec![None; 256];
        for (i, &symbol) in alphabet.iter().enumerate() {
            lookup[symbol as usize] = Some(i);
            lookup[symbol.to_ascii_lowercase() as usize] = Some(i);
        }
        let lambda = compute_lambda(&name, &scores, &freqs)?;
        Ok(Self {
            name,
            alphabet,
            lookup,
            scores,
            freqs,
            lambda,
        })
    }

    /// Swap score[i][j] and score[j][i]; lambda is recomputed
    pub fn transpose(&self) -> Result<Self> {
        let n = self.alphabet.len();
        let scores = (0..n)
            .map(|i| (0..n).map(|j| self.scores[j][i]).collect())
            .collect();
        Self::build(self.name.clone(), self.alphabet.clone(), scores, self.freqs.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.freqs
    }

    /// Karlin-Altschul scaling constant
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn kind(&self) -> MatrixKind {
        if self.alphabet.iter().all(|&s| is_iub_code(s)) {
            MatrixKind::Nucleotide
        } else {
            MatrixKind::Protein
        }
    }

    pub fn index_of(&self, symbol: u8) -> Option<usize> {
        self.lookup[symbol as usize]
    }

    /// Background frequency of a symbol (0 when not in the alphabet)
    pub fn frequency(&self, symbol: u8) -> f64 {
        self.index_of(symbol).map(|i| self.freqs[i]).unwrap_or(0.0)
    }

    /// Score of aligning `query` against `subject` (row = subject, column = query).
    /// Unknown symbols use the N column, then X, else score 0.
    pub fn score(&self, subject: u8, query: u8) -> i32 {
        match (self.resolve(subject), self.resolve(query)) {
            (Some(s), Some(q)) => self.scores[s][q],
            _ => 0,
        }
    }

    fn resolve(&self, symbol: u8) -> Option<usize> {
        self.index_of(symbol)
            .or_else(|| self.index_of(b'N'))
            .or_else(|| self.index_of(b'X'))
    }

    /// Expected score per aligned pair under the background model
    pub fn expected_score(&self) -> f64 {
        expected_score(&self.scores, &self.freqs)
    }

    /// Σ fi·fj·exp(lambda·sij) over symbols with non-zero frequency
    pub fn lambda_sum(&self, lambda: f64) -> Result<f64> {
        lambda_sum(&self.name, &self.scores, &self.freqs, lambda)
    }
}

fn single_symbol(token: &str) -> Option<u8> {
    let bytes = token.as_bytes();
    if bytes.len() == 1 && (bytes[0].is_ascii_alphabetic() || bytes[0] == b'*') {
        Some(bytes[0].to_ascii_uppercase())
    } else {
        None
    }
}

fn expected_score(scores: &[Vec<i32>], freqs: &[f64]) -> f64 {
    let mut total = 0.0;
    for (i, row) in scores.iter().enumerate() {
        for (j, &s) in row.iter().enumerate() {
            total += freqs[i] * freqs[j] * s as f64;
        }
    }
    total
}

fn lambda_sum(name: &str, scores: &[Vec<i32>], freqs: &[f64], lambda: f64) -> Result<f64> {
    let mut freq_total = 0.0;
    let mut sum = 0.0;
    for (i, row) in scores.iter().enumerate() {
        if freqs[i] == 0.0 {
            continue;
        }
        for (j, &s) in row.iter().enumerate() {
            if freqs[j] == 0.0 {
                continue;
            }
            let weight = freqs[i] * freqs[j];
            freq_total += weight;
            sum += weight * (lambda * s as f64).exp();
        }
    }
    if !(FREQ_SUM_MIN..=FREQ_SUM_MAX).contains(&freq_total) {
        return Err(SearchError::MalformedFrequencies {
            matrix: name.to_string(),
            sum: freq_total,
        });
    }
    Ok(sum)
}

/// Double lambda from 0.5 until the sum reaches 1, then bisect the bracket
fn compute_lambda(name: &str, scores: &[Vec<i32>], freqs: &[f64]) -> Result<f64> {
    // validates the frequency vector before anything else
    lambda_sum(name, scores, freqs, 0.0)?;

    let mut low = 0.0;
    let mut high = LAMBDA_START;
    let mut doublings = 0;
    while lambda_sum(name, scores, freqs, high)? < 1.0 {
        low = high;
        high *= 2.0;
        doublings += 1;
        if doublings > MAX_DOUBLINGS {
            return Err(SearchError::MatrixFormat {
                path: name.to_string(),
                line: 0,
                message: "no positive score reachable, lambda diverges".to_string(),
            });
        }
    }

    while high - low >= LAMBDA_TOLERANCE {
        let mid = (low + high) / 2.0;
        if lambda_sum(name, scores, freqs, mid)? >= 1.0 {
            high = mid;
        } else {
            low = mid;
        }
    }
    Ok((low + high) / 2.0)
}
