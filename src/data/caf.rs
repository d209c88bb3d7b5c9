// caf.rs - Compressed alignment format (CAF) and CIGAR encodings of search results

use std::fmt::Write as _;

use crate::core::sequence::is_gap;
use crate::data::record::{Orientation, SearchResult};
use crate::error::{Result, SearchError};

const CAF_FIELDS: usize = 17;

/// Encode aligned strings: equal bases pass through, `q/s` marks a substitution,
/// `-...-` wraps subject bases deleted from the query and `+...+` wraps query
/// bases inserted relative to the subject. Columns gapped on both sides are dropped.
pub fn encode_alignment(query: &str, subject: &str) -> String {
    #[derive(PartialEq)]
    enum Run {
        None,
        Deletion,
        Insertion,
    }

    let mut out = String::with_capacity(query.len() + 8);
    let mut run = Run::None;
    for (q, s) in query.bytes().zip(subject.bytes()) {
        let (q_gap, s_gap) = (is_gap(q), is_gap(s));
        if q_gap && s_gap {
            continue;
        }
        let next = if q_gap {
            Run::Deletion
        } else if s_gap {
            Run::Insertion
        } else {
            Run::None
        };
        if next != run {
            match run {
                Run::Deletion => out.push('-'),
                Run::Insertion => out.push('+'),
                Run::None => {}
            }
            match next {
                Run::Deletion => out.push('-'),
                Run::Insertion => out.push('+'),
                Run::None => {}
            }
            run = next;
        }
        match run {
            Run::Deletion => out.push(s as char),
            Run::Insertion => out.push(q as char),
            Run::None if q == s => out.push(q as char),
            Run::None => {
                out.push(q as char);
                out.push('/');
                out.push(s as char);
            }
        }
    }
    match run {
        Run::Deletion => out.push('-'),
        Run::Insertion => out.push('+'),
        Run::None => {}
    }
    out
}

/// Decode a CAF alignment back into (query, subject) aligned strings
pub fn decode_alignment(encoded: &str) -> Result<(String, String)> {
    let bytes = encoded.as_bytes();
    let mut query = String::with_capacity(bytes.len());
    let mut subject = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            marker @ (b'-' | b'+') => {
                let close = bytes[i + 1..]
                    .iter()
                    .position(|&b| b == marker)
                    .ok_or_else(|| SearchError::grammar("CafDecoder", encoded, "unterminated gap run"))?;
                for &base in &bytes[i + 1..i + 1 + close] {
                    if marker == b'-' {
                        query.push('-');
                        subject.push(base as char);
                    } else {
                        query.push(base as char);
                        subject.push('-');
                    }
                }
                i += close + 2;
            }
            b'/' => {
                return Err(SearchError::grammar("CafDecoder", encoded, "substitution without a query base"));
            }
            base => {
                if bytes.get(i + 1) == Some(&b'/') {
                    let other = *bytes
                        .get(i + 2)
                        .ok_or_else(|| SearchError::grammar("CafDecoder", encoded, "substitution without a subject base"))?;
                    query.push(base as char);
                    subject.push(other as char);
                    i += 3;
                } else {
                    query.push(base as char);
                    subject.push(base as char);
                    i += 1;
                }
            }
        }
    }
    Ok((query, subject))
}

/// Run-length CIGAR: M aligned column, I gap in the subject, D gap in the query
pub fn cigar_string(query: &str, subject: &str) -> String {
    let mut out = String::new();
    let mut current: Option<char> = None;
    let mut length = 0usize;
    for (q, s) in query.bytes().zip(subject.bytes()) {
        let op = match (is_gap(q), is_gap(s)) {
            (true, true) => continue,
            (true, false) => 'D',
            (false, true) => 'I',
            (false, false) => 'M',
        };
        if current == Some(op) {
            length += 1;
        } else {
            if let Some(prev) = current {
                let _ = write!(out, "{}{}", length, prev);
            }
            current = Some(op);
            length = 1;
        }
    }
    if let Some(prev) = current {
        let _ = write!(out, "{}{}", length, prev);
    }
    out
}

impl SearchResult {
    fn leading_fields(&self) -> String {
        format!(
            "{},{:.2},{:.2},{:.2},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.score,
            self.pct_diverge,
            self.pct_delete,
            self.pct_insert,
            self.query_name,
            self.query_start,
            self.query_end,
            self.query_remaining,
            self.subject_hit_name(),
            self.subject_class_name().unwrap_or(""),
            self.subject_start,
            self.subject_end,
            self.subject_remaining,
            if self.orientation.is_complement() { 1 } else { 0 },
            if self.overlap { "*" } else { "" },
            self.id.as_deref().unwrap_or("")
        )
    }

    /// Single CAF line (no trailing newline)
    pub fn to_caf(&self) -> String {
        format!(
            "{},{}",
            self.leading_fields(),
            encode_alignment(&self.query_string, &self.subject_string)
        )
    }

    /// CAF leading fields followed by a CIGAR string instead of the encoded alignment
    pub fn to_cigar_line(&self) -> String {
        format!(
            "{},{}",
            self.leading_fields(),
            cigar_string(&self.query_string, &self.subject_string)
        )
    }

    /// Parse one CAF line; percentages are recomputed from the decoded alignment
    pub fn from_caf(line: &str) -> Result<SearchResult> {
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        if fields.len() != CAF_FIELDS {
            return Err(SearchError::grammar(
                "CafDecoder",
                line,
                format!("expected {} fields, found {}", CAF_FIELDS, fields.len()),
            ));
        }

        let (query_string, subject_string) = decode_alignment(fields[16])?;
        let class = fields[9];
        let mut record = SearchResult {
            score: parse_field(line, fields[0], "score")?,
            pct_diverge: parse_field(line, fields[1], "pctDiverge")?,
            pct_delete: parse_field(line, fields[2], "pctDelete")?,
            pct_insert: parse_field(line, fields[3], "pctInsert")?,
            query_name: fields[4].to_string(),
            query_start: parse_field(line, fields[5], "queryStart")?,
            query_end: parse_field(line, fields[6], "queryEnd")?,
            query_remaining: parse_field(line, fields[7], "queryRemaining")?,
            subject_name: if class.is_empty() {
                fields[8].to_string()
            } else {
                format!("{}#{}", fields[8], class)
            },
            subject_start: parse_field(line, fields[10], "subjectStart")?,
            subject_end: parse_field(line, fields[11], "subjectEnd")?,
            subject_remaining: parse_field(line, fields[12], "subjectRemaining")?,
            orientation: match fields[13] {
                "0" => Orientation::Forward,
                "1" => Orientation::Complement,
                other => {
                    return Err(SearchError::grammar(
                        "CafDecoder",
                        line,
                        format!("orientation flag must be 0 or 1, found '{}'", other),
                    ))
                }
            },
            overlap: fields[14] == "*",
            id: (!fields[15].is_empty()).then(|| fields[15].to_string()),
            query_string,
            subject_string,
            ..Default::default()
        };
        record.recompute_percentages();
        Ok(record)
    }
}

fn parse_field<T: std::str::FromStr>(line: &str, value: &str, name: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SearchError::grammar("CafDecoder", line, format!("invalid {} '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::tests::sample_record;
    use proptest::prelude::*;

    #[test]
    fn test_encode_mixed_alignment() {
        assert_eq!(encode_alignment("ACGTA-CGTTA", "ACGCACCG-TA"), "ACGT/CA-C-CG+T+TA");
        assert_eq!(encode_alignment("AC--GT", "ACTTGA"), "AC-TT-GT/A");
        assert_eq!(encode_alignment("ACGGT", "AC--T"), "AC+GG+T");
    }

    #[test]
    fn test_decode_mixed_alignment() {
        let (q, s) = decode_alignment("ACGT/CA-C-CG+T+TA").unwrap();
        assert_eq!(q, "ACGTA-CGTTA");
        assert_eq!(s, "ACGCACCG-TA");
    }

    #[test]
    fn test_adjacent_gap_runs_round_trip() {
        let query = "A--GGTT-C";
        let subject = "ACC--TTAC";
        let encoded = encode_alignment(query, subject);
        assert_eq!(encoded, "A-CC-+GG+TT-A-C");
        let (q, s) = decode_alignment(&encoded).unwrap();
        assert_eq!((q.as_str(), s.as_str()), (query, subject));
    }

    #[test]
    fn test_decode_rejects_unterminated_runs() {
        assert!(decode_alignment("AC-GT").is_err());
        assert!(decode_alignment("AC+GT").is_err());
        assert!(decode_alignment("/A").is_err());
        assert!(decode_alignment("AC/").is_err());
    }

    #[test]
    fn test_cigar_convention() {
        assert_eq!(cigar_string("ACGTA-CGTTA", "ACGCACCG-TA"), "5M1D2M1I2M");
        assert_eq!(cigar_string("ACGT", "ACGT"), "4M");
        assert_eq!(cigar_string("", ""), "");
    }

    #[test]
    fn test_caf_line_round_trip() {
        let mut record = sample_record();
        record.orientation = Orientation::Complement;
        record.overlap = true;
        record.id = Some("17".to_string());
        let line = record.to_caf();
        assert!(line.starts_with("42,11.11,10.00,10.00,chr1,101,110,890,AluY,SINE/Alu,20,29,282,1,*,17,"));

        let decoded = SearchResult::from_caf(&line).unwrap();
        assert_eq!(decoded.query_string, record.query_string);
        assert_eq!(decoded.subject_string, record.subject_string);
        assert_eq!(decoded.subject_name, "AluY#SINE/Alu");
        assert_eq!(decoded.orientation, Orientation::Complement);
        assert_eq!(decoded.id.as_deref(), Some("17"));
        assert!(decoded.overlap);
        assert_eq!(decoded.pct_diverge, record.pct_diverge);
    }

    #[test]
    fn test_cigar_line_shares_leading_fields() {
        let record = sample_record();
        let line = record.to_cigar_line();
        assert!(line.ends_with(",0,,,5M1D2M1I2M"));
    }

    #[test]
    fn test_from_caf_errors() {
        assert!(SearchResult::from_caf("1,2,3").is_err());
        let record = sample_record();
        let bad_orient = record.to_caf().replacen(",282,0,", ",282,7,", 1);
        assert!(SearchResult::from_caf(&bad_orient).is_err());
        let bad_score = record.to_caf().replacen("42,", "x42,", 1);
        assert!(matches!(
            SearchResult::from_caf(&bad_score),
            Err(SearchError::Grammar { component: "CafDecoder", .. })
        ));
    }

    proptest! {
        #[test]
        fn caf_round_trip(cols in proptest::collection::vec((0usize..6, 0usize..6), 1..80)) {
            let alphabet = b"ACGTN-";
            let mut query = String::new();
            let mut subject = String::new();
            for (q, s) in cols {
                if alphabet[q] == b'-' && alphabet[s] == b'-' {
                    continue;
                }
                query.push(alphabet[q] as char);
                subject.push(alphabet[s] as char);
            }
            let (q, s) = decode_alignment(&encode_alignment(&query, &subject)).unwrap();
            prop_assert_eq!(q, query);
            prop_assert_eq!(s, subject);
        }
    }
}
