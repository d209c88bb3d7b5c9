// sequence.rs - IUPAC nucleotide alphabet helpers

/// IUPAC nucleotide codes accepted in aligned strings and nucleotide matrices
pub const IUB_CODES: &[u8] = b"ACGTRYKMSWBDHVNX";

/// Classification of one aligned column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Match,
    Transition,
    Transversion,
    /// Mismatch involving an ambiguity code
    Ambiguous,
    Gap,
}

impl MutationType {
    /// Single character used on the annotation row of alignment blocks
    pub fn symbol(&self) -> char {
        match self {
            MutationType::Match => ' ',
            MutationType::Transition => 'i',
            MutationType::Transversion => 'v',
            MutationType::Ambiguous => '?',
            MutationType::Gap => '-',
        }
    }
}

#[inline]
pub fn is_gap(base: u8) -> bool {
    base == b'-'
}

#[inline]
pub fn is_masked(base: u8) -> bool {
    base == b'x' || base == b'X'
}

/// True for the four unambiguous nucleotides (case-insensitive)
#[inline]
pub fn is_well_characterized(base: u8) -> bool {
    matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
}

#[inline]
pub fn is_iub_code(base: u8) -> bool {
    IUB_CODES.contains(&base.to_ascii_uppercase())
}

/// Complement of an IUPAC code, preserving case; gaps and unknown symbols map to themselves
pub fn complement(base: u8) -> u8 {
    let upper = match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        other => other,
    };
    if base.is_ascii_lowercase() {
        upper.to_ascii_lowercase()
    } else {
        upper
    }
}

/// Reverse complement of an aligned string (gaps stay gaps)
pub fn reverse_complement(seq: &str) -> String {
    seq.bytes().rev().map(|b| complement(b) as char).collect()
}

fn is_purine(base: u8) -> bool {
    matches!(base, b'A' | b'G')
}

/// Classify an aligned column (case-insensitive)
pub fn mutation_type(query: u8, subject: u8) -> MutationType {
    if is_gap(query) || is_gap(subject) {
        return MutationType::Gap;
    }
    let q = query.to_ascii_uppercase();
    let s = subject.to_ascii_uppercase();
    if q == s {
        return MutationType::Match;
    }
    if !is_well_characterized(q) || !is_well_characterized(s) {
        return MutationType::Ambiguous;
    }
    if is_purine(q) == is_purine(s) {
        MutationType::Transition
    } else {
        MutationType::Transversion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_preserves_case_and_gaps() {
        assert_eq!(complement(b'A'), b'T');
        assert_eq!(complement(b'g'), b'c');
        assert_eq!(complement(b'R'), b'Y');
        assert_eq!(complement(b'-'), b'-');
        assert_eq!(complement(b'N'), b'N');
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement("ACG-TN"), "NA-CGT");
        assert_eq!(reverse_complement(&reverse_complement("AC-GTRYKM")), "AC-GTRYKM");
        assert_eq!(reverse_complement(&reverse_complement("ACGU-T")), "ACGU-T");
        assert_eq!(complement(b'U'), b'U');
        assert!(!is_iub_code(b'U'));
    }

    #[test]
    fn test_mutation_types() {
        assert_eq!(mutation_type(b'A', b'G'), MutationType::Transition);
        assert_eq!(mutation_type(b'C', b'T'), MutationType::Transition);
        assert_eq!(mutation_type(b'G', b'C'), MutationType::Transversion);
        assert_eq!(mutation_type(b'a', b'A'), MutationType::Match);
        assert_eq!(mutation_type(b'N', b'A'), MutationType::Ambiguous);
        assert_eq!(mutation_type(b'-', b'A'), MutationType::Gap);
        assert_eq!(MutationType::Transversion.symbol(), 'v');
    }
}
