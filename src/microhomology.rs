use crate::error::Result;
use crate::reference::ReferenceSequence;

/// Shortest shared stretch reported as microhomology.
pub const MIN_MICROHOMOLOGY: usize = 2;

/// Reference bases `[pos - flank + 1, pos + flank]` around one breakpoint.
pub fn breakpoint_window<R: ReferenceSequence + ?Sized>(
    reference: &R,
    pos: i64,
    flank: usize,
) -> Result<String> {
    let flank = flank as i64;
    reference.fetch(pos - flank + 1, pos + flank)
}

/// Longest substring shared by both windows, if at least
/// `MIN_MICROHOMOLOGY` long. Ties go to the leftmost hit in `seq1`.
pub fn find_microhomology(seq1: &str, seq2: &str) -> Option<String> {
    let a = seq1.as_bytes();
    let b = seq2.as_bytes();
    if a.is_empty() || b.is_empty() {
        return None;
    }

    // rolling row of common-suffix lengths
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut best_len = 0;
    let mut best_end = 0;

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] && a[i - 1] != b'N' {
                curr[j] = prev[j - 1] + 1;
                if curr[j] > best_len {
                    best_len = curr[j];
                    best_end = i;
                }
            } else {
                curr[j] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    if best_len < MIN_MICROHOMOLOGY {
        return None;
    }
    Some(String::from_utf8_lossy(&a[best_end - best_len..best_end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::InMemoryReference;

    #[test]
    fn finds_longest_shared_stretch() {
        assert_eq!(
            find_microhomology("TTACCTCCCAGG", "GGACCTCCCTTA").as_deref(),
            Some("ACCTCCC")
        );
    }

    #[test]
    fn ties_prefer_leftmost_in_first_window() {
        assert_eq!(find_microhomology("ACxxGT", "GTyyAC").as_deref(), Some("AC"));
    }

    #[test]
    fn single_base_is_not_microhomology() {
        assert_eq!(find_microhomology("AAAA", "CCCA"), None);
        assert_eq!(find_microhomology("", "ACGT"), None);
    }

    #[test]
    fn multibyte_characters_do_not_split() {
        // U+00E9 is two bytes; the shared run starts inside it
        let seq1 = "A\u{e9}CGT";
        let seq2 = "\u{a9}CGTT";
        assert_eq!(find_microhomology(seq1, seq2).as_deref(), Some("\u{fffd}CGT"));
        assert!(find_microhomology("\u{e9}\u{e9}", "\u{e9}\u{e9}").is_some());
    }

    #[test]
    fn window_spans_both_sides_of_breakpoint() {
        let reference = InMemoryReference::new("chrM", "AACCGGTTAACCGGTT");
        assert_eq!(breakpoint_window(&reference, 4, 2).unwrap(), "CCGG");
        assert!(breakpoint_window(&reference, 1, 2).is_err());
        assert!(breakpoint_window(&reference, 16, 2).is_err());
    }
}
