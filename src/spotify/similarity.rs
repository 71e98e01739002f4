//! Fuzzy string similarity.
//!
//! Matching-blocks ratio: find the longest block of characters the two
//! strings share, recurse on the pieces to either side of it, and score
//! `2 * matched / (len(a) + len(b))`. This reproduces the ratio of Python's
//! `difflib.SequenceMatcher`, which the ranking behavior depends on; it is
//! not an edit distance and not a bag-of-characters overlap.

use std::collections::HashMap;

/// Similarity ratio in [0, 1] between two strings, case-insensitive.
///
/// Identical strings score 1.0 (two empty strings count as identical);
/// strings sharing no characters score 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matched_len(&a, &b) as f64 / total as f64
}

/// Total length of the non-overlapping matching blocks between `a` and `b`.
fn matched_len(a: &[char], b: &[char]) -> usize {
    // Positions of every character in `b`, ascending.
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        pending.push((alo, i, blo, j));
        pending.push((i + size, ahi, j + size, bhi));
    }

    matched
}

/// Longest block with `a[i..i + size] == b[j..j + size]` inside the given
/// windows. Of all maximal blocks the one starting earliest in `a` (then
/// earliest in `b`) wins.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    // j2len[j] = length of the longest block ending at a[i - 1], b[j].
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(&a[i]) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let size = if j == 0 {
                    1
                } else {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                };
                next.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_one() {
        assert_eq!(similarity("Imagine", "Imagine"), 1.0);
        assert_eq!(similarity("a", "a"), 1.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(similarity("IMAGINE", "imagine"), 1.0);
        assert_eq!(similarity("John Lennon", "JOHN LENNON"), 1.0);
    }

    #[test]
    fn test_disjoint_strings_score_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_both_empty_score_one() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [("night", "nacht"), ("abcd", "bcde"), ("Imagine", "Imagine Dragons")];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    // Reference values hand-checked against the matching-blocks definition.

    #[test]
    fn test_known_ratio_overlap() {
        // blocks: "bcd" -> 2 * 3 / 8
        assert_eq!(similarity("abcd", "bcde"), 0.75);
    }

    #[test]
    fn test_known_ratio_night_nacht() {
        // blocks: "ht" then "n" -> 2 * 3 / 10
        assert_eq!(similarity("night", "nacht"), 0.6);
    }

    #[test]
    fn test_blocks_are_ordered_not_a_bag() {
        // "abcd" matches once; the displaced "xyz" cannot also match because
        // blocks never cross each other: 2 * 4 / 14
        let got = similarity("abcdxyz", "xyzabcd");
        assert!((got - 8.0 / 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_prefix_ratio() {
        // "Imagine" inside "Imagine Dragons": 2 * 7 / 22
        let got = similarity("Imagine", "Imagine Dragons");
        assert!((got - 14.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_artist_threshold_neighborhood() {
        // The ranker filters on > 0.6; these two sit on either side of it.
        assert!(similarity("Beatles", "The Beatles") > 0.6);
        assert!(similarity("Beatles", "Rolling Stones") <= 0.6);
    }
}
