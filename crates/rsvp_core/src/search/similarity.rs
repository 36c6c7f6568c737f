//! String similarity scores on a 0–100 scale.
//!
//! All scores derive from the insertion/deletion (InDel) similarity
//! `1 - indel_distance(a, b) / (len(a) + len(b))`, scaled to 100 and rounded
//! to the nearest integer.
//!
//! # Invariants
//! - Identical inputs score 100, including two empty strings.
//! - An empty input scores 0 against any non-empty input.
//! - `ratio` and `partial_ratio` compare text as given; the token variants
//!   lowercase and strip punctuation first.

use rapidfuzz::distance::indel;
use std::collections::BTreeSet;

/// Similarity score, 0 (nothing shared) to 100 (identical).
pub type Score = u8;

/// Whole-string similarity.
pub fn ratio(a: &str, b: &str) -> Score {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] between the shorter input and a window of the longer one.
///
/// Windows have the shorter input's length, except near the end of the longer
/// input where they are clipped.
pub fn partial_ratio(a: &str, b: &str) -> Score {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    if a == b {
        return 100;
    }
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if shorter.is_empty() {
        return 0;
    }

    let mut best = 0;
    for start in 0..longer.len() {
        let end = (start + shorter.len()).min(longer.len());
        best = best.max(ratio_chars(shorter, &longer[start..end]));
        if best == 100 {
            break;
        }
    }
    best
}

/// [`ratio`] after sorting each input's tokens, so word order is ignored.
pub fn token_sort_ratio(a: &str, b: &str) -> Score {
    let mut a_tokens = tokens(a);
    let mut b_tokens = tokens(b);
    a_tokens.sort_unstable();
    b_tokens.sort_unstable();
    ratio(&a_tokens.join(" "), &b_tokens.join(" "))
}

/// Compares the shared tokens against each side's full token set, so extra
/// or missing words cost little.
pub fn token_set_ratio(a: &str, b: &str) -> Score {
    let a_tokens = tokens(a).into_iter().collect::<BTreeSet<_>>();
    let b_tokens = tokens(b).into_iter().collect::<BTreeSet<_>>();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0;
    }

    let shared = join_tokens(a_tokens.intersection(&b_tokens));
    let only_a = join_tokens(a_tokens.difference(&b_tokens));
    let only_b = join_tokens(b_tokens.difference(&a_tokens));

    let with_a = concat_tokens(&shared, &only_a);
    let with_b = concat_tokens(&shared, &only_b);

    ratio(&shared, &with_a)
        .max(ratio(&shared, &with_b))
        .max(ratio(&with_a, &with_b))
}

fn ratio_chars(a: &[char], b: &[char]) -> Score {
    if a == b {
        return 100;
    }
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let distance = indel::distance(a.iter().copied(), b.iter().copied());
    let matched = total.saturating_sub(distance);
    let scaled = (matched as f64 * 100.0 / total as f64).round();
    scaled as Score
}

/// Lowercased alphanumeric runs.
fn tokens(value: &str) -> Vec<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn join_tokens<'a>(tokens: impl Iterator<Item = &'a String>) -> String {
    tokens.map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn concat_tokens(shared: &str, rest: &str) -> String {
    format!("{shared} {rest}").trim().to_string()
}
