//! Similarity primitives shared by the drift analyzers and the consistency probes.
//!
//! Every function here is pure and schema-independent. Similarities live in
//! `[0, 1]`; [`divergence`] maps a similarity to its complement.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("word pattern is valid"));

/// Jaccard index of two string collections. Duplicates collapse, order is
/// irrelevant, and two empty collections are identical (1.0).
pub fn set_similarity<A, B, S, T>(a: A, b: B) -> f64
where
    A: IntoIterator<Item = S>,
    B: IntoIterator<Item = T>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let left: BTreeSet<String> = a.into_iter().map(|s| s.as_ref().to_string()).collect();
    let right: BTreeSet<String> = b.into_iter().map(|s| s.as_ref().to_string()).collect();
    jaccard(&left, &right)
}

/// Jaccard index over already-collected sets.
pub fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.union(right).count();
    intersection as f64 / union as f64
}

/// Lower-cases every element before collecting into a set.
pub fn lowercase_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_lowercase())
        .collect()
}

/// Normalized edit-distance similarity: `1 - lev(a, b) / max(len)`.
///
/// Lengths are counted in chars. Identical strings (including two empty
/// strings) score 1.0; a non-empty string against an empty one scores 0.0.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let longest = len_a.max(len_b);
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Classic single-character insert/delete/substitute distance.
///
/// Uses two rolling rows sized by the shorter input.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };
    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// `1 - clamp(similarity, 0, 1)`.
pub fn divergence(similarity: f64) -> f64 {
    1.0 - clamp_unit(similarity)
}

/// Clamp into `[0, 1]`; NaN maps to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Lower-cased word tokens (letters, digits and apostrophes).
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Fraction of the reference's words longer than `min_len` chars that also
/// appear in the sample. `None` when the reference has no such words.
pub fn token_overlap(reference: &str, sample: &str, min_len: usize) -> Option<f64> {
    let wanted: BTreeSet<String> = tokenize(reference)
        .into_iter()
        .filter(|w| w.chars().count() > min_len)
        .collect();
    if wanted.is_empty() {
        return None;
    }
    let present: BTreeSet<String> = tokenize(sample).into_iter().collect();
    let hits = wanted.iter().filter(|w| present.contains(*w)).count();
    Some(hits as f64 / wanted.len() as f64)
}
