//! "Did you mean" candidates for misspelled field names and enum values.

use std::collections::BTreeMap;

/// Edit distance between two strings, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Closest candidate to `input`, if any is close enough.
///
/// A candidate qualifies when it equals the input after lower-casing and stripping
/// `_`/`-`, or when its edit distance is at most `max(2, len / 4)`. Normalized matches
/// win over distance; ties keep the earliest candidate.
pub fn closest<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized = normalize(input);
    let threshold = (input.chars().count() / 4).max(2);

    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        if candidate == input {
            continue;
        }
        let distance = if normalize(candidate) == normalized {
            0
        } else {
            levenshtein(input, candidate)
        };
        if distance > threshold {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// Suggestion for an invalid enum value: alias table first, then edit distance.
pub fn enum_value(
    input: &str,
    aliases: &BTreeMap<String, String>,
    allowed: &[&str],
) -> Option<String> {
    if let Some(canonical) = aliases.get(input) {
        return Some(canonical.clone());
    }
    let lowered = input.to_lowercase();
    if let Some(canonical) = aliases.get(&lowered) {
        return Some(canonical.clone());
    }
    closest(input, allowed.iter().copied())
}
