//! Attribute-similarity scoring
//!
//! When an expression no longer matches exactly, candidates with the
//! same tag are scored by comparing attribute maps. Scoring per original
//! attribute: +1 if the candidate has the key at all, +1 more if the
//! values are equal, otherwise a Sørensen ratio over ordered matching
//! characters. A candidate is accepted when its total reaches 85% of the
//! perfect score.

/// Extract the attribute map from a path expression's last bracketed
/// clause. The expression is lowercased first; pairs are split on
/// ` and `. Clauses without `@key="value"` pairs (positional indexes)
/// yield an empty map.
pub fn attributes_from_expr(expr: &str) -> Vec<(String, String)> {
    let lowered = expr.to_lowercase();
    let clause = match (lowered.rfind('['), lowered.rfind(']')) {
        (Some(open), Some(close)) if open < close => &lowered[open + 1..close],
        _ => return Vec::new(),
    };

    let mut pairs = Vec::new();
    for part in clause.split(" and ") {
        let part = part.trim();
        let rest = match part.strip_prefix('@') {
            Some(rest) => rest,
            None => continue,
        };
        let eq = match rest.find('=') {
            Some(eq) => eq,
            None => continue,
        };
        let name = rest[..eq].trim().to_string();
        let value = rest[eq + 1..].trim().trim_matches('"').to_string();
        if !name.is_empty() {
            pairs.push((name, value));
        }
    }
    pairs
}

/// Look up a value in an attribute map
pub fn value_of<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Count characters of `a` that appear in `b` in the same relative
/// order, with a greedy forward scan. Only a match consumes candidate
/// positions: a character of `a` that finds no match leaves the scan at
/// the position after the last successful match.
pub fn ordered_matching_chars(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut next = 0;
    let mut matched = 0;
    for c in a.chars() {
        let mut j = next;
        while j < b_chars.len() {
            if b_chars[j] == c {
                matched += 1;
                next = j + 1;
                break;
            }
            j += 1;
        }
    }
    matched
}

/// Sørensen similarity: `2 * matched / (len a + len b)`
pub fn sorensen_index(a: &str, b: &str) -> f32 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 0.0;
    }
    (2 * ordered_matching_chars(a, b)) as f32 / total as f32
}

/// Score a candidate attribute map against the original's. For each
/// original attribute: +1 when the candidate carries the key (with the
/// id/class fallback), +1 more for an equal value, otherwise the
/// Sørensen ratio of the two values.
pub fn similarity_score(ours: &[(String, String)], theirs: &[(String, String)]) -> f32 {
    let mut score = 0.0;
    for (key, our_value) in ours {
        let their_value = value_of(theirs, key).or_else(|| match key.as_str() {
            // Elements frequently migrate between id and class markup
            "id" => value_of(theirs, "class"),
            "class" => value_of(theirs, "id"),
            _ => None,
        });
        if let Some(their_value) = their_value {
            score += 1.0;
            if our_value == their_value {
                score += 1.0;
            } else {
                score += sorensen_index(our_value, their_value);
            }
        }
    }
    score
}

/// Decide whether a candidate's score clears the acceptance threshold
/// for an original map of `n_attrs` attributes
pub fn accepts(score: f32, n_attrs: usize, threshold: f32) -> bool {
    n_attrs > 0 && score >= n_attrs as f32 * 2.0 * threshold
}
