//! Maps a free-text value onto a target's closed option vocabulary.
//!
//! Tiers are tried in order and the first match wins:
//! exact, normalized, substring, approximate similarity, fallback.
//! Pure and deterministic; no surface access.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Minimum similarity score (exclusive) for the approximate tier.
pub const SIMILARITY_THRESHOLD: f64 = 70.0;

/// Which matching strategy produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionTier {
    Exact,
    Normalized,
    Substring,
    Approximate,
    Fallback,
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionTier::Exact => "exact",
            ResolutionTier::Normalized => "normalized",
            ResolutionTier::Substring => "substring",
            ResolutionTier::Approximate => "approximate",
            ResolutionTier::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub value: String,
    pub tier: ResolutionTier,
    /// Similarity score, only set for the approximate tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl ResolutionResult {
    fn new(value: &str, tier: ResolutionTier) -> Self {
        Self {
            value: value.to_string(),
            tier,
            score: None,
        }
    }
}

/// Lower-cases, turns every non-letter into a separator, collapses whitespace
/// and strips one trailing plural `s` from words longer than three characters.
pub fn normalize(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    let mut collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > 3 && collapsed.ends_with('s') {
        collapsed.pop();
    }
    collapsed
}

/// Similarity in `[0, 100]` between two already-normalized strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Resolves `desired` against `options`.
///
/// `options` must be non-empty. Iteration order of `options` breaks every tie.
pub fn resolve(
    desired: &str,
    options: &[String],
    fallback: Option<&str>,
) -> Result<ResolutionResult, ResolveError> {
    let first = options.first().ok_or(ResolveError::EmptyOptions)?;

    if let Some(hit) = options.iter().find(|o| o.as_str() == desired) {
        return Ok(ResolutionResult::new(hit, ResolutionTier::Exact));
    }

    let wanted = normalize(desired);
    let normalized: Vec<String> = options.iter().map(|o| normalize(o)).collect();

    if let Some(i) = normalized.iter().position(|n| *n == wanted) {
        return Ok(ResolutionResult::new(&options[i], ResolutionTier::Normalized));
    }

    if !wanted.is_empty() {
        let contained = normalized
            .iter()
            .position(|n| !n.is_empty() && (n.contains(&wanted) || wanted.contains(n.as_str())));
        if let Some(i) = contained {
            return Ok(ResolutionResult::new(&options[i], ResolutionTier::Substring));
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in normalized.iter().enumerate() {
            let score = similarity(&wanted, candidate);
            if score > SIMILARITY_THRESHOLD && best.is_none_or(|(_, top)| score > top) {
                best = Some((i, score));
            }
        }
        if let Some((i, score)) = best {
            return Ok(ResolutionResult {
                value: options[i].clone(),
                tier: ResolutionTier::Approximate,
                score: Some(score),
            });
        }
    }

    let value = match fallback {
        Some(default) if options.iter().any(|o| o == default) => default,
        _ => first.as_str(),
    };
    Ok(ResolutionResult::new(value, ResolutionTier::Fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("  Gold-Plated "), "gold plated");
        assert_eq!(normalize("Rose-Gold"), "rose gold");
        assert_eq!(normalize("GST_18"), "gst");
    }

    #[test]
    fn normalize_strips_single_plural_s() {
        assert_eq!(normalize("Necklaces"), "necklace");
        assert_eq!(normalize("bus"), "bus");
        assert_eq!(normalize("glass"), "glas");
    }

    #[test]
    fn exact_member_wins() {
        let options = opts(&["Gold", "gold", "Silver"]);
        let r = resolve("gold", &options, None).unwrap();
        assert_eq!(r.value, "gold");
        assert_eq!(r.tier, ResolutionTier::Exact);
    }

    #[test]
    fn every_member_resolves_to_itself_exactly() {
        let options = opts(&["Alloy", "Brass", "Copper", "Stainless Steel", "NA"]);
        for option in &options {
            let r = resolve(option, &options, Some("NA")).unwrap();
            assert_eq!(&r.value, option);
            assert_eq!(r.tier, ResolutionTier::Exact);
        }
    }

    #[test]
    fn normalized_match_ignores_case_punctuation_and_plural() {
        let options = opts(&["Silver", "gold plated"]);
        let r = resolve("Gold-Plated ", &options, None).unwrap();
        assert_eq!(r.value, "gold plated");
        assert_eq!(r.tier, ResolutionTier::Normalized);

        let options = opts(&["Earring", "Necklace"]);
        let r = resolve("necklaces", &options, None).unwrap();
        assert_eq!(r.value, "Necklace");
        assert_eq!(r.tier, ResolutionTier::Normalized);
    }

    #[test]
    fn rose_gold_prefers_normalized_over_fallback() {
        let options = opts(&["Gold", "Silver", "Rose-Gold"]);
        let r = resolve("Rose Gold", &options, Some("Gold")).unwrap();
        assert_eq!(r.value, "Rose-Gold");
        assert_eq!(r.tier, ResolutionTier::Normalized);
    }

    #[test]
    fn substring_match_in_either_direction() {
        let options = opts(&["Brass", "Antique Gold Finish"]);
        let r = resolve("gold", &options, None).unwrap();
        assert_eq!(r.value, "Antique Gold Finish");
        assert_eq!(r.tier, ResolutionTier::Substring);

        let options = opts(&["Pearl", "Kundan"]);
        let r = resolve("Kundan Pearl Set", &options, None).unwrap();
        assert_eq!(r.value, "Pearl");
        assert_eq!(r.tier, ResolutionTier::Substring);
    }

    #[test]
    fn approximate_match_above_threshold() {
        let options = opts(&["Silver", "Oxidised"]);
        let r = resolve("oxidized", &options, None).unwrap();
        assert_eq!(r.value, "Oxidised");
        assert_eq!(r.tier, ResolutionTier::Approximate);
        assert!(r.score.unwrap() > SIMILARITY_THRESHOLD);
    }

    #[test]
    fn approximate_tie_keeps_first_occurrence() {
        let options = opts(&["abcdx", "abcdy"]);
        let r = resolve("abcdz", &options, None).unwrap();
        assert_eq!(r.value, "abcdx");
        assert_eq!(r.tier, ResolutionTier::Approximate);
    }

    #[test]
    fn unknown_value_uses_member_fallback() {
        let options = opts(&["Gold", "Silver"]);
        let r = resolve("Unknown Finish", &options, Some("Gold")).unwrap();
        assert_eq!(r.value, "Gold");
        assert_eq!(r.tier, ResolutionTier::Fallback);
    }

    #[test]
    fn non_member_fallback_uses_first_option() {
        let options = opts(&["Silver", "Gold"]);
        let r = resolve("Unknown Finish", &options, Some("Platinum")).unwrap();
        assert_eq!(r.value, "Silver");
        assert_eq!(r.tier, ResolutionTier::Fallback);
    }

    #[test]
    fn no_fallback_uses_first_option() {
        let options = opts(&["Silver", "Gold"]);
        let r = resolve("Unknown Finish", &options, None).unwrap();
        assert_eq!(r.value, "Silver");
        assert_eq!(r.tier, ResolutionTier::Fallback);
    }

    #[test]
    fn empty_desired_value_never_substring_matches() {
        let options = opts(&["Women", "Men"]);
        let r = resolve("--", &options, Some("Men")).unwrap();
        assert_eq!(r.value, "Men");
        assert_eq!(r.tier, ResolutionTier::Fallback);
    }

    #[test]
    fn empty_options_is_an_error() {
        assert_eq!(resolve("Gold", &[], Some("Gold")), Err(ResolveError::EmptyOptions));
    }

    #[test]
    fn result_is_always_a_member() {
        let options = opts(&["2.4 inches", "2.6 inches", "Free Size"]);
        for value in ["2.4", "FREE", "xyz", "", "2.6 Inches"] {
            let r = resolve(value, &options, Some("not there")).unwrap();
            assert!(options.contains(&r.value), "{value} resolved outside options");
        }
    }

    #[test]
    fn tier_display() {
        assert_eq!(ResolutionTier::Approximate.to_string(), "approximate");
        assert_eq!(ResolutionTier::Fallback.to_string(), "fallback");
    }
}
