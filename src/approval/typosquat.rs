//! Typosquat detection for spender addresses
//!
//! An attacker who wants an approval signed will sometimes generate an
//! address that is visually close to a well-known router or marketplace.
//! This check compares a candidate spender against the known-spender table
//! and reports the closest near-miss.
//!
//! The prefilter requires equal length and identical first/last 4 hex
//! characters of the 40-character address body before any edit distance is
//! computed. That bounds the work to visually-similar pairs, and with the
//! prefix and suffix already pinned, an accidental distance-2 collision
//! between unrelated 40-character hex strings is astronomically unlikely,
//! while a single-character substitution attack still lands inside the
//! threshold.

use alloy::primitives::Address;

use super::known_spenders::KnownSpender;

const PREFIX_LENGTH: usize = 4;
const SUFFIX_LENGTH: usize = 4;
const MAX_DISTANCE: usize = 2;

/// A known spender the candidate address visually imitates
#[derive(Debug, Clone, Copy)]
pub struct TyposquatMatch {
    pub matched: KnownSpender,
    pub distance: usize,
}

/// Check whether `candidate` textually resembles a known spender without
/// being identical to one
///
/// Returns the closest known address within edit distance 2, or `None`.
pub fn is_possible_typosquat(
    candidate: Address,
    known_spenders: &[KnownSpender],
) -> Option<TyposquatMatch> {
    let candidate_body = hex_body(candidate);
    let mut best: Option<TyposquatMatch> = None;

    for known in known_spenders {
        if known.address == candidate {
            continue;
        }
        let known_body = hex_body(known.address);
        if !prefix_suffix_match(&candidate_body, &known_body) {
            continue;
        }
        let distance = levenshtein(&candidate_body, &known_body);
        if distance > MAX_DISTANCE {
            continue;
        }
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(TyposquatMatch {
                matched: *known,
                distance,
            });
        }
    }

    best
}

/// Levenshtein edit distance via the standard two-row recurrence
///
/// Insert, delete and substitute all cost 1.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, &a_char) in a.iter().enumerate() {
        curr[0] = i + 1;
        for j in 1..=b.len() {
            let cost = usize::from(a_char != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn prefix_suffix_match(candidate: &str, known: &str) -> bool {
    candidate.len() == known.len()
        && candidate[..PREFIX_LENGTH] == known[..PREFIX_LENGTH]
        && candidate[candidate.len() - SUFFIX_LENGTH..] == known[known.len() - SUFFIX_LENGTH..]
}

/// The 40-character lowercase hex body of an address, without the 0x prefix
fn hex_body(address: Address) -> String {
    format!("{address:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn uniswap_v2() -> KnownSpender {
        KnownSpender {
            name: "Uniswap V2 Router",
            address: address!("7a250d5630b4cf539739df2c5dacb4c659f2488d"),
        }
    }

    #[test]
    fn exact_match_does_not_trigger() {
        let known = [uniswap_v2()];
        assert!(is_possible_typosquat(known[0].address, &known).is_none());
    }

    #[test]
    fn near_match_with_same_prefix_suffix_triggers() {
        let known = [uniswap_v2()];
        // One substituted character in the middle: d -> e
        let candidate = address!("7a250d5630b4cf539739df2c5eacb4c659f2488d");

        let result = is_possible_typosquat(candidate, &known).unwrap();
        assert_eq!(result.matched.name, "Uniswap V2 Router");
        assert_eq!(result.distance, 1);
    }

    #[test]
    fn distance_above_threshold_does_not_trigger() {
        let known = [uniswap_v2()];
        // Three substituted characters
        let candidate = address!("7a250d5630b4cf539739ab3c5dacb4c659f2488d");

        assert!(is_possible_typosquat(candidate, &known).is_none());
    }

    #[test]
    fn different_prefix_is_prefiltered_out() {
        let known = [uniswap_v2()];
        // Identical body except the very first character
        let candidate = address!("8a250d5630b4cf539739df2c5dacb4c659f2488d");

        assert!(is_possible_typosquat(candidate, &known).is_none());
    }

    #[test]
    fn closest_known_address_wins() {
        let known = [
            uniswap_v2(),
            KnownSpender {
                name: "Distance two",
                // Two substitutions relative to the candidate below
                address: address!("7a250d5630b4cf539739dfff5eacb4c659f2488d"),
            },
        ];
        let candidate = address!("7a250d5630b4cf539739df2c5eacb4c659f2488d");

        let result = is_possible_typosquat(candidate, &known).unwrap();
        assert_eq!(result.matched.name, "Uniswap V2 Router");
    }

    #[test]
    fn levenshtein_recurrence() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "ab"), 2);
        assert_eq!(levenshtein("abcd", "abcd"), 0);
        assert_eq!(levenshtein("abcd", "abed"), 1);
        assert_eq!(levenshtein("abcd", "bcda"), 2);
    }
}
