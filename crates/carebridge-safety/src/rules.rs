// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-driven safety rule tables.
//!
//! Rules are ordered lists of lowercase keywords (substring match) and
//! compiled regex patterns, kept separate from the classification control
//! flow so they can be tested and extended without touching it.

use std::sync::LazyLock;

use regex::Regex;

/// Keywords whose presence classifies a message as an emergency.
/// Any emergency match outranks any urgent match, regardless of rule order.
pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "chest pain",
    "can't breathe",
    "cannot breathe",
    "difficulty breathing",
    "heart attack",
    "stroke",
    "seizure",
    "unconscious",
    "severe bleeding",
    "anaphylaxis",
    "overdose",
    "suicide",
    "suicidal",
    "kill myself",
    "end my life",
    "choking",
];

/// Keywords whose presence classifies a message as urgent (when no
/// emergency keyword matches).
pub const URGENT_KEYWORDS: &[&str] = &[
    "high fever",
    "severe pain",
    "getting worse",
    "worsening",
    "spreading rash",
    "blood in",
    "vomiting blood",
    "coughing up blood",
    "fainted",
    "allergic reaction",
    "infection",
    "dehydrated",
];

/// Topics the assistant refuses outright, independent of urgency.
pub const PROHIBITED_TOPICS: &[&str] = &[
    "prescribe",
    "prescription",
    "refill",
    "dosage",
    "controlled substance",
    "opioid",
    "sick note",
    "sick leave certificate",
    "medical certificate",
    "doctor's note",
];

/// Restricted-action phrases a generated response must never contain
/// (prescribing language).
pub static RESTRICTED_ACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bi (?:can |will |would )?prescribe\b",
        r"(?i)\byou should take \d+\s*(?:mg|ml|mcg|units)\b",
        r"(?i)\btake \d+\s*(?:mg|ml|mcg|units)\b",
        r"(?i)\b(?:increase|decrease|double|halve) your dose\b",
        r"(?i)\bstop taking your medication\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("restricted-action pattern must compile"))
    .collect()
});

/// Diagnostic sentence patterns a generated response must never match.
pub static DIAGNOSTIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\byou have (?:a |an )?[a-z]+(?:itis|osis|emia|oma|pathy)\b",
        r"(?i)\byou (?:are suffering|suffer) from\b",
        r"(?i)\b(?:my|the|your) diagnosis is\b",
        r"(?i)\bi(?:'m| am) diagnosing you\b",
        r"(?i)\byou (?:definitely|certainly|clearly) have\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("diagnostic pattern must compile"))
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_tables_are_lowercase() {
        // Matching lowercases the input once; rules must already be lowercase.
        for kw in EMERGENCY_KEYWORDS
            .iter()
            .chain(URGENT_KEYWORDS)
            .chain(PROHIBITED_TOPICS)
        {
            assert_eq!(*kw, kw.to_lowercase(), "rule `{kw}` must be lowercase");
        }
    }

    #[test]
    fn all_patterns_compile() {
        assert!(!RESTRICTED_ACTION_PATTERNS.is_empty());
        assert!(!DIAGNOSTIC_PATTERNS.is_empty());
    }

    #[test]
    fn diagnostic_patterns_catch_condition_claims() {
        let hits = [
            "You have bronchitis, most likely.",
            "the diagnosis is anemia",
            "You are suffering from dehydration.",
        ];
        for text in hits {
            assert!(
                DIAGNOSTIC_PATTERNS.iter().any(|p| p.is_match(text)),
                "expected diagnostic match for `{text}`"
            );
        }
    }

    #[test]
    fn restricted_patterns_catch_prescribing() {
        let hits = [
            "I prescribe 20mg of this daily.",
            "Take 500 mg every morning.",
            "You should double your dose for a week.",
        ];
        for text in hits {
            assert!(
                RESTRICTED_ACTION_PATTERNS.iter().any(|p| p.is_match(text)),
                "expected restricted-action match for `{text}`"
            );
        }
    }

    #[test]
    fn benign_text_matches_nothing() {
        let text = "Staying hydrated and resting usually helps with mild colds.";
        assert!(!DIAGNOSTIC_PATTERNS.iter().any(|p| p.is_match(text)));
        assert!(!RESTRICTED_ACTION_PATTERNS.iter().any(|p| p.is_match(text)));
    }
}
