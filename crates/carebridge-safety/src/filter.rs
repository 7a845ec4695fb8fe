// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless classification over raw message text.
//!
//! Applied twice per turn: incoming classification (emergency/urgent +
//! prohibited) before generation, and output validation after. Keyword and
//! pattern matching trades recall for determinism and zero latency -- a hard
//! floor beneath a probabilistic generator that cannot itself be trusted to
//! refuse.

use carebridge_core::Urgency;
use tracing::debug;

use crate::rules::{
    DIAGNOSTIC_PATTERNS, EMERGENCY_KEYWORDS, PROHIBITED_TOPICS, RESTRICTED_ACTION_PATTERNS,
    URGENT_KEYWORDS,
};

/// Result of classifying an incoming message's urgency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingClassification {
    pub urgency: Urgency,
    /// Keywords that matched the winning tier.
    pub matched: Vec<&'static str>,
}

/// Result of the prohibited-topic check, independent of urgency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProhibitedClassification {
    pub prohibited: bool,
    pub matched: Vec<&'static str>,
}

/// Verdict on a generated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedVerdict {
    Valid,
    /// The output matched a restricted-action phrase or diagnostic pattern
    /// and must be replaced with the canned deflection.
    Invalid { reason: String },
}

/// Classify an incoming message as emergency, urgent, or normal.
///
/// Case-insensitive substring match against the emergency keyword table and,
/// failing that, the urgent table. Any emergency match outranks any urgent
/// match regardless of where either appears in the rule list.
pub fn classify_incoming(text: &str) -> IncomingClassification {
    let lower = text.to_lowercase();

    let emergency: Vec<&'static str> = EMERGENCY_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| lower.contains(kw))
        .collect();
    if !emergency.is_empty() {
        debug!(matched = ?emergency, "incoming message classified as emergency");
        return IncomingClassification {
            urgency: Urgency::Emergency,
            matched: emergency,
        };
    }

    let urgent: Vec<&'static str> = URGENT_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| lower.contains(kw))
        .collect();
    if !urgent.is_empty() {
        debug!(matched = ?urgent, "incoming message classified as urgent");
        return IncomingClassification {
            urgency: Urgency::Urgent,
            matched: urgent,
        };
    }

    IncomingClassification {
        urgency: Urgency::Normal,
        matched: Vec::new(),
    }
}

/// Check an incoming message against the prohibited-topic table.
///
/// Independent of [`classify_incoming`]; both checks run on every turn and
/// are not mutually exclusive (emergency takes precedence downstream).
pub fn classify_prohibited(text: &str) -> ProhibitedClassification {
    let lower = text.to_lowercase();
    let matched: Vec<&'static str> = PROHIBITED_TOPICS
        .iter()
        .copied()
        .filter(|kw| lower.contains(kw))
        .collect();
    ProhibitedClassification {
        prohibited: !matched.is_empty(),
        matched,
    }
}

/// Validate a generated response against the restricted-action and
/// diagnostic pattern tables.
///
/// A post-generation guardrail, independent of the pre-generation checks.
pub fn validate_generated(text: &str) -> GeneratedVerdict {
    for pattern in RESTRICTED_ACTION_PATTERNS.iter() {
        if pattern.is_match(text) {
            return GeneratedVerdict::Invalid {
                reason: format!("restricted action phrase: {}", pattern.as_str()),
            };
        }
    }
    for pattern in DIAGNOSTIC_PATTERNS.iter() {
        if pattern.is_match(text) {
            return GeneratedVerdict::Invalid {
                reason: format!("diagnostic language: {}", pattern.as_str()),
            };
        }
    }
    GeneratedVerdict::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chest_pain_is_emergency() {
        let result = classify_incoming("I have chest pain since this morning");
        assert_eq!(result.urgency, Urgency::Emergency);
        assert!(result.matched.contains(&"chest pain"));
    }

    #[test]
    fn classification_is_case_insensitive() {
        let result = classify_incoming("CHEST PAIN and shortness of breath");
        assert_eq!(result.urgency, Urgency::Emergency);
    }

    #[test]
    fn emergency_outranks_urgent_regardless_of_position() {
        // The urgent keyword appears first in the text; emergency still wins.
        let result = classify_incoming("my high fever is bad and I think I had a seizure");
        assert_eq!(result.urgency, Urgency::Emergency);
        assert_eq!(result.matched, vec!["seizure"]);
    }

    #[test]
    fn urgent_without_emergency() {
        let result = classify_incoming("I've had severe pain in my knee for two days");
        assert_eq!(result.urgency, Urgency::Urgent);
    }

    #[test]
    fn normal_message_matches_nothing() {
        let result = classify_incoming("What foods are good for heart health?");
        assert_eq!(result.urgency, Urgency::Normal);
        assert!(result.matched.is_empty());
    }

    #[test]
    fn prohibited_is_independent_of_urgency() {
        // Contains both an emergency keyword and a prohibited topic; both
        // classifiers report their own match.
        let text = "I took an overdose, can you prescribe something?";
        assert_eq!(classify_incoming(text).urgency, Urgency::Emergency);
        assert!(classify_prohibited(text).prohibited);
    }

    #[test]
    fn prescription_request_is_prohibited() {
        let result = classify_prohibited("Can I get a refill of my prescription?");
        assert!(result.prohibited);
        assert!(result.matched.contains(&"prescription"));
    }

    #[test]
    fn generated_diagnosis_is_invalid() {
        let verdict = validate_generated("Based on your symptoms, you have bronchitis.");
        assert!(matches!(verdict, GeneratedVerdict::Invalid { .. }));
    }

    #[test]
    fn generated_prescribing_is_invalid() {
        let verdict = validate_generated("I prescribe 10mg of loratadine daily.");
        match verdict {
            GeneratedVerdict::Invalid { reason } => {
                assert!(reason.contains("restricted action"));
            }
            GeneratedVerdict::Valid => panic!("prescribing language must be invalid"),
        }
    }

    #[test]
    fn generated_general_advice_is_valid() {
        let verdict = validate_generated(
            "Rest, fluids, and over-the-counter options can help with mild symptoms. \
             Your care team can advise on anything specific to you.",
        );
        assert_eq!(verdict, GeneratedVerdict::Valid);
    }
}
