// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt rendering for the text-completion engine.
//!
//! The engine is a plain completion model, so the context window is
//! flattened into role-labelled turns terminated by an assistant cue. The
//! role labels double as stop sequences so the model cannot speak for the
//! patient or the clinic.

use carebridge_core::ContextEntry;

/// Stop sequences handed to the engine with every request.
pub const STOP_SEQUENCES: &[&str] = &["User:", "System:", "Staff:"];

/// Residual chat-template control tokens some models emit despite the
/// plain-text prompt format.
const CONTROL_TOKENS: &[&str] = &["<|assistant|>", "<|user|>", "<|system|>", "<|end|>"];

/// Flatten a context window into a single prompt string.
///
/// Layout: optional system instruction, then `"<Role>: <content>"` turns
/// separated by blank lines, then the bare `"Assistant: "` cue.
pub fn render_prompt(system: Option<&str>, context: &[ContextEntry]) -> String {
    let mut prompt = String::new();
    if let Some(system) = system {
        let system = system.trim();
        if !system.is_empty() {
            prompt.push_str(system);
            prompt.push_str("\n\n");
        }
    }
    for entry in context {
        prompt.push_str(entry.role.prompt_label());
        prompt.push_str(": ");
        prompt.push_str(&entry.content);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Assistant: ");
    prompt
}

/// Remove residual control tokens and trim surrounding whitespace.
pub fn strip_control_tokens(text: &str) -> String {
    let mut cleaned = text.to_string();
    for token in CONTROL_TOKENS {
        if cleaned.contains(token) {
            cleaned = cleaned.replace(token, "");
        }
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_core::Role;

    #[test]
    fn renders_turns_with_assistant_cue() {
        let context = vec![
            ContextEntry {
                role: Role::User,
                content: "I have a question".to_string(),
            },
            ContextEntry {
                role: Role::Assistant,
                content: "Of course".to_string(),
            },
        ];
        let prompt = render_prompt(None, &context);
        assert_eq!(
            prompt,
            "User: I have a question\n\nAssistant: Of course\n\nAssistant: "
        );
    }

    #[test]
    fn system_instruction_comes_first() {
        let context = vec![ContextEntry {
            role: Role::User,
            content: "hi".to_string(),
        }];
        let prompt = render_prompt(Some("Be helpful."), &context);
        assert!(prompt.starts_with("Be helpful.\n\nUser: hi"));
    }

    #[test]
    fn empty_system_instruction_is_skipped() {
        let prompt = render_prompt(Some("   "), &[]);
        assert_eq!(prompt, "Assistant: ");
    }

    #[test]
    fn staff_turns_are_labelled() {
        let context = vec![ContextEntry {
            role: Role::Staff,
            content: "Nurse here".to_string(),
        }];
        let prompt = render_prompt(None, &context);
        assert!(prompt.contains("Staff: Nurse here"));
    }

    #[test]
    fn strips_control_tokens_and_trims() {
        assert_eq!(
            strip_control_tokens("<|assistant|> Take rest and fluids. <|end|>"),
            "Take rest and fluids."
        );
        assert_eq!(strip_control_tokens("plain text"), "plain text");
    }
}
