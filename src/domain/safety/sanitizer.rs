//! Post-generation sanitization: blocked-phrase excision and length capping.

use regex::{Regex, RegexBuilder};

/// Replacement marker for excised phrases and truncated tails.
const ELLIPSIS: &str = "...";

/// Safety configuration for simulated-patient output.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    /// Maximum response length in characters before truncation.
    pub max_response_length: usize,
    /// Advisory conversation-length ceiling, in turns.
    pub max_conversation_turns: usize,
    /// Phrases that must never appear in output (matched case-insensitively).
    pub blocked_phrases: Vec<String>,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            max_response_length: 1000,
            max_conversation_turns: 50,
            blocked_phrases: [
                "I diagnose",
                "My diagnosis is",
                "You have",
                "The diagnosis is",
                "I prescribe",
                "Take this medication",
                "You should take",
                "I recommend you take",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Outcome of sanitizing one generated response. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyVerdict {
    /// True only if no blocked phrase was found. Truncation alone does not
    /// flip this.
    pub is_safe: bool,
    /// The cleaned text, always returned even when flagged unsafe.
    pub sanitized_text: String,
    /// Human-readable notes about what was changed.
    pub warnings: Vec<String>,
    /// Every blocked phrase that matched, in policy order.
    pub blocked_phrases_found: Vec<String>,
}

/// Sanitizes generated output. This step never fails: unsafe input degrades
/// to a flagged-but-returned string.
pub struct OutputSanitizer {
    policy: SafetyPolicy,
    patterns: Vec<(String, Regex)>,
}

impl OutputSanitizer {
    pub fn new(policy: SafetyPolicy) -> Self {
        let patterns = policy
            .blocked_phrases
            .iter()
            .map(|phrase| {
                let regex = RegexBuilder::new(&regex::escape(phrase))
                    .case_insensitive(true)
                    .build()
                    .expect("escaped literal is a valid pattern");
                (phrase.clone(), regex)
            })
            .collect();

        Self { policy, patterns }
    }

    /// Scans for blocked phrases, excising each match, then caps length at
    /// the nearest word boundary.
    pub fn sanitize(&self, text: &str) -> SafetyVerdict {
        let mut sanitized = text.to_string();
        let mut warnings = Vec::new();
        let mut blocked_found = Vec::new();

        for (phrase, regex) in &self.patterns {
            if regex.is_match(&sanitized) {
                blocked_found.push(phrase.clone());
                sanitized = regex.replace_all(&sanitized, ELLIPSIS).into_owned();
            }
        }
        if !blocked_found.is_empty() {
            warnings.push(format!(
                "Removed {} blocked phrase(s) from output",
                blocked_found.len()
            ));
        }

        let char_count = sanitized.chars().count();
        if char_count > self.policy.max_response_length {
            sanitized = truncate_at_word_boundary(&sanitized, self.policy.max_response_length);
            warnings.push(format!(
                "Response truncated from {} to {} characters",
                char_count,
                sanitized.chars().count()
            ));
        }

        SafetyVerdict {
            is_safe: blocked_found.is_empty(),
            sanitized_text: sanitized.trim().to_string(),
            warnings,
            blocked_phrases_found: blocked_found,
        }
    }

    /// Advisory check on conversation length.
    ///
    /// Returns a warning string once the turn count reaches the configured
    /// ceiling; callers may surface or ignore it.
    pub fn conversation_length_warning(&self, turn_count: usize) -> Option<String> {
        if turn_count >= self.policy.max_conversation_turns {
            Some(format!(
                "Conversation has reached {} messages. \
                 Consider starting a new session for accurate simulation.",
                turn_count
            ))
        } else {
            None
        }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }
}

impl Default for OutputSanitizer {
    fn default() -> Self {
        Self::new(SafetyPolicy::default())
    }
}

/// Cuts `text` down to at most `max_chars`, backing up to the preceding
/// word boundary, and appends an ellipsis.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    let base = match head.rfind(' ') {
        Some(idx) => &head[..idx],
        None => head.as_str(),
    };
    format!("{}{}", base, ELLIPSIS)
}
