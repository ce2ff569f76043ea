//! Non-mutating response validation: character breaks, diagnosis
//! disclosure, and degenerate output.

use regex::{Regex, RegexBuilder};

/// Patterns indicating the persona broke character.
const BROKEN_CHARACTER_PATTERNS: &[&str] = &[
    r"as an AI",
    r"as a language model",
    r"I cannot provide medical",
    r"I'm not a doctor",
    r"I am not a medical professional",
    r"I don't have access to",
];

/// Patterns indicating possible diagnosis disclosure.
///
/// These are heuristic: they can false-positive on legitimate repeated
/// symptom words and false-negative on paraphrased disclosure.
const DIAGNOSIS_DISCLOSURE_PATTERNS: &[&str] = &[
    r"you have ([a-z]+ ){1,3}(disease|condition|syndrome|disorder)",
    r"this is (likely|probably|definitely) ([a-z]+ ){1,3}",
    r"I (think|believe) you have",
];

/// Tunable thresholds for the validator's heuristics.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    /// Responses shorter than this (after trimming) are flagged.
    pub min_response_chars: usize,
    /// Repetition is only checked above this word count.
    pub repetition_word_floor: usize,
    /// Minimum fraction of distinct words before flagging repetition.
    pub min_unique_ratio: f32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_response_chars: 5,
            repetition_word_floor: 10,
            min_unique_ratio: 0.3,
        }
    }
}

/// Validates generated replies without altering them.
pub struct ResponseValidator {
    config: ValidatorConfig,
    broken_character: Vec<Regex>,
    diagnosis_disclosure: Vec<Regex>,
}

impl ResponseValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .expect("validator pattern is valid")
                })
                .collect()
        };

        Self {
            config,
            broken_character: compile(BROKEN_CHARACTER_PATTERNS),
            diagnosis_disclosure: compile(DIAGNOSIS_DISCLOSURE_PATTERNS),
        }
    }

    /// Checks a reply for quality and safety issues.
    ///
    /// Returns `(is_valid, issues)`; `is_valid` is true iff the issue list
    /// is empty. Multiple issues may be reported simultaneously.
    pub fn validate(&self, response: &str) -> (bool, Vec<String>) {
        let mut issues = Vec::new();

        if self.broken_character.iter().any(|p| p.is_match(response)) {
            issues.push("Persona may have broken character (meta-reference detected)".to_string());
        }

        if self
            .diagnosis_disclosure
            .iter()
            .any(|p| p.is_match(response))
        {
            issues.push("Possible diagnosis disclosure detected".to_string());
        }

        if response.trim().chars().count() < self.config.min_response_chars {
            issues.push("Response is too short".to_string());
        }

        if self.is_excessively_repetitive(response) {
            issues.push("Response contains excessive repetition".to_string());
        }

        (issues.is_empty(), issues)
    }

    /// Among responses above the word floor, flags when fewer than the
    /// configured fraction of words are distinct.
    fn is_excessively_repetitive(&self, response: &str) -> bool {
        let words: Vec<String> = response
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        if words.len() <= self.config.repetition_word_floor {
            return false;
        }

        let unique: std::collections::HashSet<&String> = words.iter().collect();
        (unique.len() as f32) < (words.len() as f32) * self.config.min_unique_ratio
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ResponseValidator {
        ResponseValidator::default()
    }

    #[test]
    fn natural_patient_reply_is_valid() {
        let (valid, issues) =
            validator().validate("It hurts a lot when I bite down, especially on hard food.");
        assert!(valid);
        assert!(issues.is_empty());
    }

    #[test]
    fn meta_reference_flags_character_break() {
        let (valid, issues) = validator().validate("As an AI, I cannot feel pain.");
        assert!(!valid);
        assert!(issues.iter().any(|i| i.contains("broken character")));
    }

    #[test]
    fn character_break_matching_is_case_insensitive() {
        let (valid, _) = validator().validate("as a LANGUAGE MODEL I can't say");
        assert!(!valid);
    }

    #[test]
    fn diagnosis_disclosure_flags() {
        let (valid, issues) =
            validator().validate("I think you have pulpitis and it looks serious.");
        assert!(!valid);
        assert!(issues.iter().any(|i| i.contains("diagnosis disclosure")));
    }

    #[test]
    fn disclosure_pattern_matches_condition_phrase() {
        let (valid, _) = validator().validate("you have a gum disease for sure");
        assert!(!valid);
    }

    #[test]
    fn short_response_is_flagged() {
        let (valid, issues) = validator().validate("  ok ");
        assert!(!valid);
        assert!(issues.contains(&"Response is too short".to_string()));
    }

    #[test]
    fn twelve_repetitions_of_one_word_trigger_repetition() {
        let text = "pain pain pain pain pain pain pain pain pain pain pain pain";
        let (valid, issues) = validator().validate(text);
        assert!(!valid);
        assert!(issues.contains(&"Response contains excessive repetition".to_string()));
    }

    #[test]
    fn ten_words_or_fewer_skip_repetition_check() {
        let text = "pain pain pain pain pain pain pain pain pain pain";
        let (valid, _) = validator().validate(text);
        assert!(valid);
    }

    #[test]
    fn varied_long_response_is_not_repetitive() {
        let text = "The pain started three days ago and gets worse whenever I chew \
                    on that side or drink something cold in the morning.";
        let (valid, issues) = validator().validate(text);
        assert!(valid, "unexpected issues: {:?}", issues);
    }

    #[test]
    fn multiple_issues_reported_together() {
        let text = "As an AI I think you have a disease disease disease disease disease \
                    disease disease disease disease disease disease";
        let (valid, issues) = validator().validate(text);
        assert!(!valid);
        assert!(issues.len() >= 2);
    }

    #[test]
    fn thresholds_are_configurable() {
        let lenient = ResponseValidator::new(ValidatorConfig {
            min_response_chars: 1,
            repetition_word_floor: 100,
            min_unique_ratio: 0.3,
        });
        let text = "pain pain pain pain pain pain pain pain pain pain pain pain";
        let (valid, _) = lenient.validate(text);
        assert!(valid);
    }
}
