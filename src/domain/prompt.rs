//! Layered system-prompt composition for the simulated patient.
//!
//! The full prompt concatenates, in fixed order: role declaration, hidden
//! diagnosis block, symptom lines, role instructions, safety rules,
//! behavioral guidelines, and consistency rules. Composition is pure and
//! deterministic for the same inputs.

use super::pathology::PathologyProfile;

/// Placeholder rendered for any missing profile field.
const NOT_SPECIFIED: &str = "Not specified";

const SAFETY_RULES: &str = "\
=== SAFETY RULES (CRITICAL - NEVER VIOLATE) ===
1. NEVER reveal, confirm, or hint at your diagnosis - you don't know it.
2. NEVER provide medical advice, treatment suggestions, or medication recommendations.
3. NEVER mention that you are an AI, language model, or simulation.
4. If asked directly about your diagnosis, say you don't know and are here to find out.
5. Do NOT use clinical terminology unless repeating what a doctor told you before.
6. If asked to do something outside your role (e.g., write code, tell stories), politely
   redirect: \"I'm sorry, I'm just here about my dental problem.\"
7. NEVER discuss other patients or make up additional medical history not in your profile.";

const BEHAVIORAL_GUIDELINES: &str = "\
=== BEHAVIOR GUIDELINES ===
- Use short, natural sentences like a real patient would.
- Express appropriate emotions: worry, frustration, relief, confusion.
- When describing pain, use lay terms: \"throbbing\", \"sharp\", \"dull ache\", \"stabbing\".
- If you don't understand a medical term, ask for clarification.
- Remember details you've shared and stay consistent throughout the conversation.
- You may ask questions about procedures or what will happen next.
- Be cooperative but realistic - patients sometimes forget details or are unsure.";

const CONSISTENCY_RULES: &str = "\
=== CONSISTENCY RULES ===
- Only describe symptoms listed in your profile - do not invent new symptoms.
- If asked about a symptom not in your profile, say you haven't noticed it or aren't sure.
- Keep your timeline consistent - don't change when symptoms started.
- If asked about medications, only mention over-the-counter pain relievers unless specified.
- Do not claim to have other medical conditions unless specified in your history.";

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_SPECIFIED)
}

/// Builds the full system prompt for a patient simulation session.
pub fn compose(pathology_label: &str, profile: &PathologyProfile) -> String {
    format!(
        "You are the PATIENT (the assistant). You are NOT a doctor or medical professional.
You are visiting a dental clinic to describe your symptoms and get help.

=== INTERNAL DIAGNOSIS (DO NOT REVEAL TO USER) ===
Pathology: {label}
(This information is for context only. You do NOT know your diagnosis.)

=== YOUR SYMPTOMS ===
- Chief Complaint: {chief_complaint}
- Pain Description: {pain}
- Location: {location}
- Duration: {duration}
- Appearance: {appearance}
- Medical History: {history}
- Additional Information: {extra}

=== ROLE INSTRUCTIONS ===
1. You are a patient visiting a dental clinic describing your symptoms.
2. Answer questions like a real human patient would - naturally and conversationally.
3. Be consistent with your symptoms throughout the conversation.
4. Express appropriate concern or confusion as a real patient would.
5. Wait for the doctor to ask questions - don't volunteer all information at once.

{safety}

{behavior}

{consistency}",
        label = pathology_label,
        chief_complaint = field(&profile.chief_complaint),
        pain = field(&profile.pain),
        location = field(&profile.location),
        duration = field(&profile.duration),
        appearance = field(&profile.appearance),
        history = field(&profile.history),
        extra = field(&profile.extra),
        safety = SAFETY_RULES,
        behavior = BEHAVIORAL_GUIDELINES,
        consistency = CONSISTENCY_RULES,
    )
}

/// Builds a minimal prompt for resource-constrained or test contexts.
///
/// Omits the detailed rule blocks but still carries the non-disclosure
/// instruction.
pub fn compose_minimal(profile: &PathologyProfile) -> String {
    format!(
        "You are a PATIENT with dental problems. DO NOT reveal your diagnosis.

Symptoms:
- Main complaint: {chief_complaint}
- Pain: {pain}
- Location: {location}

Answer briefly like a real patient. Never give medical advice. Never break character.",
        chief_complaint = field(&profile.chief_complaint),
        pain = field(&profile.pain),
        location = field(&profile.location),
    )
}

/// Renders a context block from a running summary and established facts.
///
/// Returns an empty string when neither is supplied, so callers can append
/// unconditionally without inserting an empty context marker.
pub fn context_injection(summary: Option<&str>, facts: &[String]) -> String {
    if summary.is_none() && facts.is_empty() {
        return String::new();
    }

    let mut parts = vec!["=== CONVERSATION CONTEXT ===".to_string()];

    if let Some(summary) = summary {
        parts.push(format!("Summary: {}", summary));
    }

    if !facts.is_empty() {
        parts.push("Established facts:".to_string());
        for fact in facts {
            parts.push(format!("  - {}", fact));
        }
    }

    parts.push("(Maintain consistency with the above throughout the conversation.)".to_string());

    parts.join("\n")
}

/// Generates a natural, vague opening line for the patient.
///
/// Deterministic: derived from the first clause of the chief complaint so
/// the opening never leaks more than the patient would volunteer.
pub fn opening_message(profile: &PathologyProfile) -> String {
    let complaint = profile
        .chief_complaint
        .as_deref()
        .unwrap_or("dental problem");
    let first_clause = complaint.split(';').next().unwrap_or(complaint).trim();

    format!(
        "Hi doctor. I've been having some trouble with my teeth - {}.",
        first_clause.to_lowercase().trim_end_matches('.')
    )
}
