// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt sent with every interviewer call.
pub const INTERVIEWER_SYSTEM: &str = "You are an experienced technical interviewer. \
    Be direct, specific and fair. \
    When asked for a question, return only the question. \
    When asked for an evaluation, follow the requested template exactly.";

/// Appended to every evaluation prompt that is parsed by template matching.
pub const TEMPLATE_DISCIPLINE: &str = "\
    CRITICAL: Reproduce every label, colon and dash exactly as shown. \
    Do NOT use markdown bold, headings or code fences. \
    Do NOT add any text before or after the template.";
