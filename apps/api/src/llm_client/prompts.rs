// Prompt fragments shared by every extraction call.
// Call-specific prompts live in extraction/prompts.rs.

/// System prompt for calls whose instructions are entirely in the user turn.
pub const JSON_ONLY_SYSTEM: &str = "You read identity documents and forms and report what they say. \
    Reply with a single JSON object and nothing else: \
    no markdown code fences, no commentary before or after it.";

/// Appended to every extraction prompt.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Only report values that are printed or written in the document. \
    Never guess, infer, or fill in a plausible value. \
    A value you cannot read with confidence counts as not found.";
