//! The support prompt template.

/// Framing placed before every transcript.
pub const SYSTEM_FRAMING: &str = "You are a helpful customer support assistant.\n\
If unsure, say you're not sure and suggest escalation.";

/// Builds the prompt for one turn.
///
/// `context` is the rendered transcript, which already ends with the new
/// user message; the message is repeated after it as the line the model
/// answers.
#[must_use]
pub fn support_prompt(context: &str, message: &str) -> String {
    format!("{SYSTEM_FRAMING}\nConversation:\n{context}\nUser: {message}\nAssistant:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_layout() {
        let prompt = support_prompt("User: Hello\n", "Hello");
        assert_eq!(
            prompt,
            "You are a helpful customer support assistant.\n\
             If unsure, say you're not sure and suggest escalation.\n\
             Conversation:\n\
             User: Hello\n\
             \n\
             User: Hello\n\
             Assistant:"
        );
    }

    #[test]
    fn empty_context_still_has_every_section() {
        let prompt = support_prompt("", "Where is my order?");
        assert!(prompt.starts_with(SYSTEM_FRAMING));
        assert!(prompt.contains("Conversation:\n\nUser: Where is my order?\n"));
        assert!(prompt.ends_with("Assistant:"));
    }
}
