/// Prompt used to turn a user message into a short title.
/// `<message>` is replaced with the message text.
pub const DEFAULT_TITLE_PROMPT: &str = "\
You write short titles for chat messages.
Summarize the user's message below in at most 8 words and under 80 characters.
Reply with the title only: no quotes, no trailing punctuation, no explanations.

Message:
<message>";

pub fn render_prompt(template: &str, message: &str) -> String {
    template.replace("<message>", message)
}
