mod summarizer;
mod templates;

pub use summarizer::{Summarizer, SummaryRequest, SummaryPayload, DEFAULT_SUMMARY_MODEL};
pub use templates::{DEFAULT_TITLE_PROMPT, render_prompt};
