//! Prompts for LLM image captioning.
//!
//! Callers can override the default via [`crate::config::EngineConfig::llm_prompt`];
//! the constants here are used only when no override is provided.

/// System prompt sent with every caption request.
pub const CAPTION_SYSTEM_PROMPT: &str = r#"You describe images for a document-to-Markdown converter.

Follow these rules precisely:

1. Describe what the image shows, including any visible text, verbatim
2. For charts and diagrams, state the type, the axes or parts, and the key values
3. For photos, describe subjects, setting and notable details
4. Output plain Markdown prose only
5. Do NOT wrap the answer in ``` fences
6. Do NOT add a heading or commentary about the task"#;

/// Default user prompt when `EngineConfig::llm_prompt` is `None`.
pub const DEFAULT_CAPTION_PROMPT: &str = "Write a detailed caption for this image.";

/// The user turn accompanying the image.
///
/// The file name is appended when known; it often says what the image is
/// (`q3-revenue-chart.png`).
pub fn caption_user_message(prompt: &str, filename: Option<&str>) -> String {
    match filename {
        Some(name) if !name.is_empty() => format!("{prompt}\n\nFile name: {name}"),
        _ => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_mentions_filename() {
        let msg = caption_user_message(DEFAULT_CAPTION_PROMPT, Some("chart.png"));
        assert!(msg.starts_with(DEFAULT_CAPTION_PROMPT));
        assert!(msg.ends_with("File name: chart.png"));
        assert_eq!(caption_user_message("Describe.", None), "Describe.");
        assert_eq!(caption_user_message("Describe.", Some("")), "Describe.");
    }

    #[test]
    fn system_prompt_forbids_fences() {
        assert!(CAPTION_SYSTEM_PROMPT.contains("Do NOT wrap"));
    }
}
