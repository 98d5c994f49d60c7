use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::config::ProcessingMode;
use crate::error::Result;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-zA-Z]*\n").expect("valid fence regex"));

static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\n?").expect("valid fence regex"));

/// What to ask the model for.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub language: String,
    pub mode: ProcessingMode,
    /// Audio duration in seconds; the prompt asks for coverage up to it.
    pub duration: f64,
}

/// A generative model that turns an audio file into Markdown.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Upload `audio` and return the model's Markdown response, unprocessed.
    async fn generate(&self, audio: &Path, request: &GenerationRequest) -> Result<String>;
}

/// Build the instruction prompt for a request.
pub fn prompt(request: &GenerationRequest) -> String {
    let duration = format_duration(request.duration);
    match request.mode {
        ProcessingMode::Analysis => format!(
            "You are an expert audio transcriber and content analyst. Your task is to provide \
             a transcript of the given audio file from 00:00 to {duration}. You must list down \
             every discussed topic, themes, points and reflections in {language}. You must \
             begin with the most suitable title of the speech with overview of the speech and \
             must end with the conclusion. Do not include any opening or closing remarks.",
            language = request.language,
        ),
        ProcessingMode::Transcript => format!(
            "You are an expert audio transcriber. Your task is to provide a transcript of the \
             given audio file from 00:00 to {duration}. You must begin with the most suitable \
             title of the speech with overview of the speech. Do not include any opening or \
             closing remarks."
        ),
    }
}

/// Format seconds as `HH:MM:SS`, truncating fractions.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Strip Markdown code-fence markers, keeping the fenced content.
pub fn clean_markdown(text: &str) -> String {
    let text = OPENING_FENCE.replace_all(text, "");
    let text = CLOSING_FENCE.replace_all(&text, "");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: ProcessingMode, duration: f64) -> GenerationRequest {
        GenerationRequest {
            language: "bahasa malaysia".into(),
            mode,
            duration,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00:00");
        assert_eq!(format_duration(59.9), "00:00:59");
        assert_eq!(format_duration(120.0), "00:02:00");
        assert_eq!(format_duration(3725.4), "01:02:05");
        assert_eq!(format_duration(-3.0), "00:00:00");
        assert_eq!(format_duration(f64::NAN), "00:00:00");
    }

    #[test]
    fn test_analysis_prompt() {
        let p = prompt(&request(ProcessingMode::Analysis, 3725.0));
        assert!(p.contains("from 00:00 to 01:02:05"));
        assert!(p.contains("reflections in bahasa malaysia"));
        assert!(p.contains("must end with the conclusion"));
    }

    #[test]
    fn test_transcript_prompt() {
        let p = prompt(&request(ProcessingMode::Transcript, 90.0));
        assert!(p.contains("from 00:00 to 00:01:30"));
        assert!(p.starts_with("You are an expert audio transcriber."));
        assert!(!p.contains("conclusion"));
    }

    #[test]
    fn test_clean_markdown_strips_fences() {
        let raw = "```python\nprint(1)\n```";
        assert_eq!(clean_markdown(raw), "print(1)");
    }

    #[test]
    fn test_clean_markdown_whole_document_fence() {
        let raw = "```markdown\n# Title\n\nBody text.\n```\n";
        assert_eq!(clean_markdown(raw), "# Title\n\nBody text.");
    }

    #[test]
    fn test_clean_markdown_plain_text_untouched() {
        let raw = "  # Tajuk\n\n- satu\n- dua\n  ";
        assert_eq!(clean_markdown(raw), "# Tajuk\n\n- satu\n- dua");
    }
}
