use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result of one pipeline run.
///
/// `audio` and `document` are independent: a run can produce the
/// compressed audio and still fail to produce a PDF, so callers can retry
/// the later stages without downloading again. Both files belong to the
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub task_id: String,
    pub audio: Option<PathBuf>,
    pub document: Option<PathBuf>,
}

impl ProcessingOutcome {
    /// Both the audio and the PDF were produced.
    pub fn is_complete(&self) -> bool {
        self.audio.is_some() && self.document.is_some()
    }

    /// The two-element `(audio, document)` view.
    pub fn into_parts(self) -> (Option<PathBuf>, Option<PathBuf>) {
        (self.audio, self.document)
    }

    /// Format as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_states() {
        let nothing = ProcessingOutcome {
            task_id: "t".into(),
            audio: None,
            document: None,
        };
        assert!(!nothing.is_complete());

        let partial = ProcessingOutcome {
            audio: Some("/tmp/a.mp3".into()),
            ..nothing.clone()
        };
        assert!(!partial.is_complete());
        assert_eq!(partial.clone().into_parts(), (Some("/tmp/a.mp3".into()), None));

        let full = ProcessingOutcome {
            document: Some("/tmp/a.pdf".into()),
            ..partial
        };
        assert!(full.is_complete());
    }

    #[test]
    fn test_outcome_json() {
        let outcome = ProcessingOutcome {
            task_id: "20250101_000000_abcdef12".into(),
            audio: Some("/tmp/a.mp3".into()),
            document: None,
        };
        let json = outcome.to_json_pretty().unwrap();
        assert!(json.contains("\"audio\": \"/tmp/a.mp3\""));
        assert!(json.contains("\"document\": null"));
    }
}
