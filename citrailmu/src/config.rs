use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Name stamped into synthesized titles and PDF metadata.
pub const SYSTEM_NAME: &str = "CitraIlmu";

/// Default PDF author.
pub const DEFAULT_AUTHOR: &str = "Ikmal Said";

/// Target languages the prompts are written for. Informational only:
/// any free-form language name is passed through to the model.
pub const KNOWN_LANGUAGES: &[&str] = &["bahasa malaysia", "arabic", "english", "mandarin", "tamil"];

/// Whether a language name is one of [`KNOWN_LANGUAGES`] (case-insensitive).
pub fn is_known_language(language: &str) -> bool {
    let lower = language.trim().to_lowercase();
    KNOWN_LANGUAGES.contains(&lower.as_str())
}

/// What the AI stage should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Topic/theme breakdown with title, overview and conclusion.
    Analysis,
    /// Verbatim transcript with title and overview.
    Transcript,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Analysis => "analysis",
            ProcessingMode::Transcript => "transcript",
        }
    }

    /// Capitalized label used in synthesized document titles.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingMode::Analysis => "Analysis",
            ProcessingMode::Transcript => "Transcript",
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "analysis" => Ok(ProcessingMode::Analysis),
            "transcript" => Ok(ProcessingMode::Transcript),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External programs and output settings for audio normalization.
#[derive(Debug, Clone)]
pub struct AudioOptions {
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output bitrate passed to the encoder, e.g. "16k".
    pub bitrate: String,
    /// Length of the fade-out applied at the end, in seconds.
    pub fade_out_secs: f64,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            sample_rate: 22_050,
            bitrate: "16k".into(),
            fade_out_secs: 0.1,
        }
    }
}

/// Settings for the PDF-rendering collaborator.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub pandoc: String,
    /// Engine pandoc uses to produce the PDF. Must understand CSS.
    pub pdf_engine: String,
    pub author: String,
    pub creator: String,
    pub toc_depth: u8,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            pandoc: "pandoc".into(),
            pdf_engine: "weasyprint".into(),
            author: DEFAULT_AUTHOR.into(),
            creator: SYSTEM_NAME.into(),
            toc_depth: 3,
        }
    }
}

/// Pipeline-wide options.
///
/// Everything defaults to the system temp dir and programs on `PATH`.
#[derive(Debug, Clone)]
pub struct Options {
    pub temp_dir: Option<PathBuf>,
    pub yt_dlp: String,
    pub user_agent: String,
    pub audio: AudioOptions,
    pub pdf: PdfOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            temp_dir: None,
            yt_dlp: "yt-dlp".into(),
            user_agent: format!("citrailmu/{}", env!("CARGO_PKG_VERSION")),
            audio: AudioOptions::default(),
            pdf: PdfOptions::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    pub fn yt_dlp(mut self, program: impl Into<String>) -> Self {
        self.yt_dlp = program.into();
        self
    }

    pub fn ffmpeg(mut self, program: impl Into<String>) -> Self {
        self.audio.ffmpeg = program.into();
        self
    }

    pub fn ffprobe(mut self, program: impl Into<String>) -> Self {
        self.audio.ffprobe = program.into();
        self
    }

    pub fn pandoc(mut self, program: impl Into<String>) -> Self {
        self.pdf.pandoc = program.into();
        self
    }

    pub fn pdf_engine(mut self, engine: impl Into<String>) -> Self {
        self.pdf.pdf_engine = engine.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.pdf.author = author.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Resolve the directory for task-scoped temp files.
    pub fn resolve_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
