use std::path::PathBuf;

/// All errors that can occur in citrailmu.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: not a file path or URL: {0}")]
    Classification(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("yt-dlp not found — install with: pip install yt-dlp")]
    YtDlpNotFound,

    #[error("{program} not found — install it or point citrailmu at it with Options")]
    ToolNotFound { program: String },

    #[error("audio file not found: {path}")]
    AudioNotFound { path: PathBuf },

    #[error("audio compression failed: {0}")]
    Normalization(String),

    #[error("Invalid processing mode: \"{0}\" — expected \"analysis\" or \"transcript\"")]
    InvalidMode(String),

    #[error("AI processing failed: {0}")]
    AiProcessing(String),

    #[error("AI service rejected the API key")]
    AiAuth,

    #[error("PDF generation failed: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Pipeline stage an error belongs to, used to tag log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Classification(_) => "classification",
            Error::Download(_) | Error::YtDlpNotFound | Error::Http(_) => "retrieval",
            Error::ToolNotFound { .. } | Error::AudioNotFound { .. } | Error::Normalization(_) => {
                "normalization"
            }
            Error::InvalidMode(_) | Error::AiProcessing(_) | Error::AiAuth => "ai",
            Error::Render(_) => "render",
            Error::Io(_) | Error::Json(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
