//! Media to localized PDF: file, YouTube or web URL in, AI analysis or transcript PDF out.
//!
//! **citrailmu** handles the full pipeline: fetching (via yt-dlp or plain HTTP),
//! compressing to a small mono MP3 (via ffmpeg), generating Markdown with Gemini,
//! and rendering a styled PDF (via pandoc).
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> citrailmu::Result<()> {
//! use citrailmu::{CitraIlmu, GeminiConfig, Options, DEFAULT_MODEL};
//!
//! let app = CitraIlmu::with_gemini(Options::new(), GeminiConfig::new("API_KEY", DEFAULT_MODEL))?;
//! let outcome = app
//!     .process_media("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "bahasa malaysia", "analysis")
//!     .await;
//! if let Some(pdf) = outcome.document {
//!     println!("{}", pdf.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A run never fails as a whole: each stage that does not complete leaves the
//! corresponding half of [`ProcessingOutcome`] empty and is logged with the task id.

pub mod acquire;
pub mod audio;
pub mod classify;
pub mod config;
pub(crate) mod download;
pub mod error;
pub mod gemini;
pub mod generate;
pub mod pipeline;
pub mod render;
pub mod task;
pub mod temp;
pub mod types;

#[cfg(test)]
mod test_support;

pub use classify::{classify, InputKind};
pub use config::{AudioOptions, Options, PdfOptions, ProcessingMode, KNOWN_LANGUAGES};
pub use error::{Error, Result};
pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_MODEL};
pub use generate::{GenerationRequest, TextGenerator};
pub use pipeline::CitraIlmu;
pub use render::{DocumentMetadata, DocumentRenderer, PandocRenderer};
pub use task::TaskId;
pub use types::ProcessingOutcome;

/// Process one input with default options, Gemini and pandoc.
pub async fn process_media(
    input: &str,
    target_language: &str,
    processing_mode: &str,
    gemini: GeminiConfig,
) -> Result<ProcessingOutcome> {
    let app = CitraIlmu::with_gemini(Options::default(), gemini)?;
    Ok(app.process_media(input, target_language, processing_mode).await)
}
