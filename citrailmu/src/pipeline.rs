use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures_util::FutureExt;
use tracing::{error, info};

use crate::acquire::MediaAcquirer;
use crate::audio;
use crate::config::{Options, ProcessingMode};
use crate::error::{Error, Result};
use crate::gemini::{GeminiClient, GeminiConfig};
use crate::generate::{clean_markdown, GenerationRequest, TextGenerator};
use crate::render::{pdf_path, prepare_markdown, DocumentMetadata, DocumentRenderer, PandocRenderer};
use crate::task::TaskId;
use crate::types::ProcessingOutcome;

/// The media → compressed audio → Markdown → PDF pipeline.
pub struct CitraIlmu {
    options: Options,
    acquirer: MediaAcquirer,
    generator: Box<dyn TextGenerator>,
    renderer: Box<dyn DocumentRenderer>,
}

impl CitraIlmu {
    pub fn new(
        options: Options,
        generator: impl TextGenerator + 'static,
        renderer: impl DocumentRenderer + 'static,
    ) -> Result<Self> {
        let acquirer = MediaAcquirer::new(&options)?;
        info!("CitraIlmu is ready!");
        Ok(Self {
            options,
            acquirer,
            generator: Box::new(generator),
            renderer: Box::new(renderer),
        })
    }

    /// Gemini for text generation, pandoc for PDFs.
    pub fn with_gemini(options: Options, gemini: GeminiConfig) -> Result<Self> {
        let renderer = PandocRenderer::new(options.pdf.clone());
        Self::new(options, GeminiClient::new(gemini), renderer)
    }

    /// Process `input` (file path or URL) into a PDF in `target_language`.
    ///
    /// `processing_mode` is `"analysis"` or `"transcript"`, case-insensitive.
    /// Any other value fails the AI stage and yields the audio only.
    pub async fn process_media(
        &self,
        input: &str,
        target_language: &str,
        processing_mode: &str,
    ) -> ProcessingOutcome {
        self.run(input, target_language, processing_mode.parse(), processing_mode)
            .await
    }

    /// Same as [`CitraIlmu::process_media`] with an already-typed mode.
    pub async fn process(
        &self,
        input: &str,
        target_language: &str,
        mode: ProcessingMode,
    ) -> ProcessingOutcome {
        self.run(input, target_language, Ok(mode), mode.as_str()).await
    }

    async fn run(
        &self,
        input: &str,
        language: &str,
        mode: Result<ProcessingMode>,
        mode_name: &str,
    ) -> ProcessingOutcome {
        let task_id = TaskId::new();
        info!(task_id = %task_id, "task started: {mode_name} in {language}");

        let stages = AssertUnwindSafe(self.stages(input, language, mode, &task_id));
        let (audio, document) = match stages.catch_unwind().await {
            Ok(parts) => parts,
            Err(_) => {
                error!(task_id = %task_id, "task failed: unexpected panic");
                (None, None)
            }
        };

        if audio.is_some() && document.is_some() {
            info!(task_id = %task_id, "task completed successfully");
        }
        ProcessingOutcome {
            task_id: task_id.to_string(),
            audio,
            document,
        }
    }

    async fn stages(
        &self,
        input: &str,
        language: &str,
        mode: Result<ProcessingMode>,
        task_id: &TaskId,
    ) -> (Option<PathBuf>, Option<PathBuf>) {
        // Acquisition logs its own failures.
        let Ok(audio) = self.acquirer.acquire(input, task_id).await else {
            return (None, None);
        };

        let mode = match mode {
            Ok(mode) => mode,
            Err(e) => {
                error!(task_id = %task_id, stage = e.stage(), "{e}");
                return (Some(audio), None);
            }
        };

        let markdown = match self.generate_text(&audio, language, mode, task_id).await {
            Ok(markdown) => markdown,
            Err(e) => {
                error!(task_id = %task_id, stage = e.stage(), error = %e, "AI {mode} processing failed");
                return (Some(audio), None);
            }
        };

        match self.render_pdf(&markdown, &audio, language, mode, task_id).await {
            Ok(pdf) => (Some(audio), Some(pdf)),
            Err(e) => {
                error!(task_id = %task_id, stage = e.stage(), error = %e, "PDF generation failed");
                (Some(audio), None)
            }
        }
    }

    async fn generate_text(
        &self,
        audio_path: &Path,
        language: &str,
        mode: ProcessingMode,
        task_id: &TaskId,
    ) -> Result<String> {
        let info = audio::probe(audio_path, &self.options.audio).await?;
        let request = GenerationRequest {
            language: language.to_string(),
            mode,
            duration: info.duration.unwrap_or_default(),
        };

        info!(task_id = %task_id, "processing AI {mode}...");
        let raw = self.generator.generate(audio_path, &request).await?;
        let markdown = clean_markdown(&raw);
        if markdown.is_empty() {
            return Err(Error::AiProcessing("model returned no text".into()));
        }
        Ok(markdown)
    }

    async fn render_pdf(
        &self,
        text: &str,
        audio_path: &Path,
        language: &str,
        mode: ProcessingMode,
        task_id: &TaskId,
    ) -> Result<PathBuf> {
        let output = pdf_path(audio_path, mode, language, self.acquirer.temp_dir());
        info!(task_id = %task_id, path = %output.display(), "generating PDF");

        let (title, markdown) = prepare_markdown(text, mode, language);
        let metadata = DocumentMetadata::new(title, language, &self.options.pdf);
        self.renderer.render(&markdown, &metadata, &output).await?;
        Ok(output)
    }
}
