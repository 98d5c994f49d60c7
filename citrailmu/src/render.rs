use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::audio::{tool_error, truncate_stderr};
use crate::config::{PdfOptions, ProcessingMode, SYSTEM_NAME};
use crate::error::{Error, Result};
use crate::temp::{sanitize_filename, sanitized_stem, TempFile};

/// Stylesheet applied to every rendered document.
pub const STYLESHEET: &str = r#"
body {
    font-family: 'Segoe UI', sans-serif;
    text-align: justify;
    text-justify: inter-word;
}

/* Arabic text specific */
[lang='ar'] {
    direction: rtl;
}

table, th, td {
    border: 1px solid black;
}

h1 {
    text-align: center;
    color: #2c3e50;
    margin-top: 1.5em;
    margin-bottom: 0.8em;
    font-size: 1.25em;
    font-weight: 500;
}

h2, h3, h4, h5, h6 {
    color: #34495e;
    margin-top: 1.5em;
    margin-bottom: 0.8em;
    text-align: left;
}

p {
    margin: 0.8em 0;
}
"#;

/// PDF document metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub creator: String,
    /// BCP 47 code of the document language, when known.
    pub lang: Option<&'static str>,
}

impl DocumentMetadata {
    pub fn new(title: impl Into<String>, language: &str, options: &PdfOptions) -> Self {
        let title = title.into();
        Self {
            subject: title.clone(),
            title,
            author: options.author.clone(),
            creator: options.creator.clone(),
            lang: language_code(language),
        }
    }

    pub fn is_rtl(&self) -> bool {
        self.lang == Some("ar")
    }
}

/// Renders Markdown into a PDF file.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, markdown: &str, metadata: &DocumentMetadata, output: &Path)
        -> Result<()>;
}

/// Make sure the document opens with a level-1 heading and return its title.
///
/// Text that already starts with `# ` keeps its own heading; anything else
/// gets `# CitraIlmu Analysis (english)` or similar prepended.
pub fn prepare_markdown(text: &str, mode: ProcessingMode, language: &str) -> (String, String) {
    if let Some(rest) = text.strip_prefix("# ") {
        let title = rest.lines().next().unwrap_or_default().trim().to_string();
        return (title, text.to_string());
    }
    let title = format!("{SYSTEM_NAME} {} ({language})", mode.label());
    let markdown = format!("# {title}\n\n{text}");
    (title, markdown)
}

/// `{temp_dir}/{basename}_{mode}_{language}.pdf`, lowercased language with
/// spaces as underscores, the whole name sanitized.
pub fn pdf_path(original: &Path, mode: ProcessingMode, language: &str, temp_dir: &Path) -> PathBuf {
    let name = format!(
        "{}_{}_{}",
        sanitized_stem(original),
        mode.as_str(),
        language.to_lowercase().replace(' ', "_")
    );
    temp_dir.join(format!("{}.pdf", sanitize_filename(&name)))
}

/// BCP 47 code for the known target languages.
pub fn language_code(language: &str) -> Option<&'static str> {
    match language.trim().to_lowercase().as_str() {
        "arabic" => Some("ar"),
        "bahasa malaysia" | "malay" => Some("ms"),
        "english" => Some("en"),
        "mandarin" | "chinese" => Some("zh"),
        "tamil" => Some("ta"),
        _ => None,
    }
}

/// Renders through pandoc's HTML path with a CSS-aware PDF engine.
pub struct PandocRenderer {
    options: PdfOptions,
}

impl PandocRenderer {
    pub fn new(options: PdfOptions) -> Self {
        Self { options }
    }

    fn args(
        &self,
        markdown: &Path,
        css: &Path,
        metadata: &DocumentMetadata,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            markdown.into(),
            "--from=markdown".into(),
            "--to=html5".into(),
            "--standalone".into(),
            "--toc".into(),
            format!("--toc-depth={}", self.options.toc_depth).into(),
            format!("--pdf-engine={}", self.options.pdf_engine).into(),
            "--css".into(),
            css.into(),
        ];

        let mut meta = |key: &str, value: &str| {
            args.push("--metadata".into());
            args.push(format!("{key}={value}").into());
        };
        // pagetitle rather than title: the body already opens with the heading.
        meta("pagetitle", &metadata.title);
        meta("subject", &metadata.subject);
        meta("description", &metadata.subject);
        meta("author", &metadata.author);
        meta("creator", &metadata.creator);
        if let Some(lang) = metadata.lang {
            meta("lang", lang);
        }
        if metadata.is_rtl() {
            meta("dir", "rtl");
        }

        args.push("--output".into());
        args.push(output.into());
        args
    }
}

#[async_trait]
impl DocumentRenderer for PandocRenderer {
    async fn render(
        &self,
        markdown: &str,
        metadata: &DocumentMetadata,
        output: &Path,
    ) -> Result<()> {
        let source = TempFile::new(output.with_extension("md"));
        let css = TempFile::new(output.with_extension("css"));
        tokio::fs::write(source.path(), markdown).await?;
        tokio::fs::write(css.path(), STYLESHEET).await?;

        // Removes a half-written PDF if pandoc fails.
        let pdf = TempFile::new(output);

        let args = self.args(source.path(), css.path(), metadata, output);
        debug!(?args, "running pandoc");
        let result = Command::new(&self.options.pandoc)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| tool_error(&self.options.pandoc, e))?;

        if !result.status.success() {
            return Err(Error::Render(format!(
                "pandoc failed: {}",
                truncate_stderr(&result.stderr)
            )));
        }
        if !output.exists() {
            return Err(Error::Render(format!("{} was not written", output.display())));
        }

        pdf.keep();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_markdown_synthesizes_heading() {
        let (title, md) = prepare_markdown("Some overview.", ProcessingMode::Analysis, "english");
        assert_eq!(title, "CitraIlmu Analysis (english)");
        assert_eq!(md, "# CitraIlmu Analysis (english)\n\nSome overview.");

        let (title, _) = prepare_markdown("## Sub", ProcessingMode::Transcript, "tamil");
        assert_eq!(title, "CitraIlmu Transcript (tamil)");
    }

    #[test]
    fn test_prepare_markdown_keeps_existing_heading() {
        let text = "# Kuliah Maghrib: Adab\n\nIsi kandungan.";
        let (title, md) = prepare_markdown(text, ProcessingMode::Analysis, "bahasa malaysia");
        assert_eq!(title, "Kuliah Maghrib: Adab");
        assert_eq!(md, text);
    }

    #[test]
    fn test_pdf_path() {
        let path = pdf_path(
            Path::new("/tmp/My Lecture.mp3"),
            ProcessingMode::Analysis,
            "Bahasa Malaysia",
            Path::new("/tmp"),
        );
        assert_eq!(path, PathBuf::from("/tmp/My_Lecture_analysis_bahasa_malaysia.pdf"));
    }

    #[test]
    fn test_pdf_path_sanitizes_language() {
        let path = pdf_path(
            Path::new("a.mp3"),
            ProcessingMode::Transcript,
            "../../etc",
            Path::new("/out"),
        );
        assert_eq!(path, PathBuf::from("/out/a_transcript_______etc.pdf"));
    }

    #[test]
    fn test_language_code() {
        assert_eq!(language_code("Arabic"), Some("ar"));
        assert_eq!(language_code("bahasa malaysia"), Some("ms"));
        assert_eq!(language_code("klingon"), None);
    }

    #[test]
    fn test_metadata() {
        let meta = DocumentMetadata::new("Title", "arabic", &PdfOptions::default());
        assert_eq!(meta.subject, "Title");
        assert_eq!(meta.author, "Ikmal Said");
        assert_eq!(meta.creator, "CitraIlmu");
        assert!(meta.is_rtl());
        assert!(!DocumentMetadata::new("T", "english", &PdfOptions::default()).is_rtl());
    }

    #[test]
    fn test_pandoc_args() {
        let renderer = PandocRenderer::new(PdfOptions::default());
        let meta = DocumentMetadata::new("Tajuk", "arabic", &PdfOptions::default());
        let args: Vec<String> = renderer
            .args(
                Path::new("/tmp/doc.md"),
                Path::new("/tmp/doc.css"),
                &meta,
                Path::new("/tmp/doc.pdf"),
            )
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "/tmp/doc.md");
        assert!(args.contains(&"--toc-depth=3".to_string()));
        assert!(args.contains(&"--pdf-engine=weasyprint".to_string()));
        assert!(args.contains(&"pagetitle=Tajuk".to_string()));
        assert!(args.contains(&"author=Ikmal Said".to_string()));
        assert!(args.contains(&"lang=ar".to_string()));
        assert!(args.contains(&"dir=rtl".to_string()));
        assert_eq!(args[args.len() - 2..], ["--output", "/tmp/doc.pdf"]);
    }

    #[tokio::test]
    async fn test_render_without_pandoc_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PandocRenderer::new(PdfOptions {
            pandoc: "citrailmu-no-such-pandoc".into(),
            ..PdfOptions::default()
        });
        let meta = DocumentMetadata::new("T", "english", &PdfOptions::default());
        let output = dir.path().join("doc.pdf");

        let err = renderer.render("# T\n\nbody", &meta, &output).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
