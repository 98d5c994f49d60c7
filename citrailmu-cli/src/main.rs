use std::path::{Path, PathBuf};

use clap::Parser;
use citrailmu::{CitraIlmu, GeminiConfig, Options, ProcessingOutcome, DEFAULT_MODEL, KNOWN_LANGUAGES};

#[derive(Parser)]
#[command(
    name = "citrailmu",
    about = "Turn a lecture recording, YouTube video or media URL into a PDF analysis or transcript"
)]
struct Cli {
    /// Local file path, YouTube URL or direct media URL.
    #[arg(required_unless_present = "list_languages")]
    input: Option<String>,

    /// Target language of the document (e.g. "bahasa malaysia", "arabic").
    #[arg(short, long, default_value = "english")]
    language: String,

    /// Processing mode: "analysis" or "transcript".
    #[arg(short, long, default_value = "analysis")]
    mode: String,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name.
    #[arg(long, env = "CITRAILMU_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Directory the finished files are moved into.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also keep the compressed audio (deleted by default).
    #[arg(long)]
    keep_audio: bool,

    /// Working directory for intermediate files.
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// PDF engine passed to pandoc.
    #[arg(long, default_value = "weasyprint")]
    pdf_engine: String,

    /// Author recorded in the PDF metadata.
    #[arg(long)]
    author: Option<String>,

    /// Print the outcome as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// List the languages the prompts are tuned for.
    #[arg(long)]
    list_languages: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("citrailmu=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_languages {
        for language in KNOWN_LANGUAGES {
            println!("{language}");
        }
        return;
    }

    let input = cli.input.unwrap();

    let Some(api_key) = cli.api_key.filter(|k| !k.trim().is_empty()) else {
        eprintln!("Error: no Gemini API key; pass --api-key or set GEMINI_API_KEY");
        std::process::exit(2);
    };

    if !citrailmu::config::is_known_language(&cli.language) {
        tracing::warn!(
            language = %cli.language,
            "language is not one of {}; continuing anyway",
            KNOWN_LANGUAGES.join(", ")
        );
    }

    let mut options = Options::new().pdf_engine(cli.pdf_engine);
    if let Some(dir) = cli.temp_dir {
        options = options.temp_dir(dir);
    }
    if let Some(author) = cli.author {
        options = options.author(author);
    }

    let app = match CitraIlmu::with_gemini(options, GeminiConfig::new(api_key, cli.model)) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let outcome = app.process_media(&input, &cli.language, &cli.mode).await;

    let outcome = match deliver(outcome, &cli.output_dir, cli.keep_audio) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error writing to {}: {e}", cli.output_dir.display());
            std::process::exit(1);
        }
    };

    if cli.json {
        match outcome.to_json_pretty() {
            Ok(j) => println!("{j}"),
            Err(e) => {
                eprintln!("JSON error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        if let Some(audio) = &outcome.audio {
            eprintln!("Audio: {}", audio.display());
        }
        if let Some(pdf) = &outcome.document {
            eprintln!("Document: {}", pdf.display());
        }
    }

    if outcome.document.is_none() {
        eprintln!("Task {} did not produce a document, see the log above", outcome.task_id);
        std::process::exit(1);
    }
}

/// Move finished files into `dir`; the compressed audio is dropped unless kept.
fn deliver(
    outcome: ProcessingOutcome,
    dir: &Path,
    keep_audio: bool,
) -> std::io::Result<ProcessingOutcome> {
    std::fs::create_dir_all(dir)?;

    let audio = match outcome.audio {
        Some(path) if keep_audio || outcome.document.is_none() => Some(move_into(&path, dir)?),
        Some(path) => {
            std::fs::remove_file(&path)?;
            None
        }
        None => None,
    };
    let document = outcome
        .document
        .map(|path| move_into(&path, dir))
        .transpose()?;

    Ok(ProcessingOutcome {
        task_id: outcome.task_id,
        audio,
        document,
    })
}

/// Move `path` into `dir` without replacing anything already there.
fn move_into(path: &Path, dir: &Path) -> std::io::Result<PathBuf> {
    let Some(name) = path.file_name() else {
        return Ok(path.to_path_buf());
    };
    let target = dir.join(name);
    if is_same_file(&target, path) {
        return Ok(path.to_path_buf());
    }
    let target = free_name(&target);
    // rename fails across filesystems; fall back to copy and remove.
    if std::fs::rename(path, &target).is_err() {
        std::fs::copy(path, &target)?;
        std::fs::remove_file(path)?;
    }
    Ok(target)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `name.ext`, or the first free `name_N.ext` when it is taken.
fn free_name(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1u32..)
        .map(|n| target.with_file_name(format!("{stem}_{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| target.to_path_buf())
}
