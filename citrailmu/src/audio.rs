use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::AudioOptions;
use crate::error::{Error, Result};
use crate::task::TaskId;
use crate::temp::{sanitized_stem, TempFile};

/// Stderr is capped before it goes into an error message.
const MAX_STDERR_CHARS: usize = 1000;

/// Basic facts about a media file's first audio stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds, if ffprobe reports one.
    pub duration: Option<f64>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    channels: Option<u32>,
    sample_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Read duration, channel count and sample rate with ffprobe.
pub async fn probe(path: &Path, options: &AudioOptions) -> Result<MediaInfo> {
    let output = Command::new(&options.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=channels,sample_rate:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| tool_error(&options.ffprobe, e))?;

    if !output.status.success() {
        return Err(Error::Normalization(format!(
            "ffprobe failed: {}",
            truncate_stderr(&output.stderr)
        )));
    }

    parse_probe(&output.stdout)
}

fn parse_probe(stdout: &[u8]) -> Result<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    let stream = probe.streams.into_iter().next();

    Ok(MediaInfo {
        duration: probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse().ok()),
        channels: stream.as_ref().and_then(|s| s.channels),
        sample_rate: stream
            .and_then(|s| s.sample_rate)
            .and_then(|r| r.parse().ok()),
    })
}

/// Compress any audio/video file to a small mono MP3 suitable for upload.
///
/// Output: `{temp_dir}/{sanitized-basename}.mp3`, mono, 22.05 kHz, 16-bit,
/// 16 kbit/s, with a short fade-out at the end. The caller owns the
/// returned file. Failures are logged with the task id here.
pub async fn normalize(
    path: &Path,
    task_id: &TaskId,
    temp_dir: &Path,
    options: &AudioOptions,
) -> Result<PathBuf> {
    info!(task_id = %task_id, path = %path.display(), "compressing audio");

    match compress(path, temp_dir, options).await {
        Ok(output) => {
            info!(task_id = %task_id, output = %output.display(), "audio compressed");
            Ok(output)
        }
        Err(e) => {
            error!(task_id = %task_id, stage = e.stage(), error = %e, "audio compression failed");
            Err(e)
        }
    }
}

async fn compress(path: &Path, temp_dir: &Path, options: &AudioOptions) -> Result<PathBuf> {
    if !path.exists() {
        return Err(Error::AudioNotFound {
            path: path.to_path_buf(),
        });
    }

    let info = probe(path, options).await?;
    if info.channels.is_none() {
        return Err(Error::Normalization(format!(
            "no audio stream in {}",
            path.display()
        )));
    }
    debug!(?info, "probed input");

    std::fs::create_dir_all(temp_dir)?;
    let mut name = sanitized_stem(path);
    if is_same_file(path, &temp_dir.join(format!("{name}.mp3"))) {
        // The input belongs to the caller and is never replaced.
        name.push_str("_compressed");
    }
    let output = temp_dir.join(format!("{name}.mp3"));
    let partial = TempFile::new(temp_dir.join(format!("{name}.mp3.part")));

    let mut cmd = Command::new(&options.ffmpeg);
    cmd.args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(path)
        .arg("-vn");

    match info.duration.and_then(|d| fade_filter(d, options.fade_out_secs)) {
        Some(filter) => {
            cmd.args(["-af", &filter]);
        }
        None => warn!(path = %path.display(), "unknown or too short duration, skipping fade-out"),
    }

    cmd.args([
        "-ac",
        "1",
        "-ar",
        &options.sample_rate.to_string(),
        "-sample_fmt",
        "s16p",
        "-c:a",
        "libmp3lame",
        "-b:a",
        &options.bitrate,
        "-f",
        "mp3",
    ])
    .arg(partial.path())
    .kill_on_drop(true);

    debug!(?cmd, "running ffmpeg");
    let result = cmd
        .output()
        .await
        .map_err(|e| tool_error(&options.ffmpeg, e))?;

    if !result.status.success() {
        return Err(Error::Normalization(format!(
            "ffmpeg failed: {}",
            truncate_stderr(&result.stderr)
        )));
    }

    tokio::fs::rename(partial.path(), &output).await?;
    Ok(output)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `afade` filter ending exactly at the end of the input, or `None` when
/// the input is not longer than the fade itself.
fn fade_filter(duration: f64, fade_secs: f64) -> Option<String> {
    if !duration.is_finite() || fade_secs <= 0.0 || duration <= fade_secs {
        return None;
    }
    let start = duration - fade_secs;
    Some(format!("afade=t=out:st={start:.3}:d={fade_secs:.3}"))
}

pub(crate) fn tool_error(program: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::ToolNotFound {
            program: program.to_string(),
        }
    } else {
        Error::Io(e)
    }
}

pub(crate) fn truncate_stderr(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .trim()
        .chars()
        .take(MAX_STDERR_CHARS)
        .collect()
}
