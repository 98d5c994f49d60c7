use std::path::Path;
use std::process::Stdio;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::audio::truncate_stderr;
use crate::error::{Error, Result};
use crate::task::TaskId;
use crate::temp::{sanitize_filename, TempFile};

/// Write buffer for generic HTTP downloads.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

#[derive(Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
}

/// Download the audio-only stream of a streaming-platform URL with yt-dlp.
///
/// The file lands at `{temp_dir}/{task_id}_{title}.m4a` and is removed
/// when the returned guard drops. yt-dlp's progress output is forwarded
/// to stderr.
///
/// # Security
/// - Arguments are passed via `.arg()` (no shell expansion), URL after `--`
/// - `--no-exec` prevents yt-dlp from running post-processing commands
pub async fn download_streaming_audio(
    url: &str,
    task_id: &TaskId,
    temp_dir: &Path,
    yt_dlp: &str,
) -> Result<TempFile> {
    info!(task_id = %task_id, %url, "processing YouTube URL");
    let url = ensure_scheme(url);

    let check = Command::new(yt_dlp).arg("--version").output().await;
    if check.is_err() {
        return Err(Error::YtDlpNotFound);
    }

    let info_output = Command::new(yt_dlp)
        .args(["--dump-json", "--no-download", "--no-playlist", "--no-exec", "--"])
        .arg(&url)
        .kill_on_drop(true)
        .output()
        .await?;

    let title = if info_output.status.success() {
        serde_json::from_slice::<YtDlpInfo>(&info_output.stdout)
            .ok()
            .and_then(|i| i.title)
    } else {
        warn!(
            task_id = %task_id,
            stderr = %truncate_stderr(&info_output.stderr),
            "could not read video metadata"
        );
        None
    };
    let title = title.unwrap_or_else(|| "audio".to_string());

    std::fs::create_dir_all(temp_dir)?;
    let target = TempFile::new(temp_dir.join(format!(
        "{task_id}_{}.m4a",
        sanitize_filename(&title)
    )));
    debug!(path = %target.path().display(), %title, "downloading audio-only stream");

    let output = Command::new(yt_dlp)
        .args([
            "--format",
            "bestaudio[ext=m4a]/bestaudio",
            "--no-playlist",
            "--no-exec",
            "--no-part",
            "--force-overwrites",
            "--output",
        ])
        .arg(target.path())
        .arg("--")
        .arg(&url)
        .stdout(std::io::stderr())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?
        .wait_with_output()
        .await?;

    if !output.status.success() {
        return Err(Error::Download(format!(
            "yt-dlp failed: {}",
            truncate_stderr(&output.stderr)
        )));
    }

    if !target.path().exists() {
        return Err(Error::Download(format!(
            "downloaded file not found at {}",
            target.path().display()
        )));
    }

    Ok(target)
}

/// Stream a generic URL to `{temp_dir}/{task_id}_{name}.mp4` with a plain GET.
///
/// The `.mp4` suffix is applied regardless of the real container; ffmpeg
/// probes the content. Only a 200 response is written; anything else is
/// a download error and leaves no file behind.
pub async fn download_web_media(
    client: &reqwest::Client,
    url: &str,
    task_id: &TaskId,
    temp_dir: &Path,
) -> Result<TempFile> {
    info!(task_id = %task_id, %url, "processing web URL");

    std::fs::create_dir_all(temp_dir)?;
    let target = TempFile::new(temp_dir.join(format!(
        "{task_id}_{}.mp4",
        filename_from_url(url)
    )));

    let response = client.get(url).send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::Download(format!("HTTP {status} for {url}")));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = progress_bar(total_size, target.path());

    let file = tokio::fs::File::create(target.path()).await?;
    let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    writer.flush().await?;
    pb.finish_and_clear();

    debug!(path = %target.path().display(), bytes = downloaded, "web media downloaded");
    Ok(target)
}

fn progress_bar(total_size: u64, dest: &Path) -> ProgressBar {
    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!(
        "Downloading {}",
        dest.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));
    pb
}

/// Base name of the URL path before any query string, sanitized.
/// Falls back to `download_{unix-timestamp}`.
pub fn filename_from_url(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or_default();
    let base = without_query.rsplit('/').next().unwrap_or_default();
    if base.is_empty() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        format!("download_{now}")
    } else {
        sanitize_filename(base)
    }
}

/// Streaming URLs may arrive without a scheme (`youtube.com/watch?v=..`).
fn ensure_scheme(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("http://example.com/a.mp4"), "a_mp4");
        assert_eq!(
            filename_from_url("https://cdn.example.com/media/My Talk.m4a?sig=abc/def"),
            "My_Talk_m4a"
        );
    }

    #[test]
    fn test_filename_from_url_fallback() {
        let name = filename_from_url("https://example.com/videos/");
        assert!(name.starts_with("download_"), "{name}");
        assert!(name["download_".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("youtube.com/watch?v=x"), "https://youtube.com/watch?v=x");
        assert_eq!(ensure_scheme("http://youtu.be/x"), "http://youtu.be/x");
        assert_eq!(ensure_scheme("HTTPS://youtu.be/x"), "HTTPS://youtu.be/x");
    }

    #[tokio::test]
    async fn test_download_web_media_ok() {
        let mut server = Server::new_async().await;
        let body = vec![7u8; DOWNLOAD_CHUNK_SIZE * 3 + 11];
        let _m = server
            .mock("GET", "/media/lecture.mp3")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/media/lecture.mp3?token=1", server.url());
        let client = reqwest::Client::new();
        let task_id = TaskId::new();
        let file = download_web_media(&client, &url, &task_id, dir.path())
            .await
            .unwrap();

        assert_eq!(file.path(), dir.path().join(format!("{task_id}_lecture_mp3.mp4")));
        assert_eq!(std::fs::read(file.path()).unwrap(), body);

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists(), "guard should remove the download");
    }

    #[tokio::test]
    async fn test_download_web_media_non_200() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/gone.mp4")
            .with_status(404)
            .with_body("not here")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/gone.mp4", server.url());
        let client = reqwest::Client::new();
        let result = download_web_media(&client, &url, &TaskId::new(), dir.path()).await;

        assert!(matches!(result.unwrap_err(), Error::Download(ref m) if m.contains("404")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_streaming_without_yt_dlp() {
        let dir = tempfile::tempdir().unwrap();
        let result = download_streaming_audio(
            "https://www.youtube.com/watch?v=abc",
            &TaskId::new(),
            dir.path(),
            "citrailmu-no-such-yt-dlp",
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::YtDlpNotFound));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_tasks_get_separate_downloads() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/talk.mp3")
            .with_status(200)
            .with_body("bytes")
            .expect(2)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/talk.mp3", server.url());
        let client = reqwest::Client::new();
        let (a, b) = (TaskId::new(), TaskId::new());
        let first = download_web_media(&client, &url, &a, dir.path()).await.unwrap();
        let second = download_web_media(&client, &url, &b, dir.path()).await.unwrap();

        assert_ne!(first.path(), second.path());
        drop(first);
        assert!(second.path().exists());
    }
}
