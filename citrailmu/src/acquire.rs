use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::audio;
use crate::classify::{classify, InputKind};
use crate::config::{AudioOptions, Options};
use crate::download::{download_streaming_audio, download_web_media};
use crate::error::{Error, Result};
use crate::task::TaskId;

/// Turns a file path or URL into a compressed audio file on local storage.
///
/// Downloaded intermediates are task-private and are deleted as soon as
/// normalization finishes, whatever its outcome. The normalized audio is
/// handed to the caller, who owns its deletion.
pub struct MediaAcquirer {
    client: reqwest::Client,
    temp_dir: PathBuf,
    yt_dlp: String,
    audio: AudioOptions,
}

impl MediaAcquirer {
    pub fn new(options: &Options) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            temp_dir: options.resolve_temp_dir(),
            yt_dlp: options.yt_dlp.clone(),
            audio: options.audio.clone(),
        })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Classify `input`, fetch it if remote, and normalize it.
    ///
    /// Every failure is logged with the task id before it is returned.
    pub async fn acquire(&self, input: &str, task_id: &TaskId) -> Result<PathBuf> {
        let kind = classify(input);
        info!(task_id = %task_id, %kind, "acquiring media");

        match kind {
            InputKind::LocalFile => self.normalize(Path::new(input), task_id).await,
            InputKind::StreamingUrl => {
                let download =
                    download_streaming_audio(input, task_id, &self.temp_dir, &self.yt_dlp)
                        .await
                        .inspect_err(|e| {
                            error!(task_id = %task_id, stage = e.stage(), error = %e, "YouTube processing failed")
                        })?;
                self.normalize(download.path(), task_id).await
            }
            InputKind::GenericUrl => {
                let download = download_web_media(&self.client, input, task_id, &self.temp_dir)
                    .await
                    .inspect_err(|e| {
                        error!(task_id = %task_id, stage = e.stage(), error = %e, "URL processing failed")
                    })?;
                self.normalize(download.path(), task_id).await
            }
            InputKind::Invalid => {
                error!(task_id = %task_id, %input, "invalid input: not a file path or URL");
                Err(Error::Classification(input.to_string()))
            }
        }
    }

    async fn normalize(&self, path: &Path, task_id: &TaskId) -> Result<PathBuf> {
        audio::normalize(path, task_id, &self.temp_dir, &self.audio).await
    }
}
