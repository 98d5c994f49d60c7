//! Google Gemini implementation of [`TextGenerator`].
//!
//! Audio goes up through the Gemini File API (resumable protocol), then a
//! single `generateContent` call references the uploaded file alongside
//! the prompt. Configuration is passed in explicitly; nothing is read from
//! process-wide state.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::generate::{prompt, GenerationRequest, TextGenerator};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-8b";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Upload a local file and return its File API handle.
    async fn upload(&self, path: &Path) -> Result<GeminiFile> {
        let bytes = tokio::fs::read(path).await?;
        let mime_type = mime_type_for(path);
        let display_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".into());

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.config.base_url))
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| request_error("upload start failed", e))?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::AiProcessing("upload session has no upload URL".into()))?;

        let finalize = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| request_error("upload failed", e))?;
        let finalize = check_status(finalize).await?;

        let uploaded: UploadResponse = finalize
            .json()
            .await
            .map_err(|e| request_error("failed to parse upload response", e))?;

        if uploaded.file.state.as_deref() == Some("FAILED") {
            return Err(Error::AiProcessing(format!(
                "uploaded file {} failed processing",
                uploaded.file.name
            )));
        }
        Ok(uploaded.file)
    }

    async fn generate_content(&self, prompt: String, file: &GeminiFile) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![
                    Part::Text { text: prompt },
                    Part::FileData {
                        file_data: FileData {
                            mime_type: file.mime_type.clone(),
                            file_uri: file.uri.clone(),
                        },
                    },
                ],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("HTTP request failed", e))?;
        let response = check_status(response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| request_error("failed to parse response", e))?;

        let candidate = body
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| Error::AiProcessing("no candidates in response".into()))?;

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text),
                        Part::FileData { .. } | Part::Other(_) => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::AiProcessing(format!(
                "empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }

    /// Best-effort removal of an uploaded file.
    async fn delete(&self, file: &GeminiFile) {
        let url = format!("{}/v1beta/{}", self.config.base_url, file.name);
        let response = self
            .client
            .delete(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await;
        match response {
            Ok(r) if r.status().is_success() => debug!(file = %file.name, "deleted uploaded file"),
            Ok(r) => warn!(file = %file.name, status = %r.status(), "failed to delete uploaded file"),
            Err(e) => warn!(file = %file.name, error = %e.without_url(), "failed to delete uploaded file"),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, audio: &Path, request: &GenerationRequest) -> Result<String> {
        let file = self.upload(audio).await?;
        info!(file = %file.name, uri = %file.uri, "uploaded audio");

        info!(model = %self.config.model, mode = %request.mode, "requesting AI {}", request.mode);
        let result = self.generate_content(prompt(request), &file).await;
        self.delete(&file).await;
        result
    }
}

/// Map auth failures and non-2xx statuses to errors, surfacing the API's message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::AiAuth);
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        let msg = serde_json::from_str::<ErrorResponse>(&error_text)
            .ok()
            .and_then(|e| e.error.map(|d| d.message))
            .unwrap_or(error_text);
        return Err(Error::AiProcessing(format!("Status {status}: {msg}")));
    }
    Ok(response)
}

/// Request failure without its URL.
fn request_error(context: &str, e: reqwest::Error) -> Error {
    Error::AiProcessing(format!("{context}: {}", e.without_url()))
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") | Some("aac") => "audio/aac",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

// -- Gemini API request/response types --

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    /// Inline data, executable code and other part kinds we do not read.
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    uri: String,
    mime_type: String,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
