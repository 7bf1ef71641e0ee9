// ============================================================================
// AI OPERATIONS: sketch-to-image round trip through the Gemini API
// ============================================================================
//
// The canvas goes out as an inline base64 PNG next to the user's instruction;
// the reply's last inline image part comes back as the new background.
// Requests are blocking and always run on their own thread (see GenerationJob)
// so the UI thread never waits on the network. The rayon pool stays free for
// rasterising strokes while a request is in flight.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::AppSettings;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PROMPT_SUFFIX: &str = "Keep the same minimal line drawing style.";

/// Models offered in the header drop-down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelChoice {
    #[default]
    Flash25ImagePreview,
    Flash20ImageGeneration,
}

impl ModelChoice {
    pub fn all() -> &'static [ModelChoice] {
        &[ModelChoice::Flash25ImagePreview, ModelChoice::Flash20ImageGeneration]
    }

    pub fn id(&self) -> &'static str {
        match self {
            ModelChoice::Flash25ImagePreview => "gemini-2.5-flash-image-preview",
            ModelChoice::Flash20ImageGeneration => "gemini-2.0-flash-preview-image-generation",
        }
    }

    pub fn label(&self) -> String {
        match self {
            ModelChoice::Flash25ImagePreview => t!("model.flash_25"),
            ModelChoice::Flash20ImageGeneration => t!("model.flash_20"),
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|m| m.id() == id)
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No API key configured. Set GEMINI_API_KEY or add api_key to the settings file.")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx reply; `body` is compacted JSON when the server sent JSON.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("Failed to generate image, please try again.")]
    NoImage,
    #[error("could not decode returned image: {0}")]
    Decode(String),
    #[error("the generation worker stopped before replying")]
    WorkerLost,
}

// ============================================================================
// Wire types (generateContent)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

// ============================================================================
// Request / outcome
// ============================================================================

#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Appended to the prompt, e.g. a style reminder. Empty = none.
    pub prompt_suffix: String,
    pub image_png: Vec<u8>,
}

impl GenerationRequest {
    /// `"<prompt>. <suffix>"`, or just the prompt when the suffix is empty.
    pub fn instruction(&self) -> String {
        if self.prompt_suffix.trim().is_empty() {
            self.prompt.clone()
        } else {
            format!("{}. {}", self.prompt, self.prompt_suffix)
        }
    }

    pub fn to_body(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(Blob {
                            mime_type: "image/png".to_string(),
                            data: STANDARD.encode(&self.image_png),
                        }),
                    },
                    Part {
                        text: Some(self.instruction()),
                        inline_data: None,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

/// A successful generation: the prompt that produced it and the image bytes.
#[derive(Clone, Debug)]
pub struct GenerationOutcome {
    pub prompt: String,
    pub image: Vec<u8>,
    pub mime_type: String,
    /// Any text parts the model sent alongside the image.
    pub text: Option<String>,
}

/// Pull the image out of a reply. The last inline-data part wins.
pub fn extract_image(
    response: &GenerateContentResponse,
) -> Result<(Vec<u8>, String, Option<String>), GenerateError> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| GenerateError::MalformedResponse("no candidates in reply".to_string()))?;
    let content = candidate
        .content
        .as_ref()
        .ok_or_else(|| GenerateError::MalformedResponse("candidate has no content".to_string()))?;

    let text: Vec<&str> = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
    let text = (!text.is_empty()).then(|| text.join("\n"));

    let blob = content
        .parts
        .iter()
        .filter_map(|p| p.inline_data.as_ref())
        .next_back()
        .ok_or(GenerateError::NoImage)?;
    let bytes = STANDARD
        .decode(blob.data.trim())
        .map_err(|e| GenerateError::Decode(e.to_string()))?;
    Ok((bytes, blob.mime_type.clone(), text))
}

/// Reduce an error message to something fit for the error modal: if it
/// embeds `{"error": {...}}` JSON, show its `message` field, otherwise the
/// message itself.
pub fn parse_error(message: &str) -> String {
    const MARKER: &str = "{\"error\":";
    let Some(start) = message.find(MARKER) else {
        return message.to_string();
    };
    let rest = &message[start + MARKER.len()..];
    let line = rest.lines().next().unwrap_or(rest);
    let Some(end) = line.rfind('}') else {
        return message.to_string();
    };
    serde_json::from_str::<serde_json::Value>(&line[..end])
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| message.to_string())
}

// ============================================================================
// Client
// ============================================================================

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, GenerateError> {
        if api_key.trim().is_empty() {
            return Err(GenerateError::MissingApiKey);
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("CoDraw/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, GenerateError> {
        let key = settings.resolved_api_key().ok_or(GenerateError::MissingApiKey)?;
        Self::new(
            &settings.api_base_url,
            key,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Send one request and wait for the reply.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, GenerateError> {
        let started = Instant::now();
        let resp = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request.to_body())
            .send()?;

        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body: compact_json(&body),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;
        let (image, mime_type, text) = extract_image(&parsed)?;
        crate::io::decode_image(&image).map_err(|e| GenerateError::Decode(e.to_string()))?;

        log_info!(
            "{} replied with {} bytes ({}) in {:.1}s",
            request.model,
            image.len(),
            mime_type,
            started.elapsed().as_secs_f32()
        );
        Ok(GenerationOutcome {
            prompt: request.prompt.clone(),
            image,
            mime_type,
            text,
        })
    }
}

/// Re-serialize JSON bodies onto one line so `parse_error` can find them.
fn compact_json(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| body.trim().to_string())
}

// ============================================================================
// Background job
// ============================================================================

pub type GenerationResult = Result<GenerationOutcome, GenerateError>;

/// A request running on a background thread; poll once per frame.
pub struct GenerationJob {
    receiver: mpsc::Receiver<GenerationResult>,
    started: Instant,
}

impl GenerationJob {
    pub fn spawn(client: GeminiClient, request: GenerationRequest) -> Self {
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let result = client.generate(&request);
            if let Err(e) = &result {
                log_err!("Generation with {} failed: {}", request.model, e);
            }
            // Receiver gone means the app is shutting down
            let _ = sender.send(result);
        });
        Self {
            receiver,
            started: Instant::now(),
        }
    }

    /// Job that fails immediately (e.g. the client could not be built).
    pub fn failed(error: GenerateError) -> Self {
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(Err(error));
        Self {
            receiver,
            started: Instant::now(),
        }
    }

    pub fn poll(&self) -> Option<GenerationResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(GenerateError::WorkerLost)),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
