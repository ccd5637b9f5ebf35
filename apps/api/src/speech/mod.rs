//! Speech-to-text for recorded answers.
//!
//! Filler words must survive both the provider options and normalisation; the
//! language score depends on them.
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{AppError, Capability, UpstreamError};

const DEEPGRAM_LISTEN_URL: &str = "https://api.deepgram.com/v1/listen";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_MIMETYPE: &str = "audio/mp3";

/// Provider options for one recognition request.
#[derive(Debug, Clone)]
pub struct TranscriptionOptions {
    pub model: String,
    pub language: String,
    pub mimetype: String,
    pub smart_format: bool,
    pub filler_words: bool,
    pub punctuate: bool,
    pub numerals: bool,
    pub utterances: bool,
    pub paragraphs: bool,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            mimetype: DEFAULT_MIMETYPE.to_string(),
            smart_format: true,
            filler_words: true,
            punctuate: true,
            numerals: true,
            utterances: true,
            paragraphs: true,
        }
    }
}

impl TranscriptionOptions {
    /// Sets the upload's content type, keeping the default for blank values.
    pub fn with_mimetype(mut self, mimetype: Option<&str>) -> Self {
        if let Some(m) = mimetype.map(str::trim).filter(|m| !m.is_empty()) {
            self.mimetype = m.to_string();
        }
        self
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("model", self.model.clone()),
            ("language", self.language.clone()),
            ("smart_format", self.smart_format.to_string()),
            ("filler_words", self.filler_words.to_string()),
            ("punctuate", self.punctuate.to_string()),
            ("numerals", self.numerals.to_string()),
            ("utterances", self.utterances.to_string()),
            ("paragraphs", self.paragraphs.to_string()),
        ]
    }
}

/// Raw recognition capability: audio in, provider transcript out.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<String, UpstreamError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Deepgram
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
}

impl ListenResponse {
    fn into_transcript(self) -> Option<String> {
        self.results?
            .channels
            .into_iter()
            .next()?
            .alternatives
            .into_iter()
            .next()
            .map(|a| a.transcript)
    }
}

#[derive(Clone)]
pub struct DeepgramClient {
    client: Client,
    api_key: String,
}

impl DeepgramClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for DeepgramClient {
    async fn transcribe(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<String, UpstreamError> {
        let service = Capability::SpeechRecognition;

        let response = self
            .client
            .post(DEEPGRAM_LISTEN_URL)
            .query(&options.to_query())
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", &options.mimetype)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| UpstreamError::Network {
                service,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Speech API returned {}: {}", status, body);
            return Err(classify_failure(status.as_u16(), &body));
        }

        let parsed: ListenResponse = response.json().await.map_err(|e| UpstreamError::Rejected {
            service,
            status: status.as_u16(),
            detail: format!("undecodable response body: {e}"),
        })?;

        parsed
            .into_transcript()
            .ok_or(UpstreamError::EmptyResponse { service })
    }
}

fn classify_failure(status: u16, body: &str) -> UpstreamError {
    let service = Capability::SpeechRecognition;
    if matches!(status, 401 | 403) {
        return UpstreamError::InvalidCredentials { service };
    }
    let lowered = body.to_lowercase();
    if lowered.contains("insufficient") || lowered.contains("quota") || lowered.contains("balance") {
        return UpstreamError::QuotaExceeded { service };
    }
    match status {
        402 => UpstreamError::QuotaExceeded { service },
        429 => UpstreamError::RateLimited { service },
        500..=599 => UpstreamError::Unavailable { service, status },
        _ => UpstreamError::Rejected {
            service,
            status,
            detail: body.to_string(),
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transcriber
// ────────────────────────────────────────────────────────────────────────────

static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?])").expect("valid regex"));
static SPACE_AFTER_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,!?])\s+").expect("valid regex"));
static DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*-\s*").expect("valid regex"));
static COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").expect("valid regex"));
static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(uh|um|ah|er|hm|hmm|uhm)\s+").expect("valid regex")
});
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Recognizer plus transcript clean-up. This is what the session talks to.
pub struct SpeechTranscriber {
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl SpeechTranscriber {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self { recognizer }
    }

    pub async fn transcribe(
        &self,
        audio: &[u8],
        options: Option<&TranscriptionOptions>,
    ) -> Result<String, AppError> {
        let defaults;
        let options = match options {
            Some(o) => o,
            None => {
                defaults = TranscriptionOptions::default();
                &defaults
            }
        };

        let raw = self.recognizer.transcribe(audio, options).await?;
        let transcript = normalize_transcript(&raw);
        if transcript.is_empty() {
            warn!("Transcription returned no speech ({} bytes of audio)", audio.len());
        } else {
            debug!("Transcribed {} bytes of audio into {} chars", audio.len(), transcript.len());
        }
        Ok(transcript)
    }
}

/// Tidies punctuation spacing without dropping any spoken token.
pub fn normalize_transcript(raw: &str) -> String {
    let text = SPACE_BEFORE_PUNCT_RE.replace_all(raw, "${1}");
    let text = SPACE_AFTER_PUNCT_RE.replace_all(&text, "${1} ");
    let text = DASH_RE.replace_all(&text, "-");
    let text = COMMA_RE.replace_all(&text, ", ");
    let text = FILLER_RE.replace_all(&text, " ${1} ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}
