//! # Groq Whisper Client
//!
//! Sends audio to Groq's OpenAI-compatible transcription endpoint.
//!
//! ## Request:
//! `multipart/form-data` with the audio as `file` (`audio.webm`, `audio/webm`),
//! plus `model`, `language` and `response_format=json`. The response body is
//! `{"text": "..."}`. One attempt per utterance, bounded by the configured timeout.

use crate::config::TranscriptionConfig;
use crate::error::{AppError, AppResult};
use crate::transcription::Transcriber;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Remote Whisper transcriber.
pub struct GroqTranscriber {
    /// Reused for connection pooling; carries the request timeout.
    http_client: Client,
    config: TranscriptionConfig,
}

impl GroqTranscriber {
    pub fn new(config: TranscriptionConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Config(format!("failed to build transcription HTTP client: {}", e)))?;

        Ok(Self { http_client, config })
    }

    /// One transcription attempt with errors surfaced.
    async fn try_transcribe(&self, audio: &[u8]) -> AppResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Config("no transcription API key configured".to_string()))?;

        let file_part = Part::bytes(audio.to_vec())
            .file_name("audio.webm")
            .mime_str("audio/webm")
            .map_err(|e| AppError::Internal(format!("invalid MIME type: {}", e)))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone())
            .text("response_format", "json");

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "transcription API returned {}: {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = response.json().await?;
        Ok(parsed.text.trim().to_string())
    }
}

#[async_trait]
impl Transcriber for GroqTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> String {
        let start_time = Instant::now();
        debug!(bytes = audio.len(), model = %self.config.model, "Sending audio for transcription");

        match self.try_transcribe(audio).await {
            Ok(text) => {
                info!(
                    duration_ms = start_time.elapsed().as_millis() as u64,
                    "Transcribed: '{}'",
                    text
                );
                text
            }
            Err(err) => {
                error!("Transcription error: {}", err);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, api_key: Option<&str>) -> TranscriptionConfig {
        TranscriptionConfig {
            api_url: format!("{}/openai/v1/audio/transcriptions", server.uri()),
            model: "whisper-large-v3".to_string(),
            language: "en".to_string(),
            timeout_secs: 5,
            api_key: api_key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_transcribe_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer gsk_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "  pause the movie \n"})))
            .expect(1)
            .mount(&server)
            .await;

        let transcriber = GroqTranscriber::new(config_for(&server, Some("gsk_test"))).unwrap();
        let text = transcriber.transcribe(b"webm-bytes").await;
        assert_eq!(text, "pause the movie");
    }

    #[tokio::test]
    async fn test_http_error_yields_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let transcriber = GroqTranscriber::new(config_for(&server, Some("gsk_test"))).unwrap();
        assert_eq!(transcriber.transcribe(b"webm-bytes").await, "");
    }

    #[tokio::test]
    async fn test_malformed_body_yields_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let transcriber = GroqTranscriber::new(config_for(&server, Some("gsk_test"))).unwrap();
        assert_eq!(transcriber.transcribe(b"webm-bytes").await, "");
    }

    #[tokio::test]
    async fn test_missing_key_skips_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hello"})))
            .expect(0)
            .mount(&server)
            .await;

        let transcriber = GroqTranscriber::new(config_for(&server, None)).unwrap();
        assert_eq!(transcriber.transcribe(b"webm-bytes").await, "");
    }
}
