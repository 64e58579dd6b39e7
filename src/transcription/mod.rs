//! # Transcription Module
//!
//! Speech-to-text for the phone's recorded utterances. The audio is a complete
//! webm blob from the browser's MediaRecorder; it is sent as-is to a remote
//! Whisper service and the recognised text comes back.
//!
//! ## Failure contract:
//! [`Transcriber::transcribe`] never fails. Any network, HTTP, or decoding problem
//! is logged and reported as an empty string, which the pipeline treats as
//! "nothing understood".

pub mod groq;

pub use groq::GroqTranscriber;

use async_trait::async_trait;

/// Turns recorded audio into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one webm audio blob; returns "" when nothing could be recognised.
    async fn transcribe(&self, audio: &[u8]) -> String;
}
