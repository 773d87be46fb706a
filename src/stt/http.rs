//! `HttpTranscriber` — calls a speech-to-text edge function over HTTP.
//!
//! Wire format:
//!
//! ```text
//! POST {base_url}{path}
//! apikey: <key>                    (only when configured)
//! Authorization: Bearer <key>      (only when configured)
//!
//! { "audio": "<base64 pcm_s16le>", "encoding": "pcm_s16le",
//!   "sample_rate_hz": 16000, "language": "en" }
//!
//! 200 → { "text": "..." }
//! ```
//!
//! All connection details come from [`TranscriptionConfig`].

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use crate::audio::AudioClip;
use crate::config::TranscriptionConfig;
use crate::stt::engine::{Transcriber, TranscriptionError};

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Production [`Transcriber`].
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl HttpTranscriber {
    /// Build from config.  The per-request timeout comes from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.path
        )
    }
}

/// Encode mono `f32` samples as base64 little-endian 16-bit PCM.
fn encode_pcm_s16le(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|s| ((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).to_le_bytes())
        .collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, TranscriptionError> {
        let clip = clip.to_16k_mono();

        let body = serde_json::json!({
            "audio":          encode_pcm_s16le(&clip.samples),
            "encoding":       "pcm_s16le",
            "sample_rate_hz": clip.sample_rate,
            "language":       self.config.language,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.header("apikey", key).bearer_auth(key);
        }

        log::debug!(
            "stt: sending {:.1} s of audio to {}",
            clip.duration_secs(),
            self.endpoint()
        );

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PATH: &str = "/functions/v1/transcribe-audio";

    fn config(base_url: &str, api_key: Option<&str>) -> TranscriptionConfig {
        TranscriptionConfig {
            base_url: base_url.to_string(),
            path: PATH.to_string(),
            api_key: api_key.map(str::to_string),
            language: "en".into(),
            timeout_secs: 5,
        }
    }

    fn clip() -> AudioClip {
        AudioClip {
            samples: vec![0.1; 96_000],
            sample_rate: 48_000,
            channels: 2,
        }
    }

    #[test]
    fn pcm_encoding_is_two_bytes_per_sample() {
        let encoded = encode_pcm_s16le(&[0.0, 1.0, -1.0]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MAX);
    }

    #[tokio::test]
    async fn returns_trimmed_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(body_partial_json(
                json!({ "encoding": "pcm_s16le", "sample_rate_hz": 16000, "language": "en" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "  my pain is severe \n" })))
            .expect(1)
            .mount(&server)
            .await;

        let stt = HttpTranscriber::from_config(&config(&server.uri(), None));
        assert_eq!(stt.transcribe(clip()).await.unwrap(), "my pain is severe");
    }

    #[tokio::test]
    async fn sends_key_headers_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        let stt = HttpTranscriber::from_config(&config(&server.uri(), Some("anon-key")));
        assert_eq!(stt.transcribe(clip()).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let stt = HttpTranscriber::from_config(&config(&server.uri(), None));
        let err = stt.transcribe(clip()).await.unwrap_err();
        assert_eq!(
            err,
            TranscriptionError::Rejected {
                status: 503,
                message: "overloaded".into()
            }
        );
    }

    #[tokio::test]
    async fn blank_text_is_empty_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "   " })))
            .mount(&server)
            .await;

        let stt = HttpTranscriber::from_config(&config(&server.uri(), None));
        assert_eq!(
            stt.transcribe(clip()).await.unwrap_err(),
            TranscriptionError::EmptyTranscript
        );
    }

    #[tokio::test]
    async fn unexpected_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "transcript": "hi" })))
            .mount(&server)
            .await;

        let stt = HttpTranscriber::from_config(&config(&server.uri(), None));
        assert!(matches!(
            stt.transcribe(clip()).await.unwrap_err(),
            TranscriptionError::Parse(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let stt = HttpTranscriber::from_config(&config("http://127.0.0.1:1", None));
        assert!(matches!(
            stt.transcribe(clip()).await.unwrap_err(),
            TranscriptionError::Request(_)
        ));
    }
}
