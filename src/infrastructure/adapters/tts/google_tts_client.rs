//! Google TTS Client - 调用 Google Cloud Text-to-Speech REST API
//!
//! 实现 TtsEnginePort trait
//!
//! 外部 TTS API:
//! POST {endpoint}/v1/text:synthesize
//! Request: {"input": {"text": "..."}, "voice": {...}, "audioConfig": {"audioEncoding": "MP3"}}
//! Response: {"audioContent": "<base64>"}
//!
//! HTTP 429 或 `RESOURCE_EXHAUSTED` 视为限流，其余非 2xx 均为不可重试错误。

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{
    AudioFormat, SynthesisRequest, SynthesizedAudio, TtsEnginePort, TtsError,
};

#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// 认证方式
#[derive(Debug, Clone)]
pub enum GoogleTtsAuth {
    /// `?key=` 查询参数
    ApiKey(String),
    /// `Authorization: Bearer`
    BearerToken(String),
    /// 不附带凭据（本地代理/模拟服务）
    None,
}

/// Google TTS 客户端配置
#[derive(Debug, Clone)]
pub struct GoogleTtsClientConfig {
    /// API 根地址
    pub endpoint: String,
    pub auth: GoogleTtsAuth,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for GoogleTtsClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://texttospeech.googleapis.com".to_string(),
            auth: GoogleTtsAuth::None,
            timeout_secs: 60,
        }
    }
}

impl GoogleTtsClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_auth(mut self, auth: GoogleTtsAuth) -> Self {
        self.auth = auth;
        self
    }
}

/// Google TTS 客户端
pub struct GoogleTtsClient {
    client: Client,
    config: GoogleTtsClientConfig,
}

impl GoogleTtsClient {
    pub fn new(config: GoogleTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        format!(
            "{}/v1/text:synthesize",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn voices_url(&self) -> String {
        format!("{}/v1/voices", self.config.endpoint.trim_end_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            GoogleTtsAuth::ApiKey(key) => builder.query(&[("key", key)]),
            GoogleTtsAuth::BearerToken(token) => builder.bearer_auth(token),
            GoogleTtsAuth::None => builder,
        }
    }
}

/// 把非 2xx 响应映射为 TtsError
fn classify_failure(status: StatusCode, retry_after: Option<Duration>, body: &str) -> TtsError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());
    let exhausted = parsed
        .as_ref()
        .map_or(false, |e| e.error.status == "RESOURCE_EXHAUSTED");

    if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
        return TtsError::RateLimited {
            message: format!("HTTP {}: {}", status.as_u16(), message),
            retry_after,
        };
    }

    if status == StatusCode::NOT_FOUND && message.to_lowercase().contains("voice") {
        return TtsError::VoiceNotFound(message);
    }

    TtsError::ServiceError(format!("HTTP {}: {}", status.as_u16(), message))
}

#[async_trait]
impl TtsEnginePort for GoogleTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, TtsError> {
        let body = SynthesizeBody {
            input: TextInput {
                text: &request.text,
            },
            voice: VoiceSelection {
                language_code: &request.voice.language_code,
                name: request.voice.id.as_str(),
                ssml_gender: request.voice.gender.as_ssml(),
            },
            audio_config: AudioConfig {
                audio_encoding: match request.format {
                    AudioFormat::Mp3 => "MP3",
                    AudioFormat::Wav => "LINEAR16",
                },
            },
        };

        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = request.text.chars().count(),
            voice = %request.voice.id,
            "Sending TTS synthesize request"
        );

        let response = self
            .authorize(self.client.post(self.synthesize_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else if e.is_connect() {
                    TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    TtsError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, retry_after, &error_text));
        }

        let payload: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Malformed response: {}", e)))?;

        let audio_data = base64::engine::general_purpose::STANDARD
            .decode(payload.audio_content.as_bytes())
            .map_err(|e| TtsError::InvalidResponse(format!("Invalid audioContent: {}", e)))?;

        if audio_data.is_empty() {
            return Err(TtsError::InvalidResponse("Empty audioContent".to_string()));
        }

        tracing::debug!(
            voice = %request.voice.id,
            audio_size = audio_data.len(),
            "TTS synthesis completed"
        );

        // LINEAR16 响应带 WAV 头
        Ok(SynthesizedAudio {
            audio_data,
            format: request.format,
            duration_secs: None,
        })
    }

    async fn health_check(&self) -> bool {
        match self
            .authorize(self.client.get(self.voices_url()))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::{VoiceCatalog, VoiceId};

    #[test]
    fn test_config_builder() {
        let config = GoogleTtsClientConfig::new("http://localhost:9000")
            .with_timeout(10)
            .with_auth(GoogleTtsAuth::ApiKey("k".into()));
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.timeout_secs, 10);
        assert!(matches!(config.auth, GoogleTtsAuth::ApiKey(_)));
    }

    #[test]
    fn test_synthesize_url_trims_slash() {
        let client = GoogleTtsClient::new(GoogleTtsClientConfig::new("http://tts.local/")).unwrap();
        assert_eq!(client.synthesize_url(), "http://tts.local/v1/text:synthesize");
    }

    #[test]
    fn test_request_body_shape() {
        let catalog = VoiceCatalog::default();
        let voice = catalog
            .find(&VoiceId::new("es-ES-Neural2-B").unwrap())
            .unwrap();
        let body = SynthesizeBody {
            input: TextInput { text: "Hola." },
            voice: VoiceSelection {
                language_code: &voice.language_code,
                name: voice.id.as_str(),
                ssml_gender: voice.gender.as_ssml(),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["input"]["text"], "Hola.");
        assert_eq!(json["voice"]["languageCode"], "es-ES");
        assert_eq!(json["voice"]["name"], "es-ES-Neural2-B");
        assert_eq!(json["voice"]["ssmlGender"], "MALE");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn test_429_is_rate_limited() {
        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(3)),
            "",
        );
        assert!(err.is_rate_limited());
        assert!(matches!(
            err,
            TtsError::RateLimited {
                retry_after: Some(d),
                ..
            } if d == Duration::from_secs(3)
        ));
    }

    #[test]
    fn test_resource_exhausted_is_rate_limited() {
        let body = r#"{"error": {"code": 403, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = classify_failure(StatusCode::FORBIDDEN, None, body);
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_other_errors_are_fatal() {
        let body = r#"{"error": {"code": 400, "message": "Invalid input", "status": "INVALID_ARGUMENT"}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, None, body);
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "Service error: HTTP 400: Invalid input");
    }
}
