//! HTTP translation backends behind the [`Translator`] port.

use crate::domain::ports::Translator;
use crate::utils::error::{ReportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const GOOGLE_DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com";
pub const LIBRE_DEFAULT_ENDPOINT: &str = "https://libretranslate.com";
pub const DEFAULT_TARGET_LANGUAGE: &str = "hy";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    /// Public Google Translate endpoint (no key)
    #[default]
    Google,
    /// LibreTranslate-compatible server
    Libre,
    /// Returns the source text unchanged
    Passthrough,
}

impl TranslationProvider {
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            TranslationProvider::Google => Some(GOOGLE_DEFAULT_ENDPOINT),
            TranslationProvider::Libre => Some(LIBRE_DEFAULT_ENDPOINT),
            TranslationProvider::Passthrough => None,
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TranslationProvider::Google => "google",
            TranslationProvider::Libre => "libre",
            TranslationProvider::Passthrough => "passthrough",
        };
        f.write_str(name)
    }
}

/// Everything needed to build a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorSettings {
    pub provider: TranslationProvider,
    pub endpoint: Option<String>,
    pub target_language: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            endpoint: None,
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            api_key: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl TranslatorSettings {
    fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .or_else(|| self.provider.default_endpoint().map(str::to_string))
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string()
    }
}

fn http_client(timeout_seconds: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}

pub fn build_translator(settings: &TranslatorSettings) -> Result<Box<dyn Translator>> {
    tracing::debug!(
        "Building {} translator (target '{}', timeout {}s)",
        settings.provider,
        settings.target_language,
        settings.timeout_seconds
    );
    Ok(match settings.provider {
        TranslationProvider::Google => Box::new(GoogleTranslator::new(
            http_client(settings.timeout_seconds)?,
            settings.endpoint(),
            &settings.target_language,
        )),
        TranslationProvider::Libre => Box::new(LibreTranslator::new(
            http_client(settings.timeout_seconds)?,
            settings.endpoint(),
            &settings.target_language,
            settings.api_key.clone(),
        )),
        TranslationProvider::Passthrough => Box::new(PassthroughTranslator),
    })
}

async fn checked(response: reqwest::Response, backend: &str) -> Result<reqwest::Response> {
    let status = response.status();
    tracing::debug!("{} response status: {}", backend, status);
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ReportError::TranslationError {
        message: format!("{} returned {}: {}", backend, status, body.trim()),
    })
}

/// `GET {endpoint}/translate_a/single?client=gtx&sl=auto&tl=..&dt=t&q=..`
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    target: String,
}

impl GoogleTranslator {
    pub fn new(client: Client, endpoint: impl Into<String>, target: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            target: target.to_string(),
        }
    }

    /// The response is a nested array; the first element lists
    /// `[translated, source, ...]` per sentence.
    fn join_segments(body: &serde_json::Value) -> Result<String> {
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| ReportError::TranslationError {
                message: "unexpected response shape from Google".to_string(),
            })?;
        Ok(segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
            .collect())
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let url = format!("{}/translate_a/single", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;
        let body: serde_json::Value = checked(response, "Google").await?.json().await?;
        Self::join_segments(&body)
    }

    fn name(&self) -> &str {
        "google"
    }
}

#[derive(Debug, Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// `POST {endpoint}/translate` with a JSON body.
pub struct LibreTranslator {
    client: Client,
    endpoint: String,
    target: String,
    api_key: Option<String>,
}

impl LibreTranslator {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        target: &str,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            target: target.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Translator for LibreTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let request = LibreRequest {
            q: text,
            source: "auto",
            target: &self.target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&request)
            .send()
            .await?;
        let body: LibreResponse = checked(response, "LibreTranslate").await?.json().await?;
        Ok(body.translated_text)
    }

    fn name(&self) -> &str {
        "libre"
    }
}

/// Leaves text untouched; used for dry runs and offline editing.
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(provider: TranslationProvider, endpoint: String) -> TranslatorSettings {
        TranslatorSettings {
            provider,
            endpoint: Some(endpoint),
            timeout_seconds: 5,
            ..TranslatorSettings::default()
        }
    }

    #[tokio::test]
    async fn test_google_joins_sentences() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/translate_a/single")
                .query_param("client", "gtx")
                .query_param("tl", "hy")
                .query_param("q", "Door seal damaged. Replaced.");
            then.status(200).json_body(json!([
                [
                    ["Դռան կնիքը վնասված է։ ", "Door seal damaged. ", null],
                    ["Փոխարինվել է։", "Replaced.", null]
                ],
                null,
                "en"
            ]));
        });

        let translator =
            build_translator(&settings(TranslationProvider::Google, server.base_url())).unwrap();
        let text = translator
            .translate("Door seal damaged. Replaced.")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(text, "Դռան կնիքը վնասված է։ Փոխարինվել է։");
        assert_eq!(translator.name(), "google");
    }

    #[tokio::test]
    async fn test_google_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/translate_a/single");
            then.status(429).body("Too Many Requests");
        });

        let translator =
            build_translator(&settings(TranslationProvider::Google, server.base_url())).unwrap();
        let err = translator.translate("text").await.unwrap_err();
        assert!(matches!(err, ReportError::TranslationError { .. }));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_libre_sends_api_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/translate").json_body(json!({
                "q": "Catering delayed",
                "source": "auto",
                "target": "hy",
                "format": "text",
                "api_key": "secret"
            }));
            then.status(200)
                .json_body(json!({ "translatedText": "Սննդի մատակարարումը ուշացավ" }));
        });

        let mut config = settings(TranslationProvider::Libre, format!("{}/", server.base_url()));
        config.api_key = Some("secret".to_string());
        let translator = build_translator(&config).unwrap();
        let text = translator.translate("Catering delayed").await.unwrap();

        mock.assert();
        assert_eq!(text, "Սննդի մատակարարումը ուշացավ");
    }

    #[tokio::test]
    async fn test_passthrough() {
        let translator = build_translator(&TranslatorSettings {
            provider: TranslationProvider::Passthrough,
            ..TranslatorSettings::default()
        })
        .unwrap();
        assert_eq!(translator.translate("as is").await.unwrap(), "as is");
    }
}
