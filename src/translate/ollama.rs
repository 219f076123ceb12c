use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{Result, SubbatchError};
use crate::language::Language;
use super::backend::{BackendResponse, TranslationBackend};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Translation backend talking to an ollama server
pub struct OllamaBackend {
    client: Client,
    config: TranslateConfig,
}

impl OllamaBackend {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Check that ollama is reachable and the model is present
    pub async fn check_availability(&self) -> Result<()> {
        let url = api_url(&self.config.endpoint, "show");
        let request = json!({
            "name": self.config.model
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubbatchError::Config(format!("Failed to connect to ollama at {}: {}", url, e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.config.model);
            Ok(())
        } else {
            Err(SubbatchError::Config(format!(
                "Ollama model '{}' not found (HTTP {}). Please pull the model first: ollama pull {}",
                self.config.model,
                response.status().as_u16(),
                self.config.model
            )))
        }
    }
}

#[async_trait]
impl TranslationBackend for OllamaBackend {
    async fn generate(&self, text: &str, source: &Language, target: &Language) -> BackendResponse {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_translation_prompt(text, source, target),
            stream: false,
        };
        let url = api_url(&self.config.endpoint, "generate");
        debug!("Sending translation request to: {}", url);

        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return BackendResponse::HttpError {
                status: status.as_u16(),
                body,
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return classify_transport_error(e),
        };

        match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(generated) => BackendResponse::Completion(generated.response),
            Err(e) => BackendResponse::Malformed(format!("{} (body: {})", e, body)),
        }
    }
}

fn classify_transport_error(error: reqwest::Error) -> BackendResponse {
    if error.is_timeout() {
        BackendResponse::TimedOut
    } else {
        BackendResponse::ConnectionFailed(error.to_string())
    }
}

/// Build an ollama API url. `endpoint` may be the server root or the full
/// `/api/generate` url.
pub fn api_url(endpoint: &str, api: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    let base = base.strip_suffix("/api/generate").unwrap_or(base);
    format!("{}/api/{}", base, api)
}

/// Build the per-unit translation prompt
pub fn build_translation_prompt(text: &str, source: &Language, target: &Language) -> String {
    format!(
        "You are a professional subtitle translator. /no_think\n\
         Translate the subtitle text below from {source} to {target}.\n\
         \n\
         Rules:\n\
         1. Output only the {target} translation of the text.\n\
         2. Do not add commentary, explanations, notes, greetings or phrases such as \"Here is the translation:\".\n\
         3. Do not output tags or markers of any kind, such as <think> or </think>.\n\
         4. Do not wrap the translation in quotation marks unless the original meaning requires them.\n\
         5. Keep the line breaks of the original text.\n\
         6. Keep proper names and technical terms unchanged when {target} has no natural equivalent.\n\
         7. Preserve the meaning and tone of the original.\n\
         \n\
         {source} text:\n\
         \"\"\"\n\
         {text}\n\
         \"\"\"\n\
         \n\
         Your {target} translation:",
        source = source.name,
        target = target.name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(endpoint: String, timeout_secs: u64) -> TranslateConfig {
        TranslateConfig {
            endpoint,
            model: "test-model".to_string(),
            timeout_secs,
        }
    }

    fn english() -> Language {
        Language::new("English", "en")
    }

    fn french() -> Language {
        Language::new("French", "fr")
    }

    /// Serve one canned HTTP response, or hang forever when `response` is None
    async fn serve_once(response: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            match response {
                Some(response) => {
                    socket.write_all(response.as_bytes()).await.unwrap();
                    let _ = socket.shutdown().await;
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        });

        format!("http://{}", addr)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + length {
                    return;
                }
            }
        }
    }

    #[test]
    fn test_api_url_accepts_root_or_generate_url() {
        assert_eq!(api_url("http://localhost:11434", "generate"), "http://localhost:11434/api/generate");
        assert_eq!(api_url("http://localhost:11434/", "show"), "http://localhost:11434/api/show");
        assert_eq!(
            api_url("http://127.0.0.1:11434/api/generate", "show"),
            "http://127.0.0.1:11434/api/show"
        );
    }

    #[test]
    fn test_prompt_carries_constraints() {
        let prompt = build_translation_prompt("Hello\nWorld", &english(), &french());
        assert!(prompt.contains("from English to French"));
        assert!(prompt.contains("Hello\nWorld"));
        assert!(prompt.contains("line breaks"));
        assert!(prompt.contains("quotation marks"));
        assert!(prompt.contains("<think>"));
        assert!(prompt.contains("proper names"));
        assert!(prompt.ends_with("Your French translation:"));
    }

    #[tokio::test]
    async fn test_generate_returns_completion() {
        let endpoint = serve_once(Some(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 34\r\nConnection: close\r\n\r\n{\"response\":\"Bonjour\",\"done\":true}",
        ))
        .await;
        let backend = OllamaBackend::new(test_config(endpoint, 5)).unwrap();

        let response = backend.generate("Hello", &english(), &french()).await;
        assert_eq!(response, BackendResponse::Completion("Bonjour".to_string()));
    }

    #[tokio::test]
    async fn test_generate_classifies_http_error() {
        let endpoint = serve_once(Some(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
        ))
        .await;
        let backend = OllamaBackend::new(test_config(endpoint, 5)).unwrap();

        let response = backend.generate("Hello", &english(), &french()).await;
        assert_eq!(
            response,
            BackendResponse::HttpError { status: 500, body: "boom".to_string() }
        );
    }

    #[tokio::test]
    async fn test_generate_classifies_malformed_body() {
        let endpoint = serve_once(Some(
            "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        ))
        .await;
        let backend = OllamaBackend::new(test_config(endpoint, 5)).unwrap();

        let response = backend.generate("Hello", &english(), &french()).await;
        assert!(matches!(response, BackendResponse::Malformed(_)));
    }

    #[tokio::test]
    async fn test_generate_classifies_timeout() {
        let endpoint = serve_once(None).await;
        let backend = OllamaBackend::new(test_config(endpoint, 1)).unwrap();

        let response = backend.generate("Hello", &english(), &french()).await;
        assert_eq!(response, BackendResponse::TimedOut);
    }

    #[tokio::test]
    async fn test_generate_classifies_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let backend = OllamaBackend::new(test_config(format!("http://{}", addr), 5)).unwrap();

        let response = backend.generate("Hello", &english(), &french()).await;
        assert!(matches!(response, BackendResponse::ConnectionFailed(_)));
    }
}
