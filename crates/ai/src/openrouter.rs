//! OpenRouter chat-completions client for dependency inference.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::json;
use tda_core::TaskBrief;
use tracing::{debug, warn};

use crate::prompt::{build_prompt, parse_dependencies, SYSTEM_MESSAGE};
use crate::{DependencyInference, InferenceError, InferredDependencies};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "openai/gpt-4";

/// OpenRouter client configuration.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Bearer token
    pub api_key: String,
    /// Model name
    pub model: String,
    /// API root, without trailing slash
    pub base_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl OpenRouterConfig {
    /// Create a configuration with default model, endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Read `OPENROUTER_API_KEY` and `OPENROUTER_MODEL` from the environment.
    pub fn from_env() -> Result<Self, InferenceError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(InferenceError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        Ok(config)
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Dependency inference backed by an OpenRouter-hosted model.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    /// Create a new client.
    pub fn new(config: OpenRouterConfig) -> Result<Self, InferenceError> {
        if config.api_key.is_empty() {
            return Err(InferenceError::MissingApiKey);
        }
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Configured model name.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_MESSAGE},
                {"role": "user", "content": prompt},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", "https://github.com/tda-workflow")
            .header("X-Title", "Task Dependency Agent")
            .json(&payload)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("OpenRouter returned status {}", status);
            return Err(match status {
                StatusCode::UNAUTHORIZED => InferenceError::Authentication(body),
                StatusCode::TOO_MANY_REQUESTS => InferenceError::RateLimited(body),
                _ => InferenceError::Api {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        #[derive(serde::Deserialize)]
        struct Response {
            #[serde(default)]
            choices: Vec<Choice>,
        }

        #[derive(serde::Deserialize)]
        struct Choice {
            message: Message,
        }

        #[derive(serde::Deserialize)]
        struct Message {
            #[serde(default)]
            content: Option<String>,
        }

        let data: Response = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::InvalidResponse("API response contains no choices".into()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl DependencyInference for OpenRouterClient {
    async fn infer_dependencies(
        &self,
        tasks: &[TaskBrief],
    ) -> Result<InferredDependencies, InferenceError> {
        if tasks.is_empty() {
            return Err(InferenceError::EmptyInput);
        }

        debug!("Inferring dependencies for {} tasks with {}", tasks.len(), self.config.model);
        let content = self.complete(&build_prompt(tasks)).await?;
        parse_dependencies(&content, tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response and return the base URL.
    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // Read headers, then as much body as Content-Length announces
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    fn client(base_url: String) -> OpenRouterClient {
        OpenRouterClient::new(OpenRouterConfig::new("test-key").with_base_url(base_url)).unwrap()
    }

    fn tasks() -> Vec<TaskBrief> {
        ["a", "b"]
            .iter()
            .map(|id| TaskBrief {
                id: id.to_string(),
                name: id.to_uppercase(),
                description: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenRouterConfig::new("k");
        assert_eq!(config.model, "openai/gpt-4");
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            OpenRouterClient::new(OpenRouterConfig::new("")),
            Err(InferenceError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_successful_inference() {
        let content = "```json\n{\"dependencies\": {\"b\": [\"a\"]}}\n```";
        let body = json!({"choices": [{"message": {"content": content}}]}).to_string();
        let base = serve_once("200 OK", body).await;

        let deps = client(base).infer_dependencies(&tasks()).await.unwrap();
        assert_eq!(deps.get("b"), Some(&vec!["a".to_string()]));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication() {
        let base = serve_once("401 Unauthorized", "{\"error\":\"bad key\"}".into()).await;
        let err = client(base).infer_dependencies(&tasks()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Authentication(ref b) if b.contains("bad key")));
    }

    #[tokio::test]
    async fn test_rate_limit_and_other_status() {
        let base = serve_once("429 Too Many Requests", "{}".into()).await;
        let err = client(base).infer_dependencies(&tasks()).await.unwrap_err();
        assert!(matches!(err, InferenceError::RateLimited(_)));

        let base = serve_once("500 Internal Server Error", "boom".into()).await;
        let err = client(base).infer_dependencies(&tasks()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Api { status: 500, ref body } if body == "boom"));
    }

    #[tokio::test]
    async fn test_no_choices_is_invalid_response() {
        let base = serve_once("200 OK", "{\"choices\": []}".into()).await;
        let err = client(base).infer_dependencies(&tasks()).await.unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}", addr))
            .infer_dependencies(&tasks())
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Network(_)));
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_request() {
        let err = client("http://127.0.0.1:9".into())
            .infer_dependencies(&[])
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::EmptyInput));
    }
}
