//! Client for the DeepSeek chat completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::models::{GenerationRequest, RawGenerationOutput};
use crate::{Config, Error, Result};

/// Anything that can turn a generation request into raw text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Issue one request. Implementations must not retry.
    async fn generate(&self, request: &GenerationRequest) -> Result<RawGenerationOutput>;
}

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// Chat completions response body (only the parts we read).
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// DeepSeek generation client.
pub struct DeepSeekClient {
    http_client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl DeepSeekClient {
    /// Create a client whose every call is bounded by `config.request_timeout`.
    pub fn new(config: &Config, api_key: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body<'a>(&'a self, request: &'a GenerationRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            temperature: request.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_message,
                },
            ],
            response_format: request.structured_output_hint.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

impl std::fmt::Debug for DeepSeekClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepSeekClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl Generator for DeepSeekClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawGenerationOutput> {
        let started = Instant::now();

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Transport(format!("Generation request timed out: {}", e))
                } else {
                    Error::Transport(format!("Failed to reach generation service: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read generation response: {}", e)))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(elapsed_ms, status = status.as_u16(), "Generation service responded");

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "Generation service returned an error");
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = match serde_json::from_str(&body) {
            Ok(completion) => completion,
            Err(e) => {
                error!(error = %e, "Unexpected generation response envelope");
                return Err(Error::Upstream {
                    status: status.as_u16(),
                    body,
                });
            }
        };

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        debug!(raw = %text, "Raw generation output");

        Ok(RawGenerationOutput { text, elapsed_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn client() -> DeepSeekClient {
        DeepSeekClient::new(&Config::default(), "sk-test".to_string()).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let client = client();
        let request = GenerationRequest {
            system_instruction: "be a tarot reader".to_string(),
            user_message: "求问：111".to_string(),
            temperature: 1.0,
            structured_output_hint: true,
        };

        let body = serde_json::to_value(client.request_body(&request)).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "求问：111");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_request_body_without_hint() {
        let client = client();
        let request = GenerationRequest {
            system_instruction: String::new(),
            user_message: String::new(),
            temperature: 1.3,
            structured_output_hint: false,
        };

        let body = serde_json::to_value(client.request_body(&request)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_debug_hides_key() {
        assert!(!format!("{:?}", client()).contains("sk-test"));
    }

    #[test]
    fn test_parse_completion_envelope() {
        let completion: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"id\":\"I\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(completion.choices[0].message.content.as_deref(), Some("{\"id\":\"I\"}"));
    }

    /// Serve one canned HTTP response on a loopback port and return the raw
    /// request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/chat/completions", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (url, server)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client_for(url: String) -> DeepSeekClient {
        let config = Config {
            api_url: url,
            request_timeout: Duration::from_secs(5),
            ..Config::default()
        };
        DeepSeekClient::new(&config, "sk-test".to_string()).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: "be a tarot reader".to_string(),
            user_message: "will it rain".to_string(),
            temperature: 1.0,
            structured_output_hint: true,
        }
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"id\":\"I\"}"}}]}"#,
        )
        .await;

        let output = client_for(url).generate(&request()).await.unwrap();
        assert_eq!(output.text, r#"{"id":"I"}"#);

        let received = server.await.unwrap().to_ascii_lowercase();
        assert!(received.starts_with("post /chat/completions"));
        assert!(received.contains("authorization: bearer sk-test"));
        assert!(received.contains(r#""response_format":{"type":"json_object"}"#));
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_error() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{"error":"busy"}"#).await;

        let err = client_for(url).generate(&request()).await.unwrap_err();
        server.await.unwrap();

        match err {
            Error::Upstream { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, r#"{"error":"busy"}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unexpected_envelope_is_upstream_error() {
        let (url, server) = serve_once("200 OK", "<html>gateway page</html>").await;

        let err = client_for(url).generate(&request()).await.unwrap_err();
        server.await.unwrap();

        match err {
            Error::Upstream { status, body } => {
                assert_eq!(status, 200);
                assert_eq!(body, "<html>gateway page</html>");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_text() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .await;
        let output = client_for(url).generate(&request()).await.unwrap();
        server.await.unwrap();
        assert_eq!(output.text, "");

        let (url, server) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let output = client_for(url).generate(&request()).await.unwrap();
        server.await.unwrap();
        assert_eq!(output.text, "");
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/chat/completions", listener.local_addr().unwrap());
        drop(listener);

        let err = client_for(url).generate(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
