use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

use pg_chat_model::ChatCompletion;
use reqwest::{Client, Response, header};
use serde_json::Value;

use crate::OpenAIConfig;

/// The failure of a single attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates an error from any displayable cause.
    #[inline]
    pub fn new(cause: impl Display) -> Self {
        Self {
            message: cause.to_string(),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for TransportError {}

impl From<reqwest::Error> for TransportError {
    #[inline]
    fn from(err: reqwest::Error) -> Self {
        Self::new(err)
    }
}

/// Performs one attempt of posting a chat completion request.
///
/// Retrying is not the transport's business, [`crate::OpenAIProvider`]
/// calls it again when an attempt fails.
pub trait Transport: Send + Sync + 'static {
    /// Posts the request body and decodes the reply.
    fn post(
        &self,
        body: &Value,
    ) -> impl Future<Output = Result<ChatCompletion, TransportError>> + Send;
}

/// The HTTP transport backed by `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    /// Creates a transport for the endpoint and credential in `config`.
    #[inline]
    pub fn new(config: &OpenAIConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a transport that sends requests with `client`.
    #[inline]
    pub fn with_client(client: Client, config: &OpenAIConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
        }
    }
}

impl Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<deducted>")
            .finish_non_exhaustive()
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        body: &Value,
    ) -> impl Future<Output = Result<ChatCompletion, TransportError>> + Send
    {
        let resp_fut = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send();

        async move {
            let resp = resp_fut.await.and_then(Response::error_for_status)?;
            trace!("got response with status {}", resp.status());
            let completion = resp.json::<ChatCompletion>().await?;
            Ok(completion)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::OpenAIConfigBuilder;

    /// Serves one request with a canned response and returns what the
    /// client sent.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                if n == 0 || is_complete_request(&received) {
                    break;
                }
            }
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });
        (base_url, server)
    }

    fn is_complete_request(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        body.len() >= content_length
    }

    fn transport(base_url: &str) -> HttpTransport {
        let config = OpenAIConfigBuilder::with_api_key("sk-test")
            .with_base_url(base_url)
            .build();
        let client = Client::builder().no_proxy().build().unwrap();
        HttpTransport::with_client(client, &config)
    }

    #[tokio::test]
    async fn test_post_success() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Hello!"},"finish_reason":"stop"}]}"#,
        )
        .await;

        let completion = transport(&base_url)
            .post(&json!({ "model": "m", "messages": [] }))
            .await
            .unwrap();
        assert_eq!(
            completion.first_message().unwrap().content.as_deref(),
            Some("Hello!")
        );

        let request = server.await.unwrap();
        let request_lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request_lower.contains("authorization: bearer sk-test"));
        assert!(request_lower.contains("content-type: application/json"));
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, json!({ "model": "m", "messages": [] }));
    }

    #[tokio::test]
    async fn test_post_error_status() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error",
            r#"{"error":{"message":"boom"}}"#,
        )
        .await;

        let err = transport(&base_url).post(&json!({})).await.unwrap_err();
        assert!(err.message().contains("500"), "{err}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_post_undecodable_body() {
        let (base_url, server) =
            serve_once("HTTP/1.1 200 OK", "not json").await;

        let result = transport(&base_url).post(&json!({})).await;
        assert!(result.is_err());
        server.await.unwrap();
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = OpenAIConfigBuilder::with_api_key("sk-secret").build();
        let debug = format!("{:?}", HttpTransport::new(&config));
        assert!(!debug.contains("sk-secret"), "{debug}");
        assert!(debug.contains("https://api.openai.com/v1/chat/completions"));
    }

    #[tokio::test]
    async fn test_post_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        drop(listener);

        let result = transport(&base_url).post(&json!({})).await;
        assert!(result.is_err());
    }
}
