//! A chat provider for OpenAI-compatible chat completion APIs.
//!
//! Each request is posted to `<base_url>/chat/completions`. Failed attempts
//! are retried with a randomized exponential backoff until the attempt
//! budget in [`OpenAIConfig`] runs out.

#[macro_use]
extern crate tracing;

mod config;
mod proto;
mod retry;
mod transport;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use backoff::backoff::Backoff;
use pg_chat_model::{
    ChatCompletion, ChatProvider, ChatProviderError, ChatRequest, ErrorKind,
};
use tracing::Instrument;

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
pub use retry::RandomExponential;
pub use transport::{HttpTransport, Transport, TransportError};

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    attempts: u32,
}

impl Error {
    fn connection(cause: impl Display, attempts: u32) -> Self {
        Self {
            message: format!("Failed to connect to OpenAI API due to: {cause}"),
            kind: ErrorKind::Connection,
            attempts,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns how many attempts were made before giving up.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ChatProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

type BackoffFactory = Arc<dyn Fn() -> Box<dyn Backoff + Send> + Send + Sync>;

/// OpenAI-compatible chat provider.
///
/// By default requests go through [`HttpTransport`] and wait between
/// attempts according to [`RandomExponential`] with the bounds from the
/// configuration. Both can be replaced, see [`OpenAIProvider::with_transport`]
/// and [`OpenAIProvider::with_backoff`].
pub struct OpenAIProvider<T = HttpTransport> {
    transport: Arc<T>,
    config: Arc<OpenAIConfig>,
    make_backoff: BackoffFactory,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self::with_transport(HttpTransport::new(&config), config)
    }
}

impl<T: Transport> OpenAIProvider<T> {
    /// Creates a provider that sends requests through `transport`.
    pub fn with_transport(transport: T, config: OpenAIConfig) -> Self {
        let (min, max) = (config.min_backoff, config.max_backoff);
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
            make_backoff: Arc::new(move || -> Box<dyn Backoff + Send> {
                Box::new(RandomExponential::new(min, max))
            }),
        }
    }

    /// Replaces the delay source between attempts. `make_backoff` is called
    /// once per request.
    pub fn with_backoff<B, F>(mut self, make_backoff: F) -> Self
    where
        B: Backoff + Send + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.make_backoff =
            Arc::new(move || -> Box<dyn Backoff + Send> {
                Box::new(make_backoff())
            });
        self
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

impl<T> Clone for OpenAIProvider<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            make_backoff: Arc::clone(&self.make_backoff),
        }
    }
}

impl<T> Debug for OpenAIProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ChatProvider for OpenAIProvider<T> {
    type Error = Error;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatCompletion, Self::Error>> + Send + 'static
    {
        // Nothing was sent if the body can't be built, hence no attempts.
        let body = serde_json::to_value(proto::create_request(req, &self.config))
            .map_err(|err| Error::connection(err, 0));
        let transport = Arc::clone(&self.transport);
        let make_backoff = Arc::clone(&self.make_backoff);
        let max_attempts = self.config.max_attempts;
        let message_count = req.messages.len();
        let function_count = req.functions.len();

        async move {
            let body = body?;
            trace!(
                "sending {message_count} message(s) with {function_count} \
                 function(s)"
            );
            let mut backoff = make_backoff();
            let completion = retry::send_with_retry(
                &*transport,
                &body,
                max_attempts,
                &mut *backoff,
            )
            .await?;
            if let Some(usage) = &completion.usage {
                debug!(
                    "token usage: prompt {}, completion {}, total {}",
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    usage.total_tokens
                );
            }
            Ok(completion)
        }
        .instrument(trace_span!("openai request"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use backoff::backoff::Constant;
    use pg_chat_model::{FunctionSpec, Message};
    use serde_json::{Value, json};

    use super::*;

    /// Records every body it receives and replies from a queue.
    struct RecordingTransport {
        bodies: Mutex<Vec<Value>>,
        replies: Mutex<Vec<Result<ChatCompletion, TransportError>>>,
    }

    impl Transport for RecordingTransport {
        fn post(
            &self,
            body: &Value,
        ) -> impl Future<Output = Result<ChatCompletion, TransportError>> + Send
        {
            self.bodies.lock().unwrap().push(body.clone());
            let reply = self.replies.lock().unwrap().remove(0);
            std::future::ready(reply)
        }
    }

    fn provider(
        replies: Vec<Result<ChatCompletion, TransportError>>,
    ) -> OpenAIProvider<RecordingTransport> {
        let transport = RecordingTransport {
            bodies: Default::default(),
            replies: Mutex::new(replies),
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("gpt-test")
            .build();
        OpenAIProvider::with_transport(transport, config)
            .with_backoff(|| Constant::new(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_retries_with_the_same_payload() {
        let provider = provider(vec![
            Err(TransportError::new("timed out")),
            Err(TransportError::new("HTTP status server error (502)")),
            Ok(ChatCompletion::with_message(Message::assistant("42"))),
        ]);
        let req = ChatRequest {
            messages: vec![Message::user("What is the answer?")],
            functions: vec![FunctionSpec {
                name: "ask_postgres_database".to_owned(),
                description: "Runs a query.".to_owned(),
                parameters: json!({ "type": "object" }),
            }],
            function_call: None,
        };

        let completion = provider.send_request(&req).await.unwrap();
        let message = completion.into_first_message().unwrap();
        assert_eq!(message.content.as_deref(), Some("42"));

        let bodies = provider.transport.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 3);
        assert!(bodies.iter().all(|body| body == &bodies[0]));
        assert_eq!(bodies[0]["model"], "gpt-test");
        assert_eq!(bodies[0]["functions"][0]["name"], "ask_postgres_database");
        assert!(bodies[0].get("function_call").is_none());
    }

    #[tokio::test]
    async fn test_connection_error_after_budget() {
        let provider = provider(vec![
            Err(TransportError::new("dns error")),
            Err(TransportError::new("dns error")),
            Err(TransportError::new("connection refused")),
            Ok(ChatCompletion::with_message(Message::assistant("too late"))),
        ]);
        let req = ChatRequest {
            messages: vec![Message::user("Hi")],
            ..Default::default()
        };

        let err = provider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.attempts(), 3);
        assert_eq!(
            err.to_string(),
            "Failed to connect to OpenAI API due to: connection refused"
        );
        assert_eq!(provider.transport.bodies.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_every_failure_is_a_connection_error() {
        let provider = provider(vec![
            Err(TransportError::new("HTTP status client error (401)")),
            Err(TransportError::new("error decoding response body")),
            Err(TransportError::new("HTTP status server error (503)")),
        ]);
        let req = ChatRequest {
            messages: vec![Message::user("Hi")],
            ..Default::default()
        };

        let err = provider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.message().starts_with("Failed to connect to OpenAI API"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let provider = OpenAIProvider::new(
            OpenAIConfigBuilder::with_api_key("sk-secret").build(),
        );
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }
}
