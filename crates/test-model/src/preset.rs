use pg_chat_model::FunctionCall;
use serde::{Deserialize, Serialize};

/// What the model replies in a preset step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    #[serde(rename = "content")]
    Content(String),
    #[serde(rename = "function_call")]
    FunctionCall(FunctionCall),
}

/// The preset response for an assistant step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// The reply of this step.
    pub reply: PresetReply,
    /// If set, the request will fail in the first `failure` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` that replies with plain text.
    #[inline]
    pub fn with_content<S: Into<String>>(content: S) -> Self {
        Self {
            reply: PresetReply::Content(content.into()),
            failures: None,
        }
    }

    /// Creates a `PresetResponse` that requests a function call.
    #[inline]
    pub fn with_function_call<N: Into<String>, A: Into<String>>(
        name: N,
        arguments: A,
    ) -> Self {
        Self {
            reply: PresetReply::FunctionCall(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
            failures: None,
        }
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}
