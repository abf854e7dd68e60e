use serde::{Deserialize, Serialize};

use crate::request::Message;

/// A reply from the chat completion endpoint.
///
/// Only the parts this crate cares about are decoded, unknown fields are
/// ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// The identifier assigned by the provider.
    #[serde(default)]
    pub id: Option<String>,
    /// The model that generated the reply.
    #[serde(default)]
    pub model: Option<String>,
    /// The generated choices.
    pub choices: Vec<Choice>,
    /// Token usage reported by the provider.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Creates a completion with a single choice holding `message`.
    pub fn with_message(message: Message) -> Self {
        Self {
            id: None,
            model: None,
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: None,
            }],
            usage: None,
        }
    }

    /// Returns the message of the first choice, if any.
    #[inline]
    pub fn first_message(&self) -> Option<&Message> {
        self.choices.first().map(|choice| &choice.message)
    }

    /// Takes the message of the first choice, if any.
    #[inline]
    pub fn into_first_message(self) -> Option<Message> {
        self.choices.into_iter().next().map(|choice| choice.message)
    }
}

/// A generated choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// The index of this choice.
    #[serde(default)]
    pub index: u32,
    /// The generated message.
    pub message: Message,
    /// Why the model stopped, e.g. `"stop"` or `"function_call"`.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token counts of a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens in the generated reply.
    #[serde(default)]
    pub completion_tokens: u64,
    /// The sum of both.
    #[serde(default)]
    pub total_tokens: u64,
}
