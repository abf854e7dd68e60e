use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to be sent to the chat provider.
///
/// The model identifier and credentials are not part of the request, they
/// belong to the provider's configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatRequest {
    /// The conversation history, in chronological order.
    pub messages: Vec<Message>,
    /// Functions that are available to the model. An empty list means no
    /// functions are advertised.
    pub functions: Vec<FunctionSpec>,
    /// Controls whether and which function the model should call.
    pub function_call: Option<FunctionCallDirective>,
}

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system instructions.
    System,
    /// The user input.
    User,
    /// The model.
    Assistant,
    /// The result of a function call.
    Function,
}

/// A message in the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The author of this message.
    pub role: Role,
    /// The text of this message. It can be `None` when the message carries
    /// a function call instead.
    pub content: Option<String>,
    /// For `function` messages, the name of the function that produced the
    /// content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The function call requested by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::with_content(Role::System, content.into())
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::with_content(Role::User, content.into())
    }

    /// Creates an assistant message with plain text.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::with_content(Role::Assistant, content.into())
    }

    /// Creates an assistant message that requests a function call.
    #[inline]
    pub fn assistant_function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            name: None,
            function_call: Some(call),
        }
    }

    /// Creates a message that carries the result of calling the function
    /// `name`.
    #[inline]
    pub fn function_result<N: Into<String>, S: Into<String>>(
        name: N,
        content: S,
    ) -> Self {
        Self {
            role: Role::Function,
            content: Some(content.into()),
            name: Some(name.into()),
            function_call: None,
        }
    }

    fn with_content(role: Role, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            name: None,
            function_call: None,
        }
    }
}

/// Describes a function that can be called by the model.
///
/// This is passed verbatim to the provider and never executed locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Name of the function.
    pub name: String,
    /// Description of the function.
    pub description: String,
    /// Parameters definition of the function, typically a
    /// [JSON schema](https://json-schema.org/) object.
    pub parameters: Value,
}

/// A function call requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionCall {
    /// The name of the function to call.
    pub name: String,
    /// The arguments to call the function with, as JSON-encoded text.
    ///
    /// The model generates this text, so it is not guaranteed to be valid
    /// JSON.
    pub arguments: String,
}

/// Selects how the model picks a function to call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionCallDirective {
    /// Either `"none"` or `"auto"`.
    Mode(FunctionCallMode),
    /// Forces the model to call the named function.
    Named {
        /// The function name.
        name: String,
    },
}

impl FunctionCallDirective {
    /// The model must not call any function.
    #[inline]
    pub fn none() -> Self {
        Self::Mode(FunctionCallMode::None)
    }

    /// The model decides whether to call a function.
    #[inline]
    pub fn auto() -> Self {
        Self::Mode(FunctionCallMode::Auto)
    }

    /// The model must call the function `name`.
    #[inline]
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self::Named { name: name.into() }
    }
}

/// The string form of [`FunctionCallDirective`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCallMode {
    /// See [`FunctionCallDirective::none`].
    None,
    /// See [`FunctionCallDirective::auto`].
    Auto,
}
