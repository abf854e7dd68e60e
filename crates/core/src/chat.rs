mod builder;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

use pg_chat_model::{
    ChatProvider, ChatProviderError, ChatRequest, FunctionCall,
    FunctionCallDirective, Message,
};
use tracing::Instrument;

pub use builder::ChatBuilder;

use crate::conversation::Conversation;
use crate::function::{self, Dispatcher};

type FunctionCallCallback = Box<dyn Fn(&FunctionCall) + Send + Sync>;

/// A chat with the model, which maintains the conversation, the provider
/// and the functions the model may call.
///
/// Every user message is sent together with the history. When the model
/// answers with a function call, the function runs and its output is sent
/// back to the model as a `function` message, until the model answers with
/// text.
pub struct Chat<P> {
    provider: P,
    dispatcher: Dispatcher,
    conversation: Conversation,
    function_call: Option<FunctionCallDirective>,
    max_function_rounds: usize,
    on_function_call: Option<FunctionCallCallback>,
}

impl<P: ChatProvider> Chat<P> {
    /// Sends a user message and returns the text the model finally answers
    /// with. A reply without any text yields an empty string.
    ///
    /// On failure the messages appended so far stay in the conversation. A
    /// function call that failed is answered with an `"Error:"` result, so
    /// the conversation can go on with the next message.
    pub async fn send_message<S: Into<String>>(
        &mut self,
        input: S,
    ) -> Result<String, Error> {
        self.conversation.push(Message::user(input));

        let mut rounds = 0;
        loop {
            let message = self
                .request_reply()
                .instrument(debug_span!("chat request", rounds))
                .await?;
            let content = message.content.clone().unwrap_or_default();
            let function_call = message.function_call.clone();
            self.conversation.push(message);

            let Some(call) = function_call else {
                return Ok(content);
            };

            rounds += 1;
            if rounds > self.max_function_rounds {
                warn!("model keeps calling functions, stopped at {}", call.name);
                let err = Error::TooManyFunctionCalls(self.max_function_rounds);
                self.push_function_error(call.name, &err);
                return Err(err);
            }

            if let Some(on_function_call) = &self.on_function_call {
                on_function_call(&call);
            }
            let output = match self.dispatcher.dispatch(&call).await {
                Ok(output) => output,
                Err(err) => {
                    let err = Error::Function(err);
                    self.push_function_error(call.name, &err);
                    return Err(err);
                }
            };
            if function::is_error_output(&output) {
                warn!("function call reported an error: {output}");
            }
            self.conversation
                .push(Message::function_result(call.name, output));
        }
    }

    /// Answers a function call that did not run, so that every call in the
    /// history is followed by its result.
    fn push_function_error(&mut self, name: String, err: &Error) {
        let output = format!("{} {err}", function::ERROR_OUTPUT_PREFIX);
        self.conversation.push(Message::function_result(name, output));
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    async fn request_reply(&self) -> Result<Message, Error> {
        let request = self.build_request();
        trace!("got a request: {request:?}");
        let completion =
            self.provider.send_request(&request).await.map_err(|err| {
                error!("got an error: {err:?}");
                Error::Provider(Box::new(err))
            })?;
        completion.into_first_message().ok_or(Error::EmptyResponse)
    }

    fn build_request(&self) -> ChatRequest {
        ChatRequest {
            messages: self.conversation.messages.clone(),
            functions: self.dispatcher.definitions(),
            function_call: self.function_call.clone(),
        }
    }
}

impl<P> Debug for Chat<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chat")
            .field("conversation", &self.conversation)
            .field("function_call", &self.function_call)
            .field("max_function_rounds", &self.max_function_rounds)
            .finish_non_exhaustive()
    }
}

/// Errors of [`Chat::send_message`].
#[derive(Debug)]
pub enum Error {
    /// The provider failed, e.g. it could not be reached after all
    /// attempts.
    Provider(Box<dyn ChatProviderError>),
    /// The provider replied without any choice.
    EmptyResponse,
    /// A function call failed.
    Function(function::Error),
    /// The model called more functions in a row than allowed.
    TooManyFunctionCalls(usize),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Provider(err) => write!(f, "{err}"),
            Error::EmptyResponse => write!(f, "the model replied with nothing"),
            Error::Function(err) => write!(f, "{err}"),
            Error::TooManyFunctionCalls(max) => {
                write!(f, "the model called more than {max} functions in a row")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Provider(err) => {
                let err: &(dyn StdError + 'static) = &**err;
                Some(err)
            }
            Error::Function(err) => Some(err),
            _ => None,
        }
    }
}
