use pg_chat_model::{ChatProvider, FunctionCall, FunctionCallDirective, Message};

use super::{Chat, FunctionCallCallback};
use crate::conversation::Conversation;
use crate::function::{Dispatcher, Function};

const DEFAULT_MAX_FUNCTION_ROUNDS: usize = 5;

/// [`Chat`] builder.
pub struct ChatBuilder<P> {
    provider: P,
    system_prompt: Option<String>,
    dispatcher: Dispatcher,
    function_call: Option<FunctionCallDirective>,
    max_function_rounds: usize,
    on_function_call: Option<FunctionCallCallback>,
}

impl<P: ChatProvider> ChatBuilder<P> {
    /// Creates a new builder with the specified chat provider.
    #[inline]
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            system_prompt: None,
            dispatcher: Dispatcher::default(),
            function_call: None,
            max_function_rounds: DEFAULT_MAX_FUNCTION_ROUNDS,
            on_function_call: None,
        }
    }

    /// Sets the system prompt, the first message of the conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a function the model may call.
    #[inline]
    pub fn with_function<F: Function>(mut self, function: F) -> Self {
        self.dispatcher = self.dispatcher.with_function(function);
        self
    }

    /// Sets the function call directive sent with every request. By default
    /// no directive is sent and the provider decides.
    #[inline]
    pub fn with_function_call(mut self, directive: FunctionCallDirective) -> Self {
        self.function_call = Some(directive);
        self
    }

    /// Sets how many function calls in a row one user message may lead to.
    #[inline]
    pub fn with_max_function_rounds(mut self, rounds: usize) -> Self {
        self.max_function_rounds = rounds;
        self
    }

    /// Attaches a callback to be invoked before a function call runs.
    #[inline]
    pub fn on_function_call(
        mut self,
        on_function_call: impl Fn(&FunctionCall) + Send + Sync + 'static,
    ) -> Self {
        self.on_function_call = Some(Box::new(on_function_call));
        self
    }

    /// Builds the chat.
    pub fn build(self) -> Chat<P> {
        let mut conversation = Conversation::default();
        if let Some(prompt) = self.system_prompt {
            conversation.push(Message::system(prompt));
        }
        Chat {
            provider: self.provider,
            dispatcher: self.dispatcher,
            conversation,
            function_call: self.function_call,
            max_function_rounds: self.max_function_rounds,
            on_function_call: self.on_function_call,
        }
    }
}
