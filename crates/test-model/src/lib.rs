//! A local fake chat provider for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pg_chat_model::{
    ChatCompletion, ChatProvider, ChatProviderError, ChatRequest, ErrorKind,
    Message,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ChatProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct ScriptState {
    step_idx: usize,
    failed_times: u64,
    requests: Vec<ChatRequest>,
}

/// A local fake chat provider for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to each request, in order. Every request
/// consumes one step once it succeeds. If there are no enough steps in the
/// script, an error will be returned.
///
/// Clones share the script position and the recorded requests.
///
/// # Note
///
/// This type is not optimized for production use, every request is copied
/// for later inspection. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestChatProvider {
    script: Vec<PresetResponse>,
    state: Arc<Mutex<ScriptState>>,
    delay: Option<Duration>,
}

impl TestChatProvider {
    #[inline]
    pub fn add_response_step(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Sets how long every request takes, 1ms by default.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, including failed ones.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock_state().requests.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        // A test that panicked while holding the lock has failed already.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn next_result(&self, req: &ChatRequest) -> Result<ChatCompletion, Error> {
        let mut state = self.lock_state();
        state.requests.push(req.clone());

        let Some(step) = self.script.get(state.step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };

        match step.failures {
            Some(0) => {
                return Err(Error {
                    message: "scripted failure",
                    kind: ErrorKind::Connection,
                });
            }
            Some(failures) if state.failed_times < failures => {
                state.failed_times += 1;
                return Err(Error {
                    message: "scripted failure",
                    kind: ErrorKind::Connection,
                });
            }
            _ => {}
        }

        state.step_idx += 1;
        state.failed_times = 0;
        let message = match &step.reply {
            PresetReply::Content(content) => Message::assistant(content.clone()),
            PresetReply::FunctionCall(call) => {
                Message::assistant_function_call(call.clone())
            }
        };
        Ok(ChatCompletion::with_message(message))
    }
}

impl ChatProvider for TestChatProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatCompletion, Self::Error>> + Send + 'static
    {
        let result = self.next_result(req);
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        async move {
            sleep(delay).await;
            result
        }
    }
}
