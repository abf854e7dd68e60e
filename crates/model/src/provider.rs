use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ChatRequest;
use crate::response::ChatCompletion;

/// The error type for a chat provider.
pub trait ChatProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a chat provider, which sends a conversation to
/// the model and returns its reply.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the provider should be prepared for being dropped anytime.
pub trait ChatProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ChatProviderError;

    /// Sends a request to the model.
    ///
    /// Implementations handle their own retries. An error returned from
    /// this method is final for the request.
    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatCompletion, Self::Error>> + Send + 'static;
}
