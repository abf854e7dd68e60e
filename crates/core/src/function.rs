//! Function call supports.
//!
//! The model may answer with a function call instead of text. The
//! [`Dispatcher`] looks the function up by name and runs it with the
//! arguments the model generated. A name that is not registered is not an
//! error: the dispatcher returns a message starting with `"Error:"`, which
//! is meant to be fed back to the model as the function result.

mod database;
mod dispatcher;
mod error;

use std::pin::Pin;

use pg_chat_model::FunctionSpec;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use database::{
    AskPostgresDatabase, AskPostgresDatabaseInput, QueryExecutor, Row,
};
pub use dispatcher::Dispatcher;
pub use error::{Error, ErrorKind};

/// The result of a function call.
pub type FunctionResult = Result<String, Error>;

/// The future returned by [`Dispatcher::dispatch`].
pub type BoxedFunctionFuture =
    Pin<Box<dyn Future<Output = FunctionResult> + Send>>;

/// The prefix of the outputs that report a failed call by convention.
pub const ERROR_OUTPUT_PREFIX: &str = "Error:";

/// Returns `true` if a function output reports an error by the `"Error:"`
/// prefix convention, e.g. a call to an unknown function.
#[inline]
pub fn is_error_output(output: &str) -> bool {
    output.starts_with(ERROR_OUTPUT_PREFIX)
}

/// A function that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain
/// any internal state. Shared resources, like a database pool, should be
/// held behind a handle that can be cloned into the returned future.
pub trait Function: Send + Sync + 'static {
    /// The type of input that the function accepts, decoded from the JSON
    /// arguments.
    type Input: DeserializeOwned;

    /// Returns the name of the function.
    fn name(&self) -> &str;

    /// Returns the description of the function.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the function.
    fn parameter_schema(&self) -> &Value;

    /// Executes the function with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = FunctionResult> + Send + 'static;
}

pub(crate) trait FunctionObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn definition(&self) -> FunctionSpec;

    fn execute(&self, arguments: &str) -> BoxedFunctionFuture;
}

pub(crate) struct AnyFunction<F: Function>(pub F);

impl<F: Function> FunctionObject for AnyFunction<F> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn definition(&self) -> FunctionSpec {
        FunctionSpec {
            name: self.0.name().to_owned(),
            description: self.0.description().to_owned(),
            parameters: self.0.parameter_schema().clone(),
        }
    }

    fn execute(&self, arguments: &str) -> BoxedFunctionFuture {
        let input: F::Input = match serde_json::from_str(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(FunctionResult::Err(
                    Error::malformed_arguments().with_reason(reason),
                )));
            }
        };
        Box::pin(self.0.execute(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_error_output() {
        assert!(is_error_output("Error: function foo does not exist"));
        assert!(!is_error_output(r#"[{"error":"not a prefix"}]"#));
        assert!(!is_error_output(""));
    }
}
