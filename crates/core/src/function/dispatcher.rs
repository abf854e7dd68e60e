use std::collections::HashMap;

use pg_chat_model::{FunctionCall, FunctionSpec, Message};

use crate::function::{
    AnyFunction, BoxedFunctionFuture, ERROR_OUTPUT_PREFIX, Function,
    FunctionObject, FunctionResult,
};

/// Dispatches function calls from the model to registered functions.
///
/// Functions are registered while building the dispatcher, the table is
/// fixed afterwards.
#[derive(Default)]
pub struct Dispatcher {
    functions: HashMap<String, Box<dyn FunctionObject>>,
}

impl Dispatcher {
    /// Registers a function. A function with the same name is replaced.
    pub fn with_function<F: Function>(mut self, function: F) -> Self {
        let name = function.name().to_owned();
        if self
            .functions
            .insert(name.clone(), Box::new(AnyFunction(function)))
            .is_some()
        {
            warn!("function registered twice: {name}");
        }
        self
    }

    /// Returns `true` if no function is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Returns the definitions to advertise to the model, sorted by name.
    pub fn definitions(&self) -> Vec<FunctionSpec> {
        let mut definitions: Vec<_> = self
            .functions
            .values()
            .map(|function| function.definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Runs the function named by `call`.
    ///
    /// An unknown name yields `Ok` with an output starting with `"Error:"`,
    /// and nothing is invoked. Arguments that cannot be decoded into the
    /// function's input fail with [`ErrorKind::MalformedArguments`].
    ///
    /// [`ErrorKind::MalformedArguments`]: crate::function::ErrorKind::MalformedArguments
    pub fn dispatch(&self, call: &FunctionCall) -> BoxedFunctionFuture {
        let span = debug_span!("function dispatcher", name = %call.name);
        let _enter = span.enter();

        let Some(function) = self.functions.get(&call.name) else {
            warn!("function not found: {}", call.name);
            let output = format!(
                "{ERROR_OUTPUT_PREFIX} function {} does not exist",
                call.name
            );
            return Box::pin(std::future::ready(FunctionResult::Ok(output)));
        };

        trace!("calling {} with args: {}", function.name(), call.arguments);
        function.execute(&call.arguments)
    }

    /// Runs the function call carried by `message`, or returns `None` if
    /// the message has no function call.
    #[inline]
    pub fn dispatch_message(
        &self,
        message: &Message,
    ) -> Option<BoxedFunctionFuture> {
        message.function_call.as_ref().map(|call| self.dispatch(call))
    }
}
