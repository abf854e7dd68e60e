use pg_chat_core::function::{AskPostgresDatabase, QueryExecutor};
use pg_chat_core::{Chat, ChatBuilder, Error};
use pg_chat_model::{ChatProvider, FunctionCall, FunctionCallDirective};

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder<P> {
    chat_builder: ChatBuilder<P>,
    schema: Option<String>,
}

impl<P: ChatProvider> SessionBuilder<P> {
    /// Creates a session builder with a specified chat provider.
    pub fn with_provider(provider: P) -> Self {
        let chat_builder = ChatBuilder::with_provider(provider)
            .with_function_call(FunctionCallDirective::auto());
        Self {
            chat_builder,
            schema: None,
        }
    }

    /// Sets the system prompt for the chat.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.chat_builder = self.chat_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the schema description shown to the model, see
    /// [`crate::PgQueryExecutor::describe_schema`].
    #[inline]
    pub fn with_schema<S: Into<String>>(mut self, schema: S) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Attaches a callback to be invoked before a function call runs.
    #[inline]
    pub fn on_function_call(
        mut self,
        on_function_call: impl Fn(&FunctionCall) + Send + Sync + 'static,
    ) -> Self {
        self.chat_builder = self.chat_builder.on_function_call(on_function_call);
        self
    }

    /// Builds a new session that queries the database through `executor`.
    pub fn build<Q: QueryExecutor>(self, executor: Q) -> Session<P> {
        let mut function = AskPostgresDatabase::new(executor);
        if let Some(schema) = self.schema {
            function = function.with_description(format!(
                "Use this function to answer user questions about the \
                 database. Output should be a fully formed PostgreSQL query.\n\
                 The database has the following tables:\n{schema}"
            ));
        }
        let chat = self.chat_builder.with_function(function).build();

        Session { chat }
    }
}

/// A chat session about one database.
///
/// The session holds a fully configured chat that you can use directly, and
/// it is basically a wrapper around [`Chat`].
pub struct Session<P> {
    chat: Chat<P>,
}

impl<P: ChatProvider> Session<P> {
    /// Sends a message to the session and returns the reply.
    #[inline]
    pub async fn send_message(&mut self, message: &str) -> Result<String, Error> {
        self.chat.send_message(message).await
    }

    /// Returns the underlying chat.
    #[inline]
    pub fn chat(&self) -> &Chat<P> {
        &self.chat
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::future::ready;

    use pg_chat_core::function::Row;
    use pg_chat_model::Role;
    use pg_chat_test_model::{PresetResponse, TestChatProvider};
    use serde_json::json;

    use super::*;

    struct OneRowExecutor;

    impl QueryExecutor for OneRowExecutor {
        type Error = Infallible;

        fn execute_query(
            &self,
            _query: &str,
        ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send {
            let mut row = Row::new();
            row.insert("name".to_owned(), json!("Alice"));
            ready(Ok(vec![row]))
        }
    }

    #[tokio::test]
    async fn test_session_answers_with_query() {
        let mut provider = TestChatProvider::default();
        provider.add_response_step(PresetResponse::with_function_call(
            "ask_postgres_database",
            r#"{"query": "SELECT name FROM users LIMIT 1"}"#,
        ));
        provider.add_response_step(PresetResponse::with_content("Alice."));

        let mut session = SessionBuilder::with_provider(provider.clone())
            .with_system_prompt("Answer questions about the database.")
            .with_schema("Table: users\nColumns: id, name")
            .build(OneRowExecutor);
        let reply = session.send_message("Who is the first user?").await;
        assert_eq!(reply.unwrap(), "Alice.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].function_call,
            Some(FunctionCallDirective::auto())
        );
        let function = &requests[0].functions[0];
        assert_eq!(function.name, "ask_postgres_database");
        assert!(function.description.ends_with("Columns: id, name"));

        let result = requests[1].messages.last().unwrap();
        assert_eq!(result.role, Role::Function);
        assert_eq!(result.content.as_deref(), Some(r#"[{"name":"Alice"}]"#));
        assert_eq!(session.chat().conversation().messages().len(), 5);
    }
}
