use std::error::Error as StdError;
use std::sync::Arc;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::function::{Error, Function, FunctionResult};

/// A row returned by a query, keyed by column name.
pub type Row = Map<String, Value>;

/// Runs SQL queries on behalf of [`AskPostgresDatabase`].
///
/// How connections are opened, pooled or locked is up to the
/// implementation.
pub trait QueryExecutor: Send + Sync + 'static {
    /// The error type returned when a query fails.
    type Error: StdError + Send + Sync + 'static;

    /// Runs `query` and returns all rows it produced.
    fn execute_query(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send;
}

/// The input of [`AskPostgresDatabase`].
#[derive(Deserialize, JsonSchema)]
pub struct AskPostgresDatabaseInput {
    #[schemars(description = "SQL query extracting info to answer the \
                              user's question. SQL should be written using \
                              the database schema. The query should be \
                              returned in plain text, not in JSON.")]
    query: String,
}

const DEFAULT_DESCRIPTION: &str = "\
Use this function to answer user questions about the database. \
Output should be a fully formed PostgreSQL query.";

/// The `ask_postgres_database` function, which lets the model query the
/// database.
///
/// The output is the rows produced by the query, rendered as a JSON array.
pub struct AskPostgresDatabase<Q> {
    executor: Arc<Q>,
    description: String,
    parameter_schema: Value,
}

impl<Q: QueryExecutor> AskPostgresDatabase<Q> {
    /// The name the model calls this function by.
    pub const NAME: &'static str = "ask_postgres_database";

    /// Creates the function with its own executor.
    #[inline]
    pub fn new(executor: Q) -> Self {
        Self::with_shared(Arc::new(executor))
    }

    /// Creates the function with an executor shared with the caller.
    pub fn with_shared(executor: Arc<Q>) -> Self {
        Self {
            executor,
            description: DEFAULT_DESCRIPTION.to_owned(),
            parameter_schema: schema_for!(AskPostgresDatabaseInput).to_value(),
        }
    }

    /// Replaces the description, e.g. to tell the model what the database
    /// schema looks like.
    #[inline]
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

impl<Q: QueryExecutor> Function for AskPostgresDatabase<Q> {
    type Input = AskPostgresDatabaseInput;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: AskPostgresDatabaseInput,
    ) -> impl Future<Output = FunctionResult> + Send + 'static {
        let executor = Arc::clone(&self.executor);
        async move {
            debug!("SQL query: {}", input.query);
            let rows = executor.execute_query(&input.query).await.map_err(
                |err| Error::execution_failed().with_reason(format!("{err}")),
            )?;
            let output = serde_json::to_string(&rows).map_err(|err| {
                Error::execution_failed().with_reason(format!("{err}"))
            })?;
            trace!("query returned {} row(s): {output}", rows.len());
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::io;

    use serde_json::json;

    use super::*;
    use crate::function::ErrorKind;

    struct FailingExecutor;

    impl QueryExecutor for FailingExecutor {
        type Error = io::Error;

        fn execute_query(
            &self,
            _query: &str,
        ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send {
            ready(Err(io::Error::other(
                r#"relation "userz" does not exist"#,
            )))
        }
    }

    struct FixedExecutor(Vec<Row>);

    impl QueryExecutor for FixedExecutor {
        type Error = io::Error;

        fn execute_query(
            &self,
            _query: &str,
        ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send {
            ready(Ok(self.0.clone()))
        }
    }

    fn input(query: &str) -> AskPostgresDatabaseInput {
        AskPostgresDatabaseInput {
            query: query.to_owned(),
        }
    }

    #[test]
    fn test_parameter_schema() {
        let function = AskPostgresDatabase::new(FailingExecutor);
        let schema = function.parameter_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_description() {
        let function = AskPostgresDatabase::new(FailingExecutor)
            .with_description("Tables: users(id, name)");
        assert_eq!(function.name(), "ask_postgres_database");
        assert_eq!(function.description(), "Tables: users(id, name)");
    }

    #[tokio::test]
    async fn test_rows_as_json() {
        let rows: Vec<Row> = serde_json::from_value(json!([
            { "id": 1, "name": "Ada" },
            { "id": 2, "name": null }
        ]))
        .unwrap();
        let function = AskPostgresDatabase::new(FixedExecutor(rows.clone()));

        let output = function.execute(input("SELECT * FROM users")).await;
        let decoded: Vec<Row> = serde_json::from_str(&output.unwrap()).unwrap();
        assert_eq!(decoded, rows);
    }

    #[tokio::test]
    async fn test_executor_error() {
        let function = AskPostgresDatabase::new(FailingExecutor);

        let err = function
            .execute(input("SELECT * FROM userz"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
        assert_eq!(err.reason(), r#"relation "userz" does not exist"#);
    }
}
