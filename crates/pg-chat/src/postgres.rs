use pg_chat_core::function::{QueryExecutor, Row};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, PgValueRef, Postgres};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column, Decode, Row as _, TypeInfo, ValueRef};

const MAX_CONNECTIONS: u32 = 5;

const SCHEMA_QUERY: &str = "\
SELECT table_name::text, column_name::text FROM information_schema.columns \
WHERE table_schema = 'public' \
ORDER BY table_name, ordinal_position";

/// A [`QueryExecutor`] backed by a PostgreSQL connection pool.
#[derive(Clone, Debug)]
pub struct PgQueryExecutor {
    pool: PgPool,
}

impl PgQueryExecutor {
    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await?;
        Ok(Self::with_pool(pool))
    }

    /// Creates an executor over an existing pool.
    #[inline]
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Describes the tables and columns of the `public` schema, one table
    /// per line.
    pub async fn describe_schema(&self) -> Result<String, sqlx::Error> {
        let columns: Vec<(String, String)> =
            sqlx::query_as(SCHEMA_QUERY).fetch_all(&self.pool).await?;
        Ok(format_schema(&columns))
    }
}

impl QueryExecutor for PgQueryExecutor {
    type Error = sqlx::Error;

    fn execute_query(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send {
        let pool = self.pool.clone();
        let query = query.to_owned();
        async move {
            let rows = sqlx::query(&query).fetch_all(&pool).await?;
            trace!("query returned {} row(s)", rows.len());
            rows.iter().map(decode_row).collect()
        }
    }
}

/// Formats `(table, column)` pairs grouped by table, e.g.
/// `Table: users\nColumns: id, name`.
fn format_schema(columns: &[(String, String)]) -> String {
    let mut tables: Vec<(&str, Vec<&str>)> = Vec::new();
    for (table, column) in columns {
        match tables.last_mut() {
            Some((last, names)) if *last == table.as_str() => {
                names.push(column.as_str())
            }
            _ => tables.push((table.as_str(), vec![column.as_str()])),
        }
    }
    tables
        .iter()
        .map(|(table, names)| {
            format!("Table: {table}\nColumns: {}", names.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::new();
    for col in row.columns() {
        let field = col.name();
        let raw_value = row.try_get_raw(col.ordinal())?;
        let value = if raw_value.is_null() {
            Value::Null
        } else {
            decode_value(field, col.type_info().name(), raw_value)?
        };
        map.insert(field.to_owned(), value);
    }
    Ok(map)
}

/// How a column is turned into JSON, chosen by its type name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    TimestampTz,
    Timestamp,
    Date,
    Time,
    Uuid,
    Json,
    Text,
    Bytea,
    Int4Array,
    Int8Array,
    TextArray,
    UuidArray,
    // Rendered as `"<TYPE>"`.
    Unsupported,
}

impl ColumnKind {
    fn of(type_name: &str) -> Self {
        match type_name {
            "BOOL" => Self::Bool,
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "NUMERIC" => Self::Numeric,
            "TIMESTAMPTZ" => Self::TimestampTz,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "UUID" => Self::Uuid,
            "JSON" | "JSONB" => Self::Json,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" | "CITEXT" => {
                Self::Text
            }
            "BYTEA" => Self::Bytea,
            "INT4[]" => Self::Int4Array,
            "INT8[]" => Self::Int8Array,
            "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => Self::TextArray,
            "UUID[]" => Self::UuidArray,
            _ => Self::Unsupported,
        }
    }
}

fn decode_value(
    field: &str,
    type_name: &str,
    raw_value: PgValueRef<'_>,
) -> Result<Value, sqlx::Error> {
    let value = match ColumnKind::of(type_name) {
        ColumnKind::Bool => decode_raw::<bool>(field, raw_value)?.into(),
        ColumnKind::Int2 => decode_raw::<i16>(field, raw_value)?.into(),
        ColumnKind::Int4 => decode_raw::<i32>(field, raw_value)?.into(),
        ColumnKind::Int8 => decode_raw::<i64>(field, raw_value)?.into(),
        ColumnKind::Float4 => decode_raw::<f32>(field, raw_value)?.into(),
        ColumnKind::Float8 => decode_raw::<f64>(field, raw_value)?.into(),
        ColumnKind::Numeric => {
            decode_raw::<Decimal>(field, raw_value)?.to_string().into()
        }
        ColumnKind::TimestampTz => decode_raw::<DateTime<Utc>>(field, raw_value)?
            .to_rfc3339()
            .into(),
        ColumnKind::Timestamp => decode_raw::<NaiveDateTime>(field, raw_value)?
            .to_string()
            .into(),
        ColumnKind::Date => {
            decode_raw::<NaiveDate>(field, raw_value)?.to_string().into()
        }
        ColumnKind::Time => {
            decode_raw::<NaiveTime>(field, raw_value)?.to_string().into()
        }
        ColumnKind::Uuid => {
            decode_raw::<Uuid>(field, raw_value)?.to_string().into()
        }
        ColumnKind::Json => decode_raw::<Value>(field, raw_value)?,
        ColumnKind::Text => decode_raw::<String>(field, raw_value)?.into(),
        ColumnKind::Bytea => decode_raw::<Vec<u8>>(field, raw_value)?.into(),
        ColumnKind::Int4Array => decode_raw::<Vec<i32>>(field, raw_value)?.into(),
        ColumnKind::Int8Array => decode_raw::<Vec<i64>>(field, raw_value)?.into(),
        ColumnKind::TextArray => {
            decode_raw::<Vec<String>>(field, raw_value)?.into()
        }
        ColumnKind::UuidArray => decode_raw::<Vec<Uuid>>(field, raw_value)?
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .into(),
        ColumnKind::Unsupported => {
            debug!("column `{field}` has unsupported type {type_name}");
            format!("<{type_name}>").into()
        }
    };
    Ok(value)
}

fn decode_raw<'r, T: Decode<'r, Postgres>>(
    field: &str,
    raw_value: PgValueRef<'r>,
) -> Result<T, sqlx::Error> {
    T::decode(raw_value).map_err(|source| sqlx::Error::ColumnDecode {
        index: format!("{field:?}"),
        source,
    })
}
