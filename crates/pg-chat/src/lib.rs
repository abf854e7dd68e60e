//! An out-of-the-box chat that answers questions about a PostgreSQL
//! database.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to put a database-aware chat into your own apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod postgres;
mod session;
mod settings;

pub use postgres::PgQueryExecutor;
pub use session::{Session, SessionBuilder};
pub use settings::{Settings, SettingsError};

/// Re-exports of [`pg_chat_core`] crate.
pub mod core {
    pub use pg_chat_core::*;
}
