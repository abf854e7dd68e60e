//! Types shared by the chat client, the function dispatcher and the model
//! providers.
//!
//! The types here mirror the wire format of OpenAI-compatible chat
//! completion APIs with function calling, so they can be serialized into
//! request payloads and deserialized from responses as they are.
//!
//! Types in this crate don't define any behavior except for small helpers,
//! instead they are the constraints that the provider implementors should
//! adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
