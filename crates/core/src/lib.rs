//! Function dispatching and the conversation loop built on top of a chat
//! provider.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod chat;
pub mod conversation;
pub mod function;

pub use chat::{Chat, ChatBuilder, Error};
pub use function::{Dispatcher, Function};
