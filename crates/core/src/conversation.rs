//! Conversation-related types.

use pg_chat_model::Message;

/// Represents a conversation, the messages in chronological order.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    pub(crate) messages: Vec<Message>,
}

impl Conversation {
    /// Returns the messages of this conversation.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the transcript of the conversation, the text of every message
    /// that has any, prefixed with its role.
    ///
    /// The transcript can be exported later, but it alone is not enough to
    /// reconstruct the conversation.
    pub fn transcript(&self) -> String {
        let mut transcript = String::new();
        for msg in &self.messages {
            let Some(content) = msg.content.as_deref() else {
                continue;
            };
            let role = serde_json::to_value(msg.role)
                .ok()
                .and_then(|role| role.as_str().map(str::to_owned))
                .unwrap_or_default();
            transcript.push_str(&format!("{role}: {content}\n"));
        }
        transcript
    }

    #[inline]
    pub(crate) fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }
}
