//! Typed ID wrappers.
//!
//! IDs are opaque String wrappers (serde-transparent). Callers may supply
//! their own values (AG-UI clients send thread and run ids); the gateway only
//! generates them when absent.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from any string value.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Create a new ID using UUID v4 (random).
            pub fn new_uuid() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// View as string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new_uuid()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(
    /// Conversation thread identifier. Keys the message-count side record.
    ThreadId
);
typed_id!(
    /// Identifier of one AG-UI run.
    RunId
);
typed_id!(
    /// Identifier of an emitted assistant or tool-result message.
    MessageId
);
typed_id!(
    /// Wire-level tool call identifier assigned by a translator.
    ToolCallId
);

fn short_hex(len: usize) -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

impl MessageId {
    /// `msg_<32 hex>`: the single assistant message of an AG-UI run.
    pub fn assistant() -> Self {
        Self(format!("msg_{}", uuid::Uuid::new_v4().simple()))
    }

    /// `toolmsg_<8 hex>`: a tool result message.
    pub fn tool_result() -> Self {
        Self(format!("toolmsg_{}", short_hex(8)))
    }

    /// `chatcmpl-<uuid>`: an OpenAI chat completion id.
    pub fn chat_completion() -> Self {
        Self(format!("chatcmpl-{}", uuid::Uuid::new_v4()))
    }
}

impl ToolCallId {
    /// `tool_<n>_<8 hex>`, where `n` is the per-run allocation counter.
    pub fn numbered(counter: u64) -> Self {
        Self(format!("tool_{counter}_{}", short_hex(8)))
    }
}
