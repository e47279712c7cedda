use serde::{Deserialize, Serialize};

use crate::constants::ATTENTION_TITLE_MAX_CHARS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Assistant,
}

impl MessageRole {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "assistant" | "agent" | "ai" => Self::Assistant,
            _ => Self::User,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Tool invocation recorded on a message. Arguments stay as the raw JSON
/// string the backend sent; rendering decides how much to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// A durable chat message within a conversation.
///
/// Content is append-only while `is_streaming` is set and immutable once
/// streaming ends. The in-flight buffer itself lives in the streaming
/// accumulator, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    /// Model reasoning text, when the backend exposes it.
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub is_streaming: bool,
    /// Set by the disconnect reconciliation pass when a stream was cut off
    /// before its end event arrived.
    #[serde(default)]
    pub interrupted: bool,
    /// Locally-originated message awaiting server confirmation.
    #[serde(skip)]
    pub pending: bool,
}

impl Message {
    /// Placeholder for a message whose stream just opened.
    pub fn streaming_placeholder(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            role: MessageRole::Assistant,
            content: String::new(),
            thinking: None,
            created_at,
            tool_calls: Vec::new(),
            is_streaming: true,
            interrupted: false,
            pending: false,
        }
    }

    /// Display snippet: first line, truncated.
    pub fn preview(&self) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(ATTENTION_TITLE_MAX_CHARS)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(MessageRole::parse("agent"), MessageRole::Assistant);
        assert_eq!(MessageRole::parse("human"), MessageRole::User);
    }

    #[test]
    fn test_message_partial_payload() {
        let msg: Message = serde_json::from_str(
            r#"{"id":"m1","conversationId":"c1","role":"assistant","content":"hi","createdAt":12}"#,
        )
        .unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(!msg.is_streaming);
        assert!(!msg.pending);
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn test_preview_truncates_first_line() {
        let mut msg = Message::streaming_placeholder("m1", "c1", 0);
        msg.content = format!("{}\nsecond line", "x".repeat(80));
        let preview = msg.preview();
        assert_eq!(preview.len(), ATTENTION_TITLE_MAX_CHARS);
        assert!(!preview.contains('\n'));
    }
}
