use chrono::Utc;
use serde::{ Serialize, Deserialize };
use uuid::Uuid;

pub const CONVERSATION_TITLE_CHARS: usize = 30;
pub const GENERIC_FAILURE_TEXT: &str = "An error occurred. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What a message renders as. Closed so every client knows how to display it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Solution {
        explanation: String,
        code: String,
    },
    Error {
        text: String,
    },
}

impl MessageContent {
    pub fn is_error(&self) -> bool {
        matches!(self, MessageContent::Error { .. })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: MessageContent,
    pub created_at: i64,
}

impl ChatMessage {
    fn new(prefix: &str, role: Role, content: MessageContent) -> Self {
        Self {
            id: format!("{}-{}", prefix, Uuid::new_v4()),
            role,
            content,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", Role::User, MessageContent::Text { text: text.into() })
    }

    pub fn solution(explanation: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new("assistant", Role::Assistant, MessageContent::Solution {
            explanation: explanation.into(),
            code: code.into(),
        })
    }

    pub fn failure() -> Self {
        Self::new("error", Role::Assistant, MessageContent::Error {
            text: GENERIC_FAILURE_TEXT.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } | MessageContent::Error { text } => text,
            MessageContent::Solution { explanation, .. } => explanation,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn start(first_user_message: &ChatMessage) -> Self {
        Self {
            id: format!("chat-{}", Uuid::new_v4()),
            title: conversation_title(first_user_message.text()),
            messages: Vec::new(),
        }
    }
}

/// First 30 characters of the opening message, always followed by an ellipsis.
pub fn conversation_title(first_message: &str) -> String {
    let head: String = first_message.chars().take(CONVERSATION_TITLE_CHARS).collect();
    format!("{}...", head)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            message_count: conversation.messages.len(),
        }
    }
}
