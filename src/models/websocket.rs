use serde::{ Serialize, Deserialize };

use crate::models::chat::{ ChatMessage, ConversationSummary };
use crate::models::language::Language;
use crate::schema::FieldErrors;
use crate::views::{ ChatTask, ChatView };

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Chat {
        content: String,
    },
    Action {
        task: ChatTask,
    },
    NewChat,
    Open {
        id: String,
    },
    SetLanguage {
        language: Language,
    },
    History,
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Processing,
    Response {
        #[serde(rename = "conversationId")]
        conversation_id: Option<String>,
        message: ChatMessage,
    },
    Invalid {
        errors: FieldErrors,
    },
    Error {
        message: String,
    },
    View {
        #[serde(flatten)]
        view: ChatView,
    },
    History {
        conversations: Vec<ConversationSummary>,
    },
}
