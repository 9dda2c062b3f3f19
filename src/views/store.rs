use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::chat::{ ChatMessage, Conversation, ConversationSummary };

/// Handle the server passes to every chat view.
pub type SessionStore = Arc<Mutex<ConversationStore>>;

/// In-memory conversation history, newest first. Conversations are never removed.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SessionStore {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.conversations.iter().map(ConversationSummary::from).collect()
    }

    /// Appends one settled exchange. Without a target (or with an unknown one) a new
    /// conversation titled after the user's message is created at the front.
    /// Returns the id of the conversation that received the messages.
    pub fn record_exchange(
        &mut self,
        target: Option<&str>,
        user: ChatMessage,
        assistant: ChatMessage
    ) -> String {
        if let Some(id) = target {
            if let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) {
                conversation.messages.push(user);
                conversation.messages.push(assistant);
                return conversation.id.clone();
            }
        }

        let mut conversation = Conversation::start(&user);
        conversation.messages.push(user);
        conversation.messages.push(assistant);
        let id = conversation.id.clone();
        info!("Started conversation {} '{}'", id, conversation.title);
        self.conversations.insert(0, conversation);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_exchange_creates_titled_conversation() {
        let mut store = ConversationStore::new();
        let id = store.record_exchange(
            None,
            ChatMessage::user("Create a React button with a primary variant."),
            ChatMessage::solution("Sure.", "<Button />")
        );

        let conversation = store.get(&id).unwrap();
        assert_eq!(conversation.title, "Create a React button with a p...");
        assert_eq!(conversation.messages.len(), 2);
    }

    #[test]
    fn later_exchanges_append_in_order() {
        let mut store = ConversationStore::new();
        let id = store.record_exchange(None, ChatMessage::user("one"), ChatMessage::failure());
        let same = store.record_exchange(Some(&id), ChatMessage::user("two"), ChatMessage::solution("e", "c"));

        assert_eq!(id, same);
        assert_eq!(store.len(), 1);
        let texts: Vec<_> = store.get(&id).unwrap().messages.iter().map(|m| m.text().to_string()).collect();
        assert_eq!(texts, vec!["one", "An error occurred. Please try again.", "two", "e"]);
    }

    #[test]
    fn newest_conversation_is_listed_first() {
        let mut store = ConversationStore::new();
        store.record_exchange(None, ChatMessage::user("first"), ChatMessage::failure());
        let second = store.record_exchange(None, ChatMessage::user("second"), ChatMessage::failure());

        let summaries = store.summaries();
        assert_eq!(summaries[0].id, second);
        assert_eq!(summaries[1].title, "first...");
        assert_eq!(summaries[0].message_count, 2);
    }
}
