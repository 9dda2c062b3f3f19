use log::{ info, warn };
use serde::{ Deserialize, Serialize };

use crate::flows::{ GenerationError, Generator };
use crate::models::chat::ChatMessage;
use crate::models::language::Language;
use crate::schema::{ check, SolutionRequest, SolutionResponse };
use super::store::{ ConversationStore, SessionStore };
use super::ViewError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ChatState {
    NoActiveConversation,
    ActiveConversation {
        id: String,
    },
    AwaitingResponse {
        conversation_id: Option<String>,
    },
}

/// The welcome screen's action cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatTask {
    Generate,
    Debug,
    Explain,
}

impl ChatTask {
    pub fn title(&self) -> &'static str {
        match self {
            ChatTask::Generate => "Generate Code",
            ChatTask::Debug => "Debug Code",
            ChatTask::Explain => "Explain Code",
        }
    }

    pub fn example(&self) -> &'static str {
        match self {
            ChatTask::Generate => "Create a React button with a primary variant.",
            ChatTask::Debug => "What is wrong in the code and How to fix it",
            ChatTask::Explain => "What does this code do and how?",
        }
    }
}

/// A submitted message whose answer has not been applied yet.
#[derive(Debug, Clone)]
pub struct PendingExchange {
    ticket: u64,
    conversation_id: Option<String>,
    user_message: ChatMessage,
    request: SolutionRequest,
}

impl PendingExchange {
    pub fn request(&self) -> &SolutionRequest {
        &self.request
    }
}

/// One chat panel. Owns what is on screen; the conversation history lives in the
/// shared store and is only written when an exchange settles.
#[derive(Debug, Clone, Serialize)]
pub struct ChatView {
    #[serde(flatten)]
    state: ChatState,
    messages: Vec<ChatMessage>,
    language: Language,
    #[serde(skip)]
    next_ticket: u64,
    #[serde(skip)]
    in_flight: Option<u64>,
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView {
    pub fn new() -> Self {
        Self {
            state: ChatState::NoActiveConversation,
            messages: Vec::new(),
            language: Language::default(),
            next_ticket: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn is_awaiting(&self) -> bool {
        self.in_flight.is_some()
    }

    fn active_conversation(&self) -> Option<String> {
        match &self.state {
            ChatState::ActiveConversation { id } => Some(id.clone()),
            ChatState::AwaitingResponse { conversation_id } => conversation_id.clone(),
            ChatState::NoActiveConversation => None,
        }
    }

    /// Validates the message, shows it optimistically and enters `AwaitingResponse`.
    pub fn begin_submit(&mut self, input: &str) -> Result<PendingExchange, ViewError> {
        if self.is_awaiting() {
            return Err(ViewError::Busy);
        }
        let request = SolutionRequest::from_message(
            input,
            Some(self.language.display_name().to_string())
        );
        check(&request)?;

        let conversation_id = self.active_conversation();
        let user_message = ChatMessage::user(input);
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        self.messages.push(user_message.clone());
        self.in_flight = Some(ticket);
        self.state = ChatState::AwaitingResponse { conversation_id: conversation_id.clone() };

        Ok(PendingExchange {
            ticket,
            conversation_id,
            user_message,
            request,
        })
    }

    pub fn begin_action(&mut self, task: ChatTask) -> Result<PendingExchange, ViewError> {
        self.begin_submit(task.example())
    }

    /// Records the settled exchange and returns the assistant message. A failure still
    /// records the user's message, paired with an error reply.
    pub fn complete(
        &mut self,
        pending: PendingExchange,
        outcome: Result<SolutionResponse, GenerationError>,
        store: &mut ConversationStore
    ) -> ChatMessage {
        let assistant = match outcome {
            Ok(solution) => ChatMessage::solution(solution.explanation, solution.suggested_solution),
            Err(e) => {
                warn!("Chat exchange failed: {}", e);
                ChatMessage::failure()
            }
        };

        let id = store.record_exchange(
            pending.conversation_id.as_deref(),
            pending.user_message,
            assistant.clone()
        );

        if self.in_flight == Some(pending.ticket) {
            self.in_flight = None;
        }
        // Only repaint when the user is still looking at this exchange.
        if matches!(self.state, ChatState::AwaitingResponse { .. }) {
            self.messages.push(assistant.clone());
            self.state = ChatState::ActiveConversation { id };
        } else {
            info!("Exchange for conversation {} settled after the view moved on", id);
        }
        assistant
    }

    pub async fn submit(
        &mut self,
        generator: &Generator,
        store: &SessionStore,
        input: &str
    ) -> Result<ChatMessage, ViewError> {
        let pending = self.begin_submit(input)?;
        let outcome = generator.understand_context_provide_solutions(pending.request()).await;
        let mut store = store.lock().await;
        Ok(self.complete(pending, outcome, &mut store))
    }

    /// Clears the screen. History in the store is untouched.
    pub fn new_chat(&mut self) {
        self.state = ChatState::NoActiveConversation;
        self.messages.clear();
    }

    pub fn open(&mut self, id: &str, store: &ConversationStore) -> Result<(), ViewError> {
        let conversation = store
            .get(id)
            .ok_or_else(|| ViewError::ConversationNotFound(id.to_string()))?;
        self.messages = conversation.messages.clone();
        self.state = ChatState::ActiveConversation { id: conversation.id.clone() };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{ generator, ok, ScriptedClient };
    use crate::models::chat::{ MessageContent, Role };
    use crate::views::store::ConversationStore;
    use serde_json::json;

    fn solution_reply() -> Result<String, String> {
        ok(json!({ "suggestedSolution": "<Button variant=\"primary\" />", "explanation": "Here you go." }))
    }

    #[tokio::test]
    async fn first_message_creates_conversation() {
        let client = ScriptedClient::replying(vec![solution_reply()]);
        let generator = generator(&client);
        let store = ConversationStore::shared();
        let mut view = ChatView::new();

        let reply = view
            .submit(&generator, &store, "Create a React button with a primary variant.").await
            .unwrap();

        assert_eq!(client.calls(), 1);
        assert_eq!(reply.content, MessageContent::Solution {
            explanation: "Here you go.".into(),
            code: "<Button variant=\"primary\" />".into(),
        });
        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.messages()[0].role, Role::User);

        let store = store.lock().await;
        assert_eq!(store.len(), 1);
        let summary = &store.summaries()[0];
        assert_eq!(summary.title, "Create a React button with a p...");
        assert_eq!(view.state(), &ChatState::ActiveConversation { id: summary.id.clone() });
    }

    #[tokio::test]
    async fn request_carries_message_and_language() {
        let client = ScriptedClient::replying(vec![solution_reply()]);
        let generator = generator(&client);
        let store = ConversationStore::shared();
        let mut view = ChatView::new();
        view.set_language(Language::Rust);

        view.submit(&generator, &store, "Reverse a vector in place").await.unwrap();

        let prompt = &client.prompts()[0];
        assert!(prompt.contains("Problem Description: Reverse a vector in place"));
        assert!(prompt.contains("User Request: Reverse a vector in place"));
        assert!(prompt.contains("Language: Rust"));
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_a_call() {
        let client = ScriptedClient::replying(vec![]);
        let generator = generator(&client);
        let store = ConversationStore::shared();
        let mut view = ChatView::new();

        for input in ["", "   \n"] {
            let err = view.submit(&generator, &store, input).await.unwrap_err();
            assert!(matches!(err, ViewError::Validation(_)));
        }
        assert_eq!(client.calls(), 0);
        assert!(view.messages().is_empty());
        assert_eq!(view.state(), &ChatState::NoActiveConversation);
    }

    #[tokio::test]
    async fn failure_keeps_user_message_and_adds_error_reply() {
        let client = ScriptedClient::replying(vec![Err("timeout".into())]);
        let generator = generator(&client);
        let store = ConversationStore::shared();
        let mut view = ChatView::new();

        let reply = view.submit(&generator, &store, "Explain closures").await.unwrap();

        assert!(reply.content.is_error());
        assert!(!view.is_awaiting());
        let store = store.lock().await;
        assert_eq!(store.len(), 1);
        let conversation = store.get(&store.summaries()[0].id).unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].text(), "Explain closures");
        assert_eq!(conversation.messages[1].text(), "An error occurred. Please try again.");
    }

    #[tokio::test]
    async fn follow_up_appends_to_active_conversation() {
        let client = ScriptedClient::replying(vec![solution_reply(), Err("boom".into())]);
        let generator = generator(&client);
        let store = ConversationStore::shared();
        let mut view = ChatView::new();

        view.submit(&generator, &store, "First question").await.unwrap();
        view.submit(&generator, &store, "Second question").await.unwrap();

        let store = store.lock().await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.summaries()[0].message_count, 4);
        assert_eq!(view.messages().len(), 4);
    }

    #[test]
    fn second_submit_while_awaiting_is_busy() {
        let mut view = ChatView::new();
        let _pending = view.begin_submit("one").unwrap();
        assert!(matches!(view.state(), ChatState::AwaitingResponse { conversation_id: None }));
        assert!(matches!(view.begin_submit("two"), Err(ViewError::Busy)));
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn new_chat_always_clears_the_screen() {
        let mut store = ConversationStore::new();
        let mut view = ChatView::new();
        let pending = view.begin_submit("hello").unwrap();
        view.complete(pending, Err(GenerationError::Provider { task: "t", message: "x".into() }), &mut store);
        assert_eq!(view.messages().len(), 2);

        view.new_chat();
        assert_eq!(view.state(), &ChatState::NoActiveConversation);
        assert!(view.messages().is_empty());
        assert_eq!(store.len(), 1);

        view.new_chat();
        assert_eq!(view.state(), &ChatState::NoActiveConversation);
    }

    #[test]
    fn late_response_after_new_chat_is_recorded_but_not_shown() {
        let mut store = ConversationStore::new();
        let mut view = ChatView::new();
        let pending = view.begin_submit("slow question").unwrap();

        view.new_chat();
        assert!(matches!(view.begin_submit("impatient"), Err(ViewError::Busy)));

        view.complete(
            pending,
            Ok(SolutionResponse { suggested_solution: "x".into(), explanation: "y".into() }),
            &mut store
        );
        assert!(view.messages().is_empty());
        assert_eq!(view.state(), &ChatState::NoActiveConversation);
        assert_eq!(store.len(), 1);
        assert!(!view.is_awaiting());
    }

    #[test]
    fn open_shows_stored_conversation() {
        let mut store = ConversationStore::new();
        let id = store.record_exchange(None, ChatMessage::user("saved"), ChatMessage::failure());
        let mut view = ChatView::new();

        view.open(&id, &store).unwrap();
        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.state(), &ChatState::ActiveConversation { id: id.clone() });

        assert!(matches!(view.open("chat-missing", &store), Err(ViewError::ConversationNotFound(_))));
    }

    #[test]
    fn language_is_sent_as_display_name() {
        let mut store = ConversationStore::new();
        let mut view = ChatView::new();

        view.set_language(Language::CSharp);
        let pending = view.begin_submit("Read a file line by line").unwrap();
        assert_eq!(pending.request().language.as_deref(), Some("C#"));
        view.complete(pending, Err(GenerationError::Provider { task: "t", message: "x".into() }), &mut store);

        view.set_language(Language::CPlusPlus);
        let pending = view.begin_submit("Sort a vector of structs").unwrap();
        assert_eq!(pending.request().language.as_deref(), Some("C++"));
    }

    #[test]
    fn action_card_submits_its_example() {
        let mut view = ChatView::new();
        let pending = view.begin_action(ChatTask::Generate).unwrap();
        assert_eq!(pending.request().user_request, "Create a React button with a primary variant.");
        assert_eq!(pending.request().language.as_deref(), Some("JavaScript"));
    }
}
