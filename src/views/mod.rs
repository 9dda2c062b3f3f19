pub mod chat;
pub mod code_generator;
pub mod learning;
pub mod quiz;
pub mod stepwise;
pub mod store;

use serde::Serialize;
use thiserror::Error;

use crate::schema::SchemaError;

pub use chat::{ ChatState, ChatTask, ChatView, PendingExchange };
pub use code_generator::CodeGeneratorView;
pub use learning::{ LearningPath, LearningStep };
pub use quiz::{ QuizPhase, QuizProgress, QuizView };
pub use stepwise::StepwiseGuideView;
pub use store::{ ConversationStore, SessionStore };

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("{0}")]
    Validation(#[from] SchemaError),
    #[error("a request is already in flight")]
    Busy,
    #[error("cannot {action} while {state}")]
    WrongState {
        action: &'static str,
        state: String,
    },
    #[error("'{0}' is not one of the options")]
    UnknownOption(String),
    #[error("conversation '{0}' not found")]
    ConversationNotFound(String),
}

/// Shared lifecycle of the single-shot panels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Panel::Idle
    }
}

impl<T> Panel<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Panel::Loading)
    }

    /// Moves into `Loading`, refusing a second submission while one is pending.
    pub(crate) fn start(&mut self) -> Result<(), ViewError> {
        if self.is_loading() {
            return Err(ViewError::Busy);
        }
        *self = Panel::Loading;
        Ok(())
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Panel::Failed(message) => Some(message),
            _ => None,
        }
    }
}
