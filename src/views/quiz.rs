use log::{ info, warn };
use serde::Serialize;

use crate::flows::{ GenerationError, Generator };
use crate::models::language::Language;
use crate::schema::{ check, QuizQuestion, QuizRequest, QuizResponse, SchemaError };
use super::ViewError;

pub const QUIZ_FAILURE_MESSAGE: &str = "Failed to generate the quiz. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    Setup,
    InProgress,
    AnswerRevealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizProgress {
    Next,
    Finished,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    phase: QuizPhase,
    language: Option<Language>,
    questions: Vec<QuizQuestion>,
    index: usize,
    selected: Option<String>,
    last_correct: Option<bool>,
    loading: bool,
    error: Option<String>,
}

impl Default for QuizView {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizView {
    pub fn new() -> Self {
        Self {
            phase: QuizPhase::Setup,
            language: None,
            questions: Vec::new(),
            index: 0,
            selected: None,
            last_correct: None,
            loading: false,
            error: None,
        }
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            QuizPhase::Setup => None,
            _ => self.questions.get(self.index),
        }
    }

    fn wrong_state(&self, action: &'static str) -> ViewError {
        ViewError::WrongState {
            action,
            state: format!("{:?}", self.phase),
        }
    }

    fn idle(&self) -> Result<(), ViewError> {
        if self.loading { Err(ViewError::Busy) } else { Ok(()) }
    }

    pub fn select_language(&mut self, language: Language) -> Result<(), ViewError> {
        self.idle()?;
        if self.phase != QuizPhase::Setup {
            return Err(self.wrong_state("change the language"));
        }
        if !language.is_learnable() {
            return Err(SchemaError::single("language", "Quizzes are not available for this language.").into());
        }
        self.language = Some(language);
        Ok(())
    }

    pub fn begin_start(&mut self) -> Result<QuizRequest, ViewError> {
        self.idle()?;
        if self.phase != QuizPhase::Setup {
            return Err(self.wrong_state("start a quiz"));
        }
        let request = QuizRequest {
            language: self.language.map(|l| l.display_name().to_string()).unwrap_or_default(),
        };
        check(&request)?;

        self.loading = true;
        self.error = None;
        Ok(request)
    }

    pub fn finish_start(&mut self, outcome: Result<QuizResponse, GenerationError>) {
        self.loading = false;
        match outcome {
            Ok(response) => {
                info!("Quiz started with {} questions", response.questions.len());
                self.questions = response.questions;
                self.index = 0;
                self.selected = None;
                self.last_correct = None;
                self.phase = QuizPhase::InProgress;
            }
            Err(e) => {
                warn!("Quiz generation failed: {}", e);
                self.error = Some(QUIZ_FAILURE_MESSAGE.to_string());
            }
        }
    }

    pub async fn start(&mut self, generator: &Generator) -> Result<(), ViewError> {
        let request = self.begin_start()?;
        let outcome = generator.generate_quiz(&request).await;
        self.finish_start(outcome);
        Ok(())
    }

    pub fn select_option(&mut self, option: &str) -> Result<(), ViewError> {
        if self.phase != QuizPhase::InProgress {
            return Err(self.wrong_state("select an option"));
        }
        let valid = self.current_question().map_or(false, |q| q.has_option(option));
        if !valid {
            return Err(ViewError::UnknownOption(option.to_string()));
        }
        self.selected = Some(option.to_string());
        Ok(())
    }

    /// Reveals the answer and reports whether the selection was correct.
    pub fn reveal(&mut self) -> Result<bool, ViewError> {
        if self.phase != QuizPhase::InProgress {
            return Err(self.wrong_state("reveal the answer"));
        }
        let selected = self.selected.as_deref().ok_or_else(|| self.wrong_state("reveal without a selection"))?;
        let correct = self.current_question().map_or(false, |q| q.is_correct(selected));
        self.last_correct = Some(correct);
        self.phase = QuizPhase::AnswerRevealed;
        Ok(correct)
    }

    /// Moves past a revealed answer. After the last question the quiz resets to `Setup`.
    pub fn next(&mut self) -> Result<QuizProgress, ViewError> {
        if self.phase != QuizPhase::AnswerRevealed {
            return Err(self.wrong_state("advance"));
        }
        if self.index + 1 < self.questions.len() {
            self.index += 1;
            self.selected = None;
            self.last_correct = None;
            self.phase = QuizPhase::InProgress;
            Ok(QuizProgress::Next)
        } else {
            *self = Self::new();
            Ok(QuizProgress::Finished)
        }
    }

    pub fn exit(&mut self) -> Result<(), ViewError> {
        self.idle()?;
        *self = Self::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{ generator, ok, ScriptedClient };
    use serde_json::json;

    fn python_quiz() -> serde_json::Value {
        json!({
            "questions": [
                {
                    "question": "Which keyword defines a function?",
                    "options": ["func", "def", "fn", "lambda"],
                    "correctAnswer": "def",
                    "explanation": "def introduces a function."
                },
                {
                    "question": "Which type is immutable?",
                    "options": ["list", "dict", "set", "tuple"],
                    "correctAnswer": "tuple",
                    "explanation": "Tuples cannot be changed."
                }
            ]
        })
    }

    #[tokio::test]
    async fn python_quiz_runs_to_completion() {
        let client = ScriptedClient::replying(vec![ok(python_quiz())]);
        let generator = generator(&client);
        let mut quiz = QuizView::new();

        quiz.select_language(Language::Python).unwrap();
        quiz.start(&generator).await.unwrap();
        assert_eq!(quiz.phase(), QuizPhase::InProgress);
        assert_eq!(quiz.index(), 0);
        assert_eq!(quiz.selected(), None);
        assert!(client.prompts()[0].contains("Python"));

        quiz.select_option("def").unwrap();
        assert!(quiz.reveal().unwrap());
        assert_eq!(quiz.next().unwrap(), QuizProgress::Next);

        quiz.select_option("list").unwrap();
        assert!(!quiz.reveal().unwrap());
        assert_eq!(quiz.phase(), QuizPhase::AnswerRevealed);
        assert_eq!(quiz.next().unwrap(), QuizProgress::Finished);

        assert_eq!(quiz.phase(), QuizPhase::Setup);
        assert_eq!(quiz.question_count(), 0);
        assert!(quiz.language().is_none());
    }

    #[tokio::test]
    async fn starting_without_language_makes_no_call() {
        let client = ScriptedClient::replying(vec![]);
        let generator = generator(&client);
        let mut quiz = QuizView::new();

        let err = quiz.start(&generator).await.unwrap_err();
        match err {
            ViewError::Validation(e) => {
                assert_eq!(e.messages_for("language"), ["Please select a language.".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn failed_generation_stays_in_setup() {
        let client = ScriptedClient::replying(vec![Err("boom".into())]);
        let generator = generator(&client);
        let mut quiz = QuizView::new();

        quiz.select_language(Language::Dart).unwrap();
        quiz.start(&generator).await.unwrap();

        assert_eq!(quiz.phase(), QuizPhase::Setup);
        assert_eq!(quiz.error(), Some(QUIZ_FAILURE_MESSAGE));
        assert_eq!(quiz.language(), Some(Language::Dart));
        assert!(!quiz.is_loading());
    }

    #[test]
    fn selection_rules() {
        let mut quiz = QuizView::new();
        assert!(matches!(quiz.select_option("def"), Err(ViewError::WrongState { .. })));

        quiz.select_language(Language::Python).unwrap();
        quiz.begin_start().unwrap();
        assert!(matches!(quiz.begin_start(), Err(ViewError::Busy)));
        let response: QuizResponse = serde_json::from_value(python_quiz()).unwrap();
        quiz.finish_start(Ok(response));

        assert!(matches!(quiz.reveal(), Err(ViewError::WrongState { .. })));
        assert!(matches!(quiz.select_option("var"), Err(ViewError::UnknownOption(_))));
        quiz.select_option("fn").unwrap();
        quiz.select_option("def").unwrap();
        assert_eq!(quiz.selected(), Some("def"));

        quiz.reveal().unwrap();
        assert!(matches!(quiz.select_option("fn"), Err(ViewError::WrongState { .. })));
        assert!(matches!(quiz.select_language(Language::Go), Err(ViewError::WrongState { .. })));
    }

    #[test]
    fn exit_returns_to_setup() {
        let mut quiz = QuizView::new();
        quiz.select_language(Language::Rust).unwrap();
        quiz.begin_start().unwrap();
        let response: QuizResponse = serde_json::from_value(python_quiz()).unwrap();
        quiz.finish_start(Ok(response));

        quiz.exit().unwrap();
        assert_eq!(quiz.phase(), QuizPhase::Setup);
        assert!(quiz.current_question().is_none());
    }
}
