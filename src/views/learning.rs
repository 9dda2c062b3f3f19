use log::warn;
use serde::Serialize;

use crate::flows::{ GenerationError, Generator };
use crate::models::language::Language;
use crate::schema::{ check, SchemaError, TopicContent, TopicInfoRequest, TopicsRequest, TopicsResponse };
use super::ViewError;

pub const TOPICS_FAILURE_MESSAGE: &str = "Failed to fetch topics. Please try again.";
pub const TOPIC_INFO_FAILURE_MESSAGE: &str = "Failed to fetch topic information. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStep {
    SelectLanguage,
    SelectTopic,
    ViewContent,
}

/// Language → topic → content wizard. Each forward step is gated by one generation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    step: LearningStep,
    language: Option<Language>,
    topics: Vec<String>,
    topic: Option<String>,
    content: Option<TopicContent>,
    loading: bool,
    error: Option<String>,
}

impl Default for LearningPath {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningPath {
    pub fn new() -> Self {
        Self {
            step: LearningStep::SelectLanguage,
            language: None,
            topics: Vec::new(),
            topic: None,
            content: None,
            loading: false,
            error: None,
        }
    }

    pub fn step(&self) -> LearningStep {
        self.step
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn content(&self) -> Option<&TopicContent> {
        self.content.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn idle(&self) -> Result<(), ViewError> {
        if self.loading { Err(ViewError::Busy) } else { Ok(()) }
    }

    fn expect_step(&self, expected: LearningStep, action: &'static str) -> Result<(), ViewError> {
        if self.step != expected {
            return Err(ViewError::WrongState {
                action,
                state: format!("{:?}", self.step),
            });
        }
        Ok(())
    }

    pub fn begin_language(&mut self, language: Language) -> Result<TopicsRequest, ViewError> {
        self.idle()?;
        self.expect_step(LearningStep::SelectLanguage, "choose a language")?;
        if !language.is_learnable() {
            return Err(
                SchemaError::single("language", "Learning paths are not available for this language.").into()
            );
        }
        let request = TopicsRequest { language: language.display_name().to_string() };
        check(&request)?;

        self.language = Some(language);
        self.loading = true;
        self.error = None;
        Ok(request)
    }

    pub fn finish_language(&mut self, outcome: Result<TopicsResponse, GenerationError>) {
        self.loading = false;
        match outcome {
            Ok(response) => {
                self.topics = response.topics;
                self.step = LearningStep::SelectTopic;
            }
            Err(e) => {
                warn!("Topic list failed: {}", e);
                self.error = Some(TOPICS_FAILURE_MESSAGE.to_string());
            }
        }
    }

    pub fn begin_topic(&mut self, topic: &str) -> Result<TopicInfoRequest, ViewError> {
        self.idle()?;
        self.expect_step(LearningStep::SelectTopic, "choose a topic")?;
        if !self.topics.iter().any(|t| t == topic) {
            return Err(ViewError::UnknownOption(topic.to_string()));
        }
        let language = self.language.map(|l| l.display_name().to_string()).unwrap_or_default();
        let request = TopicInfoRequest { language, topic: topic.to_string() };
        check(&request)?;

        self.topic = Some(topic.to_string());
        self.loading = true;
        self.error = None;
        Ok(request)
    }

    pub fn finish_topic(&mut self, outcome: Result<TopicContent, GenerationError>) {
        self.loading = false;
        match outcome {
            Ok(content) => {
                self.content = Some(content);
                self.step = LearningStep::ViewContent;
            }
            Err(e) => {
                warn!("Topic information failed: {}", e);
                self.error = Some(TOPIC_INFO_FAILURE_MESSAGE.to_string());
            }
        }
    }

    pub async fn choose_language(&mut self, generator: &Generator, language: Language) -> Result<(), ViewError> {
        let request = self.begin_language(language)?;
        let outcome = generator.get_topics_for_language(&request).await;
        self.finish_language(outcome);
        Ok(())
    }

    pub async fn choose_topic(&mut self, generator: &Generator, topic: &str) -> Result<(), ViewError> {
        let request = self.begin_topic(topic)?;
        let outcome = generator.get_topic_information(&request).await;
        self.finish_topic(outcome);
        Ok(())
    }

    /// Leaves the current screen, dropping what it owned. Also answers an error with
    /// "go back"; on the first screen that only clears the error.
    pub fn back(&mut self) -> Result<(), ViewError> {
        self.idle()?;
        self.error = None;
        match self.step {
            LearningStep::ViewContent => {
                self.step = LearningStep::SelectTopic;
                self.content = None;
                self.topic = None;
            }
            LearningStep::SelectTopic => {
                self.step = LearningStep::SelectLanguage;
                self.topics.clear();
                self.topic = None;
            }
            LearningStep::SelectLanguage => {}
        }
        Ok(())
    }

    pub fn dismiss_error(&mut self) -> Result<(), ViewError> {
        self.idle()?;
        self.error = None;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<(), ViewError> {
        self.idle()?;
        *self = Self::new();
        Ok(())
    }
}
