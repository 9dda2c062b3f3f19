use serde::{ Deserialize, Serialize };
use validator::{ Validate, ValidationError };

use super::{ not_blank, Contract };

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TopicsRequest {
    #[validate(
        length(min = 1, message = "Please select a language."),
        custom(function = "not_blank")
    )]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TopicsResponse {
    #[validate(
        length(min = 1, message = "At least one topic is required."),
        custom(function = "no_blank_entries")
    )]
    pub topics: Vec<String>,
}

fn no_blank_entries(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        let mut error = ValidationError::new("blank_entry");
        error.message = Some("Topics cannot be blank.".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TopicInfoRequest {
    #[validate(
        length(min = 1, message = "Please select a language."),
        custom(function = "not_blank")
    )]
    pub language: String,
    #[validate(
        length(min = 1, message = "Please select a topic."),
        custom(function = "not_blank")
    )]
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TopicSection {
    #[validate(length(min = 1, message = "Section title cannot be empty."))]
    pub title: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TopicContent {
    #[validate(length(min = 1, message = "Topic title cannot be empty."))]
    pub title: String,
    pub introduction: String,
    #[validate(length(min = 2, max = 4, message = "A topic has 2 to 4 sections."), nested)]
    pub sections: Vec<TopicSection>,
}

pub struct GetTopicsForLanguage;

impl Contract for GetTopicsForLanguage {
    type Request = TopicsRequest;
    type Response = TopicsResponse;

    const NAME: &'static str = "getTopicsForLanguage";
    const TEMPLATE: &'static str = "get_topics_for_language";
    const OUTPUT_SHAPE: &'static str = r#"{"topics": ["<topic>", "<topic>"]}"#;
}

pub struct GetTopicInformation;

impl Contract for GetTopicInformation {
    type Request = TopicInfoRequest;
    type Response = TopicContent;

    const NAME: &'static str = "getTopicInformation";
    const TEMPLATE: &'static str = "get_topic_information";
    const OUTPUT_SHAPE: &'static str =
        r#"{"title": "<topic title>", "introduction": "<short introduction>", "sections": [{"title": "<subtitle>", "explanation": "<detailed explanation>", "codeExample": "<optional code>"}]}"#;
}
