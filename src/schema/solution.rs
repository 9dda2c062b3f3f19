use serde::{ Deserialize, Serialize };
use validator::Validate;

use super::{ not_blank, Contract };

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRequest {
    #[validate(
        length(min = 1, message = "Message cannot be empty."),
        custom(function = "not_blank")
    )]
    pub problem_description: String,
    #[validate(
        length(min = 1, message = "Message cannot be empty."),
        custom(function = "not_blank")
    )]
    pub user_request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl SolutionRequest {
    /// The chat panel sends the same text as both the problem and the request.
    pub fn from_message(message: &str, language: Option<String>) -> Self {
        Self {
            problem_description: message.to_string(),
            user_request: message.to_string(),
            code_context: None,
            language,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SolutionResponse {
    pub suggested_solution: String,
    pub explanation: String,
}

pub struct UnderstandContextProvideSolutions;

impl Contract for UnderstandContextProvideSolutions {
    type Request = SolutionRequest;
    type Response = SolutionResponse;

    const NAME: &'static str = "understandContextProvideSolutions";
    const TEMPLATE: &'static str = "understand_context_provide_solutions";
    const OUTPUT_SHAPE: &'static str =
        r#"{"suggestedSolution": "<code snippet>", "explanation": "<brief explanation>"}"#;
}
