use serde::{ Deserialize, Serialize };
use validator::Validate;

use super::{ not_blank, Contract };

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CodeSnippetRequest {
    #[validate(
        length(min = 10, message = "Please provide a description of at least 10 characters."),
        custom(function = "not_blank")
    )]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CodeSnippetResponse {
    #[validate(length(min = 1, message = "Generated code cannot be empty."))]
    pub code: String,
}

pub struct GenerateCodeSnippet;

impl Contract for GenerateCodeSnippet {
    type Request = CodeSnippetRequest;
    type Response = CodeSnippetResponse;

    const NAME: &'static str = "generateCodeSnippet";
    const TEMPLATE: &'static str = "generate_code_snippet";
    const OUTPUT_SHAPE: &'static str = r#"{"code": "<the complete code snippet>"}"#;
}
