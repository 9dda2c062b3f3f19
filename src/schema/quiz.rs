use serde::{ Deserialize, Serialize };
use validator::{ Validate, ValidationError };

use super::{ not_blank, Contract };

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizRequest {
    #[validate(
        length(min = 1, message = "Please select a language."),
        custom(function = "not_blank")
    )]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "correct_answer_in_options"))]
pub struct QuizQuestion {
    #[validate(length(min = 1, message = "Question cannot be empty."))]
    pub question: String,
    #[validate(length(equal = 4, message = "A question must have exactly 4 options."))]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

fn correct_answer_in_options(question: &QuizQuestion) -> Result<(), ValidationError> {
    if question.has_option(&question.correct_answer) {
        return Ok(());
    }
    let mut error = ValidationError::new("correct_answer_not_an_option");
    error.message = Some("The correct answer must be one of the options.".into());
    Err(error)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizResponse {
    #[validate(length(min = 1, message = "A quiz needs at least one question."), nested)]
    pub questions: Vec<QuizQuestion>,
}

pub struct GenerateQuiz;

impl Contract for GenerateQuiz {
    type Request = QuizRequest;
    type Response = QuizResponse;

    const NAME: &'static str = "generateQuiz";
    const TEMPLATE: &'static str = "generate_quiz";
    const OUTPUT_SHAPE: &'static str =
        r#"{"questions": [{"question": "<question>", "options": ["<a>", "<b>", "<c>", "<d>"], "correctAnswer": "<one of the options, verbatim>", "explanation": "<why it is correct>"}]}"#;
}
