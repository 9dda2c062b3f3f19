pub mod code;
pub mod guide;
pub mod learning;
pub mod quiz;
pub mod solution;

use serde::{ de::DeserializeOwned, Serialize };
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use validator::{ Validate, ValidationError, ValidationErrors, ValidationErrorsKind };

pub use code::{ CodeSnippetRequest, CodeSnippetResponse, GenerateCodeSnippet };
pub use guide::{ GuideStep, StepwiseGuidance, StepwiseRequest, StepwiseResponse };
pub use learning::{
    GetTopicInformation,
    GetTopicsForLanguage,
    TopicContent,
    TopicInfoRequest,
    TopicSection,
    TopicsRequest,
    TopicsResponse,
};
pub use quiz::{ GenerateQuiz, QuizQuestion, QuizRequest, QuizResponse };
pub use solution::{ SolutionRequest, SolutionResponse, UnderstandContextProvideSolutions };

/// Field path → messages, e.g. `questions[2].options → ["..."]`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct SchemaError {
    pub fields: FieldErrors,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "schema violation ({})", parts)
    }
}

impl SchemaError {
    pub fn single(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        Self { fields }
    }

    pub fn messages_for(&self, field: &str) -> &[String] {
        self.fields.get(field).map(|m| m.as_slice()).unwrap_or(&[])
    }
}

impl From<ValidationErrors> for SchemaError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        flatten_errors("", &errors, &mut fields);
        Self { fields }
    }
}

fn flatten_errors(prefix: &str, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let raw = field.to_string();
        let path = if raw == "__all__" {
            if prefix.is_empty() { "_schema".to_string() } else { prefix.to_string() }
        } else if prefix.is_empty() {
            wire_name(&raw)
        } else {
            format!("{}.{}", prefix, wire_name(&raw))
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let entry = out.entry(path).or_default();
                entry.extend(list.iter().map(describe));
            }
            ValidationErrorsKind::Struct(inner) => flatten_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Error paths use the camelCase names the fields have on the wire.
fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' && !out.is_empty() {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn describe(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("failed '{}' check", error.code),
    }
}

/// Runs the derived field checks and converts violations into a `SchemaError`.
pub fn check<T: Validate>(value: &T) -> Result<(), SchemaError> {
    value.validate().map_err(SchemaError::from)
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("This field cannot be blank.".into());
        return Err(error);
    }
    Ok(())
}

/// Binds one generation task to its wire shapes and prompt template.
pub trait Contract {
    type Request: Validate + Serialize + Send + Sync;
    type Response: Validate + DeserializeOwned + Send;

    /// Task name used in logs and errors.
    const NAME: &'static str;
    /// Key into the prompt template table.
    const TEMPLATE: &'static str;
    /// JSON skeleton the model has to answer with.
    const OUTPUT_SHAPE: &'static str;
}
