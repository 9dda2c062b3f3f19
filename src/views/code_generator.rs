use log::warn;
use serde::Serialize;

use crate::flows::{ GenerationError, Generator };
use crate::schema::{ check, CodeSnippetRequest, CodeSnippetResponse };
use super::{ Panel, ViewError };

pub const CODE_FAILURE_MESSAGE: &str = "Failed to generate code snippet. Please try again.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeGeneratorView {
    pub panel: Panel<String>,
}

impl CodeGeneratorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the description and enters `Loading`. The previous result stays visible
    /// only until a valid submission replaces it.
    pub fn begin(&mut self, description: &str) -> Result<CodeSnippetRequest, ViewError> {
        if self.panel.is_loading() {
            return Err(ViewError::Busy);
        }
        let request = CodeSnippetRequest { description: description.to_string() };
        check(&request)?;
        self.panel.start()?;
        Ok(request)
    }

    pub fn finish(&mut self, outcome: Result<CodeSnippetResponse, GenerationError>) {
        self.panel = match outcome {
            Ok(response) => Panel::Ready(response.code),
            Err(e) => {
                warn!("Code generation failed: {}", e);
                Panel::Failed(CODE_FAILURE_MESSAGE.to_string())
            }
        };
    }

    pub async fn submit(&mut self, generator: &Generator, description: &str) -> Result<(), ViewError> {
        let request = self.begin(description)?;
        let outcome = generator.generate_code_snippet(&request).await;
        self.finish(outcome);
        Ok(())
    }
}
