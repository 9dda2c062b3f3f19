use log::warn;
use serde::Serialize;

use crate::flows::{ GenerationError, Generator };
use crate::schema::{ check, GuideStep, StepwiseRequest, StepwiseResponse };
use super::{ Panel, ViewError };

pub const GUIDE_FAILURE_MESSAGE: &str = "Failed to generate guidance. Please try again.";
pub const NO_STEPS_MESSAGE: &str =
    "The AI couldn't generate steps for this query. Please try rephrasing it.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepwiseGuideView {
    pub panel: Panel<Vec<GuideStep>>,
}

impl StepwiseGuideView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, query: &str) -> Result<StepwiseRequest, ViewError> {
        if self.panel.is_loading() {
            return Err(ViewError::Busy);
        }
        let request = StepwiseRequest { query: query.to_string() };
        check(&request)?;
        self.panel.start()?;
        Ok(request)
    }

    /// An empty step list is a valid response but is shown as a failure.
    pub fn finish(&mut self, outcome: Result<StepwiseResponse, GenerationError>) {
        self.panel = match outcome {
            Ok(response) if response.steps.is_empty() => Panel::Failed(NO_STEPS_MESSAGE.to_string()),
            Ok(response) => Panel::Ready(response.steps),
            Err(e) => {
                warn!("Stepwise guidance failed: {}", e);
                Panel::Failed(GUIDE_FAILURE_MESSAGE.to_string())
            }
        };
    }

    pub async fn submit(&mut self, generator: &Generator, query: &str) -> Result<(), ViewError> {
        let request = self.begin(query)?;
        let outcome = generator.stepwise_guidance_with_examples(&request).await;
        self.finish(outcome);
        Ok(())
    }
}
