use serde::{ Deserialize, Serialize };
use validator::Validate;

use super::{ not_blank, Contract };

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StepwiseRequest {
    #[validate(
        length(min = 10, message = "Please describe the procedure in at least 10 characters."),
        custom(function = "not_blank")
    )]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuideStep {
    pub step_number: u32,
    #[validate(length(min = 1, message = "Step instruction cannot be empty."))]
    pub instruction: String,
    pub code_example: String,
}

/// An empty `steps` list is a valid answer; the guide panel treats it as a soft failure.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StepwiseResponse {
    #[validate(nested)]
    pub steps: Vec<GuideStep>,
}

pub struct StepwiseGuidance;

impl Contract for StepwiseGuidance {
    type Request = StepwiseRequest;
    type Response = StepwiseResponse;

    const NAME: &'static str = "stepwiseGuidanceWithExamples";
    const TEMPLATE: &'static str = "stepwise_guidance_with_examples";
    const OUTPUT_SHAPE: &'static str =
        r#"{"steps": [{"stepNumber": 1, "instruction": "<what to do>", "codeExample": "<code for this step>"}]}"#;
}
