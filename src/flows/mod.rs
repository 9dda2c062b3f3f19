pub mod decode;

use log::{ error, info };
use std::sync::{ Arc, RwLock };
use thiserror::Error;

use crate::config::prompt::{ render_prompt, PromptConfig, PromptError };
use crate::llm::chat::ChatClient;
use crate::schema::{
    check,
    CodeSnippetRequest,
    CodeSnippetResponse,
    Contract,
    GenerateCodeSnippet,
    GenerateQuiz,
    GetTopicInformation,
    GetTopicsForLanguage,
    QuizRequest,
    QuizResponse,
    SchemaError,
    SolutionRequest,
    SolutionResponse,
    StepwiseGuidance,
    StepwiseRequest,
    StepwiseResponse,
    TopicContent,
    TopicInfoRequest,
    TopicsRequest,
    TopicsResponse,
    UnderstandContextProvideSolutions,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid {task} request: {source}")]
    InvalidRequest {
        task: &'static str,
        source: SchemaError,
    },
    #[error("{0}")]
    Prompt(#[from] PromptError),
    #[error("{task} provider call failed: {message}")]
    Provider {
        task: &'static str,
        message: String,
    },
    #[error("{task} returned undecodable output: {message}")]
    MalformedResponse {
        task: &'static str,
        message: String,
    },
    #[error("{task} response violates its schema: {source}")]
    InvalidResponse {
        task: &'static str,
        source: SchemaError,
    },
    #[error("{task} call was abandoned before it settled")]
    Cancelled {
        task: &'static str,
    },
}

/// Runs generation tasks against one provider. Every call makes exactly one
/// provider request; nothing is retried or cached.
pub struct Generator {
    client: Arc<dyn ChatClient>,
    prompts: RwLock<Arc<PromptConfig>>,
}

impl Generator {
    pub fn new(client: Arc<dyn ChatClient>, prompts: Arc<PromptConfig>) -> Self {
        Self {
            client,
            prompts: RwLock::new(prompts),
        }
    }

    pub fn prompts(&self) -> Arc<PromptConfig> {
        match self.prompts.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace_prompts(&self, prompts: Arc<PromptConfig>) {
        match self.prompts.write() {
            Ok(mut guard) => *guard = prompts,
            Err(poisoned) => *poisoned.into_inner() = prompts,
        }
    }

    pub async fn run<C: Contract>(
        &self,
        request: &C::Request
    ) -> Result<C::Response, GenerationError> {
        let result = self.run_once::<C>(request).await;
        if let Err(e) = &result {
            error!("Generation '{}' failed: {}", C::NAME, e);
        }
        result
    }

    async fn run_once<C: Contract>(
        &self,
        request: &C::Request
    ) -> Result<C::Response, GenerationError> {
        check(request).map_err(|source| GenerationError::InvalidRequest { task: C::NAME, source })?;

        let prompt = render_prompt::<C>(&self.prompts(), request)?;
        info!("Generation '{}' → model={} prompt_chars={}", C::NAME, self.client.get_model(), prompt.len());

        let completion = self.client
            .complete(&prompt).await
            .map_err(|e| GenerationError::Provider { task: C::NAME, message: e.to_string() })?;

        let response = decode::decode_response::<C::Response>(&completion.response)
            .map_err(|message| GenerationError::MalformedResponse { task: C::NAME, message })?;
        check(&response).map_err(|source| GenerationError::InvalidResponse { task: C::NAME, source })?;

        info!("Generation '{}' completed", C::NAME);
        Ok(response)
    }

    pub async fn understand_context_provide_solutions(
        &self,
        request: &SolutionRequest
    ) -> Result<SolutionResponse, GenerationError> {
        self.run::<UnderstandContextProvideSolutions>(request).await
    }

    pub async fn generate_code_snippet(
        &self,
        request: &CodeSnippetRequest
    ) -> Result<CodeSnippetResponse, GenerationError> {
        self.run::<GenerateCodeSnippet>(request).await
    }

    pub async fn stepwise_guidance_with_examples(
        &self,
        request: &StepwiseRequest
    ) -> Result<StepwiseResponse, GenerationError> {
        self.run::<StepwiseGuidance>(request).await
    }

    pub async fn get_topics_for_language(
        &self,
        request: &TopicsRequest
    ) -> Result<TopicsResponse, GenerationError> {
        self.run::<GetTopicsForLanguage>(request).await
    }

    pub async fn get_topic_information(
        &self,
        request: &TopicInfoRequest
    ) -> Result<TopicContent, GenerationError> {
        self.run::<GetTopicInformation>(request).await
    }

    pub async fn generate_quiz(&self, request: &QuizRequest) -> Result<QuizResponse, GenerationError> {
        self.run::<GenerateQuiz>(request).await
    }
}
