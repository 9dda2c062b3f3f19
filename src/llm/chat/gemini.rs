use async_trait::async_trait;
use std::error::Error as StdError;
use log::info;

use super::{ChatClient, CompletionResponse, complete_with_provider};
use crate::llm::{LlmConfig, LlmType};
use rllm::builder::{LLMBackend, LLMBuilder};
use rllm::LLMProvider;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

/// Google Gemini through the `rllm` Google backend. Answers arrive as plain text and
/// are decoded by the caller.
pub struct GeminiChatClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    model: String,
    base_url: Option<String>,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let model = model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(api_key)
            .model(&model)
            .stream(false);
        if let Some(url) = &base_url {
            builder = builder.base_url(url);
        }

        Ok(Self {
            llm: builder.build()?,
            model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::Gemini {
            return Err("Invalid config type for GeminiChatClient".into());
        }
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "Google API key is required for GeminiChatClient".to_string())?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        info!("Gemini completion → model={} prompt_chars={}", self.model, prompt.len());
        complete_with_provider(self.llm.as_ref(), prompt).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}
