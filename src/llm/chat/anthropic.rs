use async_trait::async_trait;
use std::error::Error as StdError;
use log::info;

use super::{ChatClient, CompletionResponse, complete_with_provider};
use crate::llm::{LlmConfig, LlmType};
use rllm::builder::{LLMBackend, LLMBuilder};
use rllm::LLMProvider;

const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

pub struct AnthropicChatClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    model: String,
    base_url: Option<String>,
}

impl AnthropicChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Anthropic)
            .api_key(api_key)
            .model(&chat_model)
            .max_tokens(DEFAULT_MAX_TOKENS)
            .stream(false);

        if let Some(url) = &base_url {
            builder = builder.base_url(url);
        }

        let llm_provider = builder.build()?;

        Ok(Self {
            llm: llm_provider,
            model: chat_model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::Anthropic {
            return Err("Invalid config type for AnthropicChatClient".into());
        }
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "Anthropic API key is required".to_string())?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for AnthropicChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        info!("AnthropicChatClient::complete() → model={}", self.model);
        complete_with_provider(self.llm.as_ref(), prompt).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}
