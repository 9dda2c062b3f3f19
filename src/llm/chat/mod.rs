pub mod ollama;
pub mod openai;
pub mod gemini;
pub mod anthropic;
pub mod groq;

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error as StdError;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use self::gemini::GeminiChatClient;
use self::anthropic::AnthropicChatClient;
use self::groq::GroqChatClient;
use rllm::{ chat::{ ChatMessage, ChatRole, MessageType }, LLMProvider };

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// One-shot completion against a hosted model. Adapters ask the provider for a JSON
/// answer where the API supports it; callers still decode defensively.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Anthropic => {
            let specific_client = AnthropicChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Groq => {
            let specific_client = GroqChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

pub(crate) async fn complete_with_provider(
    llm: &(dyn LLMProvider + Send + Sync),
    prompt: &str
) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
    let messages = vec![ChatMessage {
        role: ChatRole::User,
        content: prompt.to_string(),
        message_type: MessageType::Text,
    }];
    let resp = llm.chat(&messages).await?;
    let text = resp
        .text()
        .map(|s| s.to_string())
        .unwrap_or_else(|| resp.to_string());
    Ok(CompletionResponse { response: text })
}
