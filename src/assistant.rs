use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig, PromptError };
use crate::flows::Generator;
use crate::llm::chat::{ new_client, ChatClient };
use crate::llm::{ parse_llm_type, LlmConfig };

use log::info;
use std::error::Error;
use std::sync::Arc;

/// Wires the configured provider and prompt templates into a shared `Generator`.
pub struct Assistant {
    generator: Arc<Generator>,
    prompts_path: Option<String>,
}

impl Assistant {
    fn initialize_llm_client(args: &Args) -> Result<Arc<dyn ChatClient>, Box<dyn Error + Send + Sync>> {
        let llm_type = parse_llm_type(&args.chat_llm_type)?;
        let api_key = if !args.chat_api_key.is_empty() {
            Some(args.chat_api_key.clone())
        } else {
            None
        };
        let config = LlmConfig {
            llm_type,
            base_url: args.chat_base_url.clone(),
            api_key,
            completion_model: args.chat_model.clone(),
        };
        let client = new_client(&config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={:?}",
            args.chat_llm_type,
            client.get_model(),
            client.get_base_url().as_deref().unwrap_or("adapter default")
        );
        Ok(client)
    }

    fn load_prompt_config(args: &Args) -> Result<Arc<PromptConfig>, PromptError> {
        match &args.prompts_path {
            Some(path) => prompt::load_prompts(path),
            None => {
                let config = PromptConfig::builtin()?;
                info!("Using {} built-in prompt templates", config.templates.len());
                Ok(Arc::new(config))
            }
        }
    }

    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let client = Self::initialize_llm_client(args)?;
        let prompts = Self::load_prompt_config(args)?;
        Ok(Self::from_parts(client, prompts, args.prompts_path.clone()))
    }

    pub fn from_parts(
        client: Arc<dyn ChatClient>,
        prompts: Arc<PromptConfig>,
        prompts_path: Option<String>
    ) -> Self {
        Self {
            generator: Arc::new(Generator::new(client, prompts)),
            prompts_path,
        }
    }

    pub fn generator(&self) -> Arc<Generator> {
        Arc::clone(&self.generator)
    }

    /// Re-reads the prompt file when it changed on disk. Always `false` for the
    /// embedded templates.
    pub fn reload_prompts_if_changed(&self) -> Result<bool, PromptError> {
        let Some(path) = &self.prompts_path else {
            return Ok(false);
        };
        match prompt::reload_prompts_if_changed(path, &self.generator.prompts())? {
            Some(new_config) => {
                self.generator.replace_prompts(new_config);
                info!("Prompts successfully reloaded from {}", path);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
