use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for completions (ollama, openai, anthropic, gemini, groq)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "ollama")]
    pub chat_llm_type: String,

    /// Base URL for the LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the LLM provider (e.g., OpenAI, Anthropic, Gemini)
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for completions (e.g., gpt-4o-mini, llama3.1, gemini-1.5-flash-latest)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    // --- General Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Path to a prompt template file. The embedded templates are used when unset.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Host address and port for the WebSocket chat server.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Port for the HTTP API. The HTTP API is disabled when unset.
    #[arg(long, env = "HTTP_PORT")]
    pub http_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["ultravision"]).unwrap();
        assert_eq!(args.chat_llm_type, "ollama");
        assert_eq!(args.server_addr, "127.0.0.1:4000");
        assert!(args.chat_api_key.is_empty());
        assert!(args.prompts_path.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "ultravision",
            "--chat-llm-type",
            "gemini",
            "--http-port",
            "8080",
            "--debug",
        ]).unwrap();
        assert_eq!(args.chat_llm_type, "gemini");
        assert_eq!(args.http_port, Some(8080));
        assert!(args.debug);
    }
}
