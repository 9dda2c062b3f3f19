use async_trait::async_trait;
use log::info;
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION}};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use super::{ChatClient, CompletionResponse};
use crate::llm::LlmConfig;

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<bool>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| "gpt-4o-mini".to_string());
        let api_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "OpenAI API key is required".to_string())?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = self.completions_url();

        let messages = vec![OpenAIMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];

        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages,
            temperature: 0.7,
            response_format: Some(ResponseFormat { format_type: "json_object".to_string() }),
            max_completion_tokens: Some(4096),
            store: Some(false),
        };

        info!("OpenAIChatClient::complete() → model={} url={}", self.model, url);
        let resp = self.http.post(&url)
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIResponse>()
            .await?;

        let content = resp.choices.into_iter().next()
            .ok_or_else(|| "No response from OpenAI API".to_string())?
            .message.content;

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn complete_sends_bearer_key_and_reads_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({
                        "choices": [
                            { "message": { "role": "assistant", "content": "{\"topics\":[\"Closures\"]}" } }
                        ]
                    }));
            }).await;

        let client = OpenAIChatClient::new(
            "sk-test".to_string(),
            None,
            Some(server.base_url())
        ).unwrap();
        let resp = client.complete("topics please").await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.response, "{\"topics\":[\"Closures\"]}");
    }

    #[tokio::test]
    async fn complete_fails_without_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({ "choices": [] }));
            }).await;

        let client = OpenAIChatClient::new("sk-test".into(), None, Some(server.base_url())).unwrap();
        let err = client.complete("hello").await.unwrap_err();
        assert!(err.to_string().contains("No response"));
    }

    #[test]
    fn completions_url_accepts_versioned_and_full_bases() {
        let client = OpenAIChatClient::new(
            "k".into(),
            None,
            Some("https://example.test/v1/".into())
        ).unwrap();
        assert_eq!(client.completions_url(), "https://example.test/v1/chat/completions");

        let client = OpenAIChatClient::new(
            "k".into(),
            None,
            Some("https://example.test/v1/chat/completions".into())
        ).unwrap();
        assert_eq!(client.completions_url(), "https://example.test/v1/chat/completions");
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = LlmConfig {
            llm_type: crate::llm::LlmType::OpenAI,
            ..LlmConfig::default()
        };
        assert!(OpenAIChatClient::from_config(&config).is_err());
    }
}
