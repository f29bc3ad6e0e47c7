//! OpenAI-compatible chat-completions provider.

use super::{schema_context, strip_code_fences, AiError, AiProvider};
use crate::config::AiConfig;
use crate::database::Schema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const NL2SQL_SYSTEM_PROMPT: &str = "You are a SQL expert. Convert the following natural language request into a valid SQL query.
Only respond with the SQL query, no explanations or markdown formatting.
Do not include any backticks or code blocks in your response.";

const REFACTOR_SYSTEM_PROMPT: &str = "You are a SQL expert. Modify the following SQL query based on the given instruction.
Only respond with the modified SQL query, no explanations or markdown formatting.
Do not include any backticks or code blocks in your response.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let model = if config.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, system: &str, user: &str) -> Result<String, AiError> {
        if !self.is_configured() {
            return Err(AiError::NotConfigured("OpenAI".to_string()));
        }

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        tracing::debug!(model = %self.model, "Sending chat completion request");
        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        extract_content(response)
    }
}

fn extract_content(response: ChatResponse) -> Result<String, AiError> {
    if let Some(error) = response.error {
        return Err(AiError::Api(error.message));
    }
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(AiError::EmptyResponse)?;
    Ok(strip_code_fences(&choice.message.content))
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn nl2sql(&self, prompt: &str, schema: Option<&Schema>) -> Result<String, AiError> {
        let user = format!("{}\n\nUser request: {}", schema_context(schema), prompt);
        self.call(NL2SQL_SYSTEM_PROMPT, &user).await
    }

    async fn refactor_sql(
        &self,
        sql: &str,
        instruction: &str,
        schema: Option<&Schema>,
    ) -> Result<String, AiError> {
        let user = format!(
            "{}\n\nOriginal SQL:\n{}\n\nInstruction: {}",
            schema_context(schema),
            sql,
            instruction
        );
        self.call(REFACTOR_SYSTEM_PROMPT, &user).await
    }
}
