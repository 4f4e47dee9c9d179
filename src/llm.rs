use crate::config::{LLMConfig, LLMProvider};
use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Fixed instruction sent for every function. `{name}` and `{code}` are filled verbatim.
pub const PROMPT_TEMPLATE: &str = r#"
You are a software patent analyst. Analyze the following Python function and:
1. Explain what it does in simple terms.
2. Assess whether the logic could be patentable (novel, clever, or non-obvious).
3. Suggest a short search query for patent lookup.

Function: {name}
Code:
{code}

Respond with:
- Summary
- Patentability (yes/no/maybe) + brief reasoning
- Suggested search phrase
"#;

pub fn build_prompt(function_name: &str, code: &str) -> String {
    // Substitute the code last so braces inside it are never re-expanded.
    PROMPT_TEMPLATE
        .replacen("{name}", function_name, 1)
        .replacen("{code}", code, 1)
}

pub struct LLMClient {
    config: LLMConfig,
    client: Client,
}

impl LLMClient {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    /// Send one prompt and return the model's raw text. No retries happen here.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        match self.config.provider {
            LLMProvider::OpenAI => self.complete_with_openai(prompt).await,
            LLMProvider::Ollama => self.complete_with_ollama(prompt).await,
            LLMProvider::Anthropic => self.complete_with_anthropic(prompt).await,
        }
    }

    fn base_url(&self, default: &str) -> String {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    async fn complete_with_openai(&self, prompt: &str) -> Result<String> {
        let api_key = self.config.api_key.as_ref()
            .ok_or_else(|| anyhow!("OpenAI API key not provided"))?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        });
        tracing::debug!(model = %self.config.model, "OpenAI request: {}", payload);

        let response = self.client
            .post(format!("{}/chat/completions", self.base_url(OPENAI_BASE_URL)))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        let response_json: serde_json::Value = response.json().await?;
        tracing::debug!("OpenAI response: {}", response_json);

        response_json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid response format from OpenAI"))
    }

    async fn complete_with_ollama(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens
            }
        });
        tracing::debug!(model = %self.config.model, "Ollama request: {}", payload);

        let response = self.client
            .post(format!("{}/api/generate", self.base_url(OLLAMA_BASE_URL)))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Ollama API error ({}): {}", status, error_text));
        }

        let response_json: serde_json::Value = response.json().await?;
        tracing::debug!("Ollama response: {}", response_json);

        response_json["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid response format from Ollama"))
    }

    async fn complete_with_anthropic(&self, prompt: &str) -> Result<String> {
        let api_key = self.config.api_key.as_ref()
            .ok_or_else(|| anyhow!("Anthropic API key not provided"))?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });
        tracing::debug!(model = %self.config.model, "Anthropic request: {}", payload);

        let response = self.client
            .post(format!("{}/messages", self.base_url(ANTHROPIC_BASE_URL)))
            .header("x-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Anthropic API error ({}): {}", status, error_text));
        }

        let response_json: serde_json::Value = response.json().await?;
        tracing::debug!("Anthropic response: {}", response_json);

        response_json["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid response format from Anthropic"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_name_and_code_verbatim() {
        let code = "def f(x):\n    return {\"k\": x}";
        let prompt = build_prompt("f", code);
        assert!(prompt.contains("Function: f\n"));
        assert!(prompt.contains(code));
        assert!(prompt.contains("Patentability (yes/no/maybe)"));
        assert!(prompt.contains("Suggested search phrase"));
    }

    #[test]
    fn placeholders_inside_code_are_left_alone() {
        let code = "def fmt():\n    return '{name} {code}'";
        let prompt = build_prompt("fmt", code);
        assert!(prompt.contains("Function: fmt\n"));
        assert!(prompt.contains("return '{name} {code}'"));
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let config = LLMConfig {
            base_url: Some("http://127.0.0.1:9999/v1/".to_string()),
            ..LLMConfig::default()
        };
        let client = LLMClient::new(config).unwrap();
        assert_eq!(client.base_url(OPENAI_BASE_URL), "http://127.0.0.1:9999/v1");
    }

    #[test]
    fn default_base_url_per_provider() {
        let client = LLMClient::new(LLMConfig::default()).unwrap();
        assert_eq!(client.base_url(ANTHROPIC_BASE_URL), ANTHROPIC_BASE_URL);
    }
}
