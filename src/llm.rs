//! Language-model client for answer generation.
//!
//! The fill and chat pipelines only need one operation: send a prompt, get
//! text back. Two providers are supported:
//! - **openai** — `POST /v1/chat/completions`, key from `OPENAI_API_KEY`.
//! - **ollama** — `POST {url}/api/generate` against a local Ollama instance.
//!
//! Every call goes through the same retry envelope as the embedding
//! providers (exponential backoff on 429/5xx/network errors, immediate
//! failure on other client errors).

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::LlmConfig;

/// Generate a completion for `prompt` using the configured provider.
pub async fn generate(config: &LlmConfig, prompt: &str) -> Result<String> {
    match config.provider.as_str() {
        "openai" => generate_openai(config, prompt).await,
        "ollama" => generate_ollama(config, prompt).await,
        other => bail!("Unknown llm provider: {}", other),
    }
}

async fn generate_openai(config: &LlmConfig, prompt: &str) -> Result<String> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let url = config
        .url
        .as_deref()
        .unwrap_or("https://api.openai.com/v1")
        .trim_end_matches('/')
        .to_string();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model,
        "messages": [{"role": "user", "content": prompt}],
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{}/chat/completions", url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_openai_chat_response(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err =
                        Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("OpenAI API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
}

fn parse_openai_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

async fn generate_ollama(config: &LlmConfig, prompt: &str) -> Result<String> {
    let url = config.url.as_deref().unwrap_or("http://localhost:11434");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model,
        "prompt": prompt,
        "stream": false,
        "options": {
            "num_predict": config.max_tokens,
            "temperature": config.temperature,
        }
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{}/api/generate", url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_ollama_generate_response(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err =
                        Some(anyhow::anyhow!("Ollama API error {}: {}", status, body_text));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("Ollama API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    url,
                    e
                ));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama generation failed after retries")))
}

fn parse_ollama_generate_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_openai_chat_shape() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Diesel generator, 40 kVA.  "}}]
        });
        assert_eq!(
            parse_openai_chat_response(&json).unwrap(),
            "Diesel generator, 40 kVA."
        );
    }

    #[test]
    fn parse_openai_chat_missing_content() {
        let json = serde_json::json!({"choices": []});
        assert!(parse_openai_chat_response(&json).is_err());
    }

    #[test]
    fn parse_ollama_generate_shape() {
        let json = serde_json::json!({"model": "gemma2", "response": "No information found in context"});
        assert_eq!(
            parse_ollama_generate_response(&json).unwrap(),
            "No information found in context"
        );
    }

    #[test]
    fn parse_ollama_generate_missing_field() {
        assert!(parse_ollama_generate_response(&serde_json::json!({"done": true})).is_err());
    }
}
