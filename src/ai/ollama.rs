//! Ollama Local Enhancer
//!
//! Fix suggestions from a locally-running Ollama model.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::enhancer::Enhancer;
use super::timeout::with_timeout_map;
use crate::config::AiConfig;
use crate::constants::ai::{
    DEFAULT_TOP_K, DEFAULT_TOP_P, HEALTH_CHECK_TIMEOUT_SECS, SUGGESTION_CONFIDENCE,
};
use crate::types::{EvidocError, FixSuggestion, Result, RuleViolation};

const FIX_SYSTEM_PROMPT: &str = "You are a senior technical documentation expert. \
You receive one documentation problem found in a software repository. \
Reply with ONLY the replacement documentation text that fixes it, in markdown, \
without explanations or meta-commentary.";

pub struct OllamaEnhancer {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaEnhancer {
    pub fn new(config: &AiConfig) -> Result<Self> {
        // Validate endpoint URL for security (SSRF prevention)
        let api_base = Self::validate_endpoint(&config.api_base)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EvidocError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    /// Only allows http/https schemes and warns for non-localhost endpoints.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            EvidocError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(EvidocError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn build_request(&self, prompt: String) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt,
            system: Some(FIX_SYSTEM_PROMPT.to_string()),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                top_p: DEFAULT_TOP_P,
                top_k: DEFAULT_TOP_K,
            },
        }
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let start_time = Instant::now();
        let url = format!("{}/api/generate", self.api_base);
        debug!(model = %self.model, prompt_len = prompt.len(), "Sending request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    EvidocError::AiUnavailable(format!(
                        "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                        self.api_base
                    ))
                } else if e.is_timeout() {
                    EvidocError::AiUnavailable(
                        "Ollama request timed out. The model may be loading or too slow.".into(),
                    )
                } else {
                    EvidocError::AiUnavailable(format!("Ollama request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(500).collect();
            return Err(EvidocError::AiUnavailable(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|e| {
            EvidocError::AiUnavailable(format!("Failed to parse Ollama response: {}", e))
        })?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(EvidocError::AiUnavailable(
                "Ollama returned an empty response".into(),
            ));
        }

        debug!(
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            response_len = text.len(),
            "Ollama generation complete"
        );
        Ok(text)
    }
}

/// Prompt describing a single violation
fn fix_prompt(violation: &RuleViolation) -> String {
    let mut prompt = format!(
        "Documentation problem ({} from rule `{}`):\n{}\n\nAffected entity: {} ({})\n",
        violation.severity,
        violation.rule_name,
        violation.message,
        violation.entity_id,
        violation.entity_type
    );
    if let Some(suggestion) = &violation.suggestion {
        prompt.push_str(&format!("Guidance: {}\n", suggestion));
    }
    prompt.push_str("\nWrite the documentation text that resolves this problem.");
    prompt
}

#[async_trait]
impl Enhancer for OllamaEnhancer {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);
        let probe = self.client.get(&url).send();
        let response = with_timeout_map(
            Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS),
            probe,
            "Ollama health check",
        )
        .await?;

        match response {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(tags) = resp.json::<OllamaTagsResponse>().await {
                    let model_available = tags.models.iter().any(|m| {
                        m.name == self.model
                            || m.name.starts_with(&self.model.replace(":latest", ""))
                    });

                    if model_available {
                        info!("Ollama is available with model: {}", self.model);
                        Ok(true)
                    } else {
                        warn!(
                            "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                            self.model, self.model
                        );
                        Ok(false)
                    }
                } else {
                    info!("Ollama is available");
                    Ok(true)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }

    async fn suggest_fix(&self, violation: &RuleViolation) -> Result<FixSuggestion> {
        let suggested = self.generate(fix_prompt(violation)).await?;
        Ok(FixSuggestion {
            violation_id: violation.id.clone(),
            original: violation.message.clone(),
            suggested,
            confidence: SUGGESTION_CONFIDENCE,
        })
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ai::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
    use crate::types::{EntityType, Severity};

    fn violation() -> RuleViolation {
        RuleViolation {
            id: "api-endpoint-documented:api:GET /users@a.js:1".into(),
            rule_name: "api-endpoint-documented".into(),
            severity: Severity::Warning,
            message: "GET /users has no documentation".into(),
            entity_id: "api:GET /users@a.js:1".into(),
            entity_type: EntityType::Api,
            suggestion: Some("Add a doc comment".into()),
        }
    }

    #[test]
    fn test_default_config() {
        let enhancer = OllamaEnhancer::new(&AiConfig::default()).expect("Failed to create enhancer");
        assert_eq!(enhancer.api_base, DEFAULT_OLLAMA_URL);
        assert_eq!(enhancer.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let config = AiConfig {
            api_base: "file:///etc/passwd".into(),
            ..Default::default()
        };
        assert!(matches!(
            OllamaEnhancer::new(&config),
            Err(EvidocError::Config(_))
        ));
    }

    #[test]
    fn test_request_body() {
        let enhancer = OllamaEnhancer::new(&AiConfig::default()).unwrap();
        let body = serde_json::to_value(enhancer.build_request(fix_prompt(&violation()))).unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["options"]["top_k"], 40);
        assert!(body["system"].as_str().unwrap().contains("ONLY the replacement"));
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.contains("GET /users has no documentation"));
        assert!(prompt.contains("Guidance: Add a doc comment"));
    }

    #[tokio::test]
    async fn test_health_check_unreachable_is_false() {
        let config = AiConfig {
            api_base: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            ..Default::default()
        };
        let enhancer = OllamaEnhancer::new(&config).unwrap();
        assert!(!enhancer.health_check().await.unwrap_or(false));
    }
}
