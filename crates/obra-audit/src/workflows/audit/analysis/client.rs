use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{AnalysisError, AnalysisGateway, AnalysisPayload, AnalysisResult};
use crate::config::AnalysisConfig;

const SYSTEM_PROMPT: &str = "You are a labor and safety compliance analyst for construction sites. \
Score the audit from 0 (fully compliant) to 100 (critical exposure). Weigh irregular \
subcontracting, unregistered workers, missing fall protection and insufficient interview \
coverage heavily. Answer with a single JSON object with the keys overallIndex, classification, \
legalRisk, financialExposure, nonConformities, legalImpact, recommendations, \
executiveConclusion and calculationBreakdown.";

/// OpenAI-compatible chat-completions client.
pub struct HttpAnalysisClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpAnalysisClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }

    /// Returns `None` when no endpoint is configured.
    pub fn from_config(config: &AnalysisConfig) -> Result<Option<Self>, AnalysisError> {
        let Some(endpoint) = config.endpoint.as_ref() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;
        Ok(Some(Self::new(
            endpoint.clone(),
            config.api_key.clone(),
            config.model.clone(),
            client,
        )))
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisClient {
    async fn analyze(&self, payload: &AnalysisPayload) -> Result<AnalysisResult, AnalysisError> {
        let audit = serde_json::to_string(payload)
            .map_err(|err| AnalysisError::Malformed(err.to_string()))?;
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": audit },
            ],
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
        });

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: serde_json::Value = response
            .json()
            .await
            .map_err(|err| AnalysisError::Malformed(err.to_string()))?;
        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AnalysisError::Malformed("response carried no message content".to_string()))?;

        parse_result(content)
    }
}

/// Parse the model's message into a validated result.
pub(crate) fn parse_result(content: &str) -> Result<AnalysisResult, AnalysisError> {
    let object = extract_json_object(content)
        .ok_or_else(|| AnalysisError::Malformed("no JSON object in message content".to_string()))?;
    let result: AnalysisResult =
        serde_json::from_str(object).map_err(|err| AnalysisError::Malformed(err.to_string()))?;
    result.validate()
}

/// First balanced `{...}` in `content`, skipping code fences and prose around it.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
