use async_trait::async_trait;
use serde::{Serialize, Deserialize};

use super::{DraftError, DraftGenerator, DraftRequest};
use crate::state::DraftSettings;

const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, settings: &DraftSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    /// Build a client with the key from the environment (`.env` included)
    pub fn from_env(settings: &DraftSettings) -> Self {
        dotenvy::dotenv().ok();
        let api_key = API_KEY_VARS.iter().find_map(|var| std::env::var(var).ok());
        if api_key.is_none() {
            tracing::warn!("No Gemini API key found. Draft generation will be disabled.");
        }
        Self::new(api_key, settings)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_body(request: &DraftRequest) -> GenerateBody {
    let context = request.context.to_lines();
    let system_instruction = (!context.is_empty()).then(|| Content {
        role: None,
        parts: vec![Part { text: context.join("\n") }],
    });
    GenerateBody {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part { text: request.prompt.clone() }],
        }],
        system_instruction,
        generation_config: GenerationConfig {
            temperature: request.params.temperature,
            top_k: request.params.top_k,
            top_p: request.params.top_p,
        },
    }
}

/// Text parts of the first candidate, joined; no candidates means no text
fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().map(|p| p.text).collect::<String>())
        .unwrap_or_default()
}

#[async_trait]
impl DraftGenerator for GeminiClient {
    async fn generate(&self, request: DraftRequest) -> Result<String, DraftError> {
        let api_key = self.api_key.as_deref().ok_or(DraftError::NotConfigured)?;

        tracing::info!(
            model = %self.model,
            prompt_length = request.prompt.len(),
            temperature = request.params.temperature,
            "Requesting draft"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&build_body(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            tracing::error!(status = status.as_u16(), "Draft generation failed: {}", message);
            return Err(DraftError::Provider { status: status.as_u16(), message });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| DraftError::Malformed(e.to_string()))?;
        let text = extract_text(parsed);
        tracing::info!(generated_length = text.len(), "Draft received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{BookContext, GenerationParams};

    fn request(context: BookContext) -> DraftRequest {
        DraftRequest {
            prompt: "Continue a cena.".into(),
            context,
            params: GenerationParams { temperature: 0.9, top_k: 40, top_p: 0.95 },
        }
    }

    #[test]
    fn body_matches_generate_content_shape() {
        let body = build_body(&request(BookContext { tone: "Sombrio".into(), ..Default::default() }));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Continue a cena.");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Tone: Sombrio");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["topK"], 40);
    }

    #[test]
    fn empty_context_has_no_system_instruction() {
        let json = serde_json::to_value(build_body(&request(BookContext::default()))).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn joins_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Era "}, {"text": "uma vez."}]}}, {"content": {"parts": [{"text": "outra"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response), "Era uma vez.");

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_text(empty), "");
    }

    #[test]
    fn endpoint_uses_model_and_trims_base() {
        let settings = DraftSettings { base_url: "http://localhost:8080/".into(), ..Default::default() };
        let client = GeminiClient::new(Some("k".into()), &settings);
        assert_eq!(client.endpoint(), "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent");
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = GeminiClient::new(Some("   ".into()), &DraftSettings::default());
        assert!(!client.is_configured());
        let err = client.generate(request(BookContext::default())).await.unwrap_err();
        assert!(matches!(err, DraftError::NotConfigured));
    }
}
