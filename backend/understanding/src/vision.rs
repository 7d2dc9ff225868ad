/// Vision providers: send one image plus a prompt to a vision LLM.
use async_trait::async_trait;
use docsnap_core::{InferenceApi, InferenceError, VisionRequest};
use serde_json::Value;
use tracing::info;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Read an error body, keeping it short enough for a log line.
async fn provider_error(resp: reqwest::Response) -> InferenceError {
    let status = resp.status().as_u16();
    let mut message = resp.text().await.unwrap_or_default();
    message.truncate(512);
    InferenceError::Provider { status, message }
}

async fn read_json(resp: reqwest::Response) -> Result<Value, InferenceError> {
    let status = resp.status().as_u16();
    resp.json().await.map_err(|e| InferenceError::Provider {
        status,
        message: format!("unreadable response body: {e}"),
    })
}

/// OpenAI-compatible chat completions with an `image_url` data URI.
pub struct OpenAiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiVision {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl InferenceApi for OpenAiVision {
    fn name(&self) -> &str {
        "openai"
    }

    async fn infer(&self, request: &VisionRequest) -> Result<Option<String>, InferenceError> {
        info!(model = %self.model, "[Vision] extracting text via OpenAI");
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": request.prompt },
                    { "type": "image_url",
                      "image_url": { "url": format!("data:{};base64,{}", request.content_type, request.image_base64) } }
                ]
            }],
            "max_tokens": request.max_tokens
        });
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }
        let json = read_json(resp).await?;
        Ok(json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string))
    }
}

/// Gemini `generateContent` with `inlineData`.
pub struct GeminiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiVision {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl InferenceApi for GeminiVision {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn infer(&self, request: &VisionRequest) -> Result<Option<String>, InferenceError> {
        info!(model = %self.model, "[Vision] extracting text via Gemini");
        let body = serde_json::json!({
            "contents": [{ "parts": [
                { "text": request.prompt },
                { "inlineData": { "mimeType": request.content_type, "data": request.image_base64 } }
            ]}],
            "generationConfig": { "maxOutputTokens": request.max_tokens }
        });
        let resp = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }
        let json = read_json(resp).await?;
        // Multi-part answers are concatenated.
        let text: String = json["candidates"][0]["content"]["parts"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|part| part["text"].as_str())
            .collect();
        Ok(Some(text).filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> VisionRequest {
        VisionRequest {
            prompt: "read it".into(),
            image_base64: "AAAA".into(),
            content_type: "image/png".into(),
            max_tokens: 1024,
        }
    }

    #[tokio::test]
    async fn openai_sends_data_uri_and_reads_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 1024,
                "messages": [{ "content": [
                    { "type": "text", "text": "read it" },
                    { "image_url": { "url": "data:image/png;base64,AAAA" } }
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "INVOICE #42" } }]
            })))
            .mount(&server)
            .await;

        let vision = OpenAiVision::new(reqwest::Client::new(), "sk-test")
            .with_model("gpt-4o-mini")
            .with_base_url(server.uri());
        let out = vision.infer(&request()).await.unwrap();
        assert_eq!(out.as_deref(), Some("INVOICE #42"));
    }

    #[tokio::test]
    async fn openai_error_status_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let vision = OpenAiVision::new(reqwest::Client::new(), "sk").with_base_url(server.uri());
        let err = vision.infer(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Provider { status: 429, .. }));
    }

    #[tokio::test]
    async fn gemini_sends_inline_data_and_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "AIza-test"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "parts": [
                    { "text": "read it" },
                    { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Line 1\n" }, { "text": "Line 2" }] } }]
            })))
            .mount(&server)
            .await;

        let vision = GeminiVision::new(reqwest::Client::new(), "AIza-test").with_base_url(server.uri());
        let out = vision.infer(&request()).await.unwrap();
        assert_eq!(out.as_deref(), Some("Line 1\nLine 2"));
    }

    #[tokio::test]
    async fn gemini_without_candidates_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let vision = GeminiVision::new(reqwest::Client::new(), "k").with_base_url(server.uri());
        assert_eq!(vision.infer(&request()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let vision = OpenAiVision::new(reqwest::Client::new(), "sk").with_base_url("http://127.0.0.1:1");
        let err = vision.infer(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Transport(_)));
    }
}
