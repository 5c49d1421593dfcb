use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::{debug, warn};

use super::schema::tool_input_schema;
use super::wire::{MessagesRequest, MessagesResponse, ToolDefinition, WireMessage};
use super::AnalysisResult;
use crate::traits::PostAnalyzer;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const TOOL_NAME: &str = "record_post_analysis";
const MAX_POST_BYTES: usize = 12_000;

const SYSTEM_PROMPT: &str = r#"You analyze student posts from university social-media groups.

Each post may discuss one academic department ("cátedra"): a course and the teaching staff behind it. You receive the post text and the list of known department names.

## Department
- Pick the department the post is mainly about and copy its name exactly as written in the list.
- If the post names a department that is not in the list, return the name as written in the post.
- If the post is not about any department, return an empty department_name.

## Recommendation
- Summarize the advice or opinion in one or two sentences, in the language of the post.
- Do not include personal names of students. Instructor names may stay.

## Sentiment
- "positive": the post recommends the department or praises it.
- "negative": the post warns against it or complains.
- "neutral": questions, logistics, or mixed opinions.

## Confidence
- Between 0 and 1: how sure you are that the post is about the chosen department."#;

/// Analysis capability backed by the Anthropic Messages API.
///
/// The model is forced to call a single tool whose input schema is
/// [`AnalysisResult`], so the answer always arrives as structured JSON.
#[derive(Clone)]
pub struct ClaudeAnalyzer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeAnalyzer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn build_request(&self, text: &str, candidates: &[String]) -> MessagesRequest {
        let list = candidates
            .iter()
            .map(|name| format!("- {name}"))
            .collect::<Vec<_>>()
            .join("\n");
        let post = truncate_to_char_boundary(text, MAX_POST_BYTES);
        let user_prompt = format!("Known departments:\n{list}\n\n---\n\nPost:\n{post}");

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![WireMessage::user(user_prompt)],
            temperature: 0.0,
            tools: vec![ToolDefinition {
                name: TOOL_NAME.to_string(),
                description: "Record the analysis of one post.".to_string(),
                input_schema: tool_input_schema::<AnalysisResult>(),
            }],
            tool_choice: serde_json::json!({
                "type": "tool",
                "name": TOOL_NAME,
            }),
        }
    }

    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);

        debug!(model = %request.model, "Claude analysis request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Claude API error ({}): {}", status, error_text));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PostAnalyzer for ClaudeAnalyzer {
    async fn analyze(&self, text: &str, candidates: &[String]) -> Result<Option<AnalysisResult>> {
        let request = self.build_request(text, candidates);
        let response = self.send(&request).await?;
        interpret_response(&response)
    }
}

/// Turn a Messages API response into the capability contract: a missing tool
/// call or an empty department means "no result".
pub(crate) fn interpret_response(response: &MessagesResponse) -> Result<Option<AnalysisResult>> {
    let Some(input) = response.tool_input(TOOL_NAME) else {
        warn!(
            stop_reason = ?response.stop_reason,
            text = %response.text(),
            "No tool call in Claude response"
        );
        return Ok(None);
    };

    let mut result: AnalysisResult = serde_json::from_value(input.clone())
        .context("Failed to deserialize analysis tool input")?;

    let name = result.department_name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    result.department_name = name.to_string();

    if !result.confidence.is_finite() {
        result.confidence = 0.0;
    }
    result.confidence = result.confidence.clamp(0.0, 1.0);

    Ok(Some(result))
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> MessagesResponse {
        serde_json::from_value(value).unwrap()
    }

    fn tool_response(input: serde_json::Value) -> MessagesResponse {
        response(json!({
            "content": [
                {"type": "text", "text": "Analyzing."},
                {"type": "tool_use", "id": "toolu_1", "name": TOOL_NAME, "input": input}
            ],
            "stop_reason": "tool_use"
        }))
    }

    #[test]
    fn tool_input_becomes_result() {
        let resp = tool_response(json!({
            "department_name": "  Algoritmos I ",
            "recommendation_summary": "Recomiendan el curso de la tarde.",
            "sentiment": "positive",
            "confidence": 0.92
        }));
        let result = interpret_response(&resp).unwrap().unwrap();
        assert_eq!(result.department_name, "Algoritmos I");
        assert_eq!(result.confidence, 0.92);
    }

    #[test]
    fn empty_department_is_no_result() {
        for name in ["", "   ", "none", "None"] {
            let resp = tool_response(json!({
                "department_name": name,
                "recommendation_summary": "Alguien vende apuntes.",
                "sentiment": "neutral",
                "confidence": 0.4
            }));
            assert!(interpret_response(&resp).unwrap().is_none(), "{name:?}");
        }
    }

    #[test]
    fn missing_tool_call_is_no_result() {
        let resp = response(json!({
            "content": [{"type": "text", "text": "I cannot help with that."}],
            "stop_reason": "end_turn"
        }));
        assert!(interpret_response(&resp).unwrap().is_none());
    }

    #[test]
    fn confidence_is_clamped() {
        let resp = tool_response(json!({
            "department_name": "Bases de Datos",
            "recommendation_summary": "Muy exigente.",
            "sentiment": "negative",
            "confidence": 1.7
        }));
        assert_eq!(interpret_response(&resp).unwrap().unwrap().confidence, 1.0);
    }

    #[test]
    fn malformed_tool_input_is_an_error() {
        let resp = tool_response(json!({"department_name": 42}));
        assert!(interpret_response(&resp).is_err());
    }

    #[test]
    fn unknown_content_blocks_are_ignored() {
        let resp = response(json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "tool_use", "id": "toolu_2", "name": TOOL_NAME, "input": {
                    "department_name": "Algoritmos II",
                    "recommendation_summary": "Parciales difíciles.",
                    "sentiment": "negative",
                    "confidence": 0.6
                }}
            ]
        }));
        let result = interpret_response(&resp).unwrap().unwrap();
        assert_eq!(result.department_name, "Algoritmos II");
    }

    #[test]
    fn request_lists_candidates_in_order_and_forces_the_tool() {
        let analyzer = ClaudeAnalyzer::new("sk-ant-test", "claude-haiku-4-5-20251001");
        let candidates = vec!["Algoritmos I".to_string(), "Bases de Datos".to_string()];
        let request = analyzer.build_request("Cursé Algoritmos I", &candidates);

        let prompt = &request.messages[0].content;
        let first = prompt.find("- Algoritmos I").unwrap();
        let second = prompt.find("- Bases de Datos").unwrap();
        assert!(first < second);
        assert!(prompt.ends_with("Cursé Algoritmos I"));
        assert_eq!(request.tool_choice["name"], TOOL_NAME);
        assert_eq!(request.tools[0].name, TOOL_NAME);
    }

    #[test]
    fn long_posts_are_truncated_on_char_boundary() {
        let text = "ñ".repeat(MAX_POST_BYTES);
        let truncated = truncate_to_char_boundary(&text, MAX_POST_BYTES);
        assert!(truncated.len() <= MAX_POST_BYTES);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let analyzer = ClaudeAnalyzer::new("k", "m").with_base_url("http://localhost:1234/v1/");
        assert_eq!(analyzer.base_url, "http://localhost:1234/v1");
        assert_eq!(analyzer.model(), "m");
    }
}
