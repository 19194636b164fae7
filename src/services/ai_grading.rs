use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::db::types::StrictnessLevel;

const MISSING_FEEDBACK: &str = "The grading service did not return feedback.";

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("grading service request failed: {0}")]
    Transport(String),
    #[error("grading service timed out after {0}s")]
    Timeout(u64),
    #[error("grading service returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("grading service returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GradeRequest<'a> {
    pub(crate) answer_text: &'a str,
    pub(crate) rubric_text: &'a str,
    pub(crate) total_points: f64,
    pub(crate) strictness: StrictnessLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradeOutcome {
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) feedback: String,
    pub(crate) grading_standard: String,
}

/// Marks one answer against a rubric. Implementations must not retry on their own.
#[async_trait]
pub(crate) trait AnswerScorer: Send + Sync {
    async fn grade(&self, request: GradeRequest<'_>) -> Result<GradeOutcome, GradingError>;
}

/// Chat-completions client for Mistral and other OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub(crate) struct ChatCompletionScorer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    timeout_seconds: u64,
}

impl ChatCompletionScorer {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let ai = settings.ai();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(ai.request_timeout_seconds))
            .build()
            .context("Failed to build grading HTTP client")?;

        Ok(Self {
            client,
            api_key: ai.api_key.clone(),
            base_url: ai.base_url.trim_end_matches('/').to_string(),
            model: ai.model.clone(),
            max_tokens: ai.max_tokens,
            temperature: ai.temperature,
            timeout_seconds: ai.request_timeout_seconds,
        })
    }

    async fn call(&self, request: GradeRequest<'_>) -> Result<GradeOutcome, GradingError> {
        if self.api_key.is_empty() {
            return Err(GradingError::Transport("AI_API_KEY is not configured".to_string()));
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt(request.strictness, request.total_points)},
                {"role": "user", "content": user_prompt(&request)}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await.map_err(
                |err| {
                    if err.is_timeout() {
                        GradingError::Timeout(self.timeout_seconds)
                    } else {
                        GradingError::Transport(err.to_string())
                    }
                },
            )?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| GradingError::InvalidResponse(format!("non-JSON body: {err}")))?;

        if !status.is_success() {
            return Err(GradingError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| GradingError::InvalidResponse("missing message content".to_string()))?;

        let reply = parse_reply(content)?;

        Ok(GradeOutcome {
            score: clamp_score(reply.score, request.total_points),
            total_points: request.total_points,
            feedback: reply.feedback,
            grading_standard: request.strictness.name().to_string(),
        })
    }
}

#[async_trait]
impl AnswerScorer for ChatCompletionScorer {
    async fn grade(&self, request: GradeRequest<'_>) -> Result<GradeOutcome, GradingError> {
        let timer = Instant::now();
        tracing::info!(
            model = %self.model,
            strictness = i16::from(request.strictness),
            total_points = request.total_points,
            "Sending grading request"
        );

        let result = self.call(request).await;
        let elapsed = timer.elapsed().as_secs_f64();

        match &result {
            Ok(outcome) => {
                metrics::record_grading("success", elapsed);
                tracing::info!(
                    score = outcome.score,
                    total_points = outcome.total_points,
                    duration_seconds = elapsed,
                    "Grading completed"
                );
            }
            Err(err) => {
                metrics::record_grading("error", elapsed);
                tracing::warn!(error = %err, duration_seconds = elapsed, "Grading failed");
            }
        }

        result
    }
}

fn system_prompt(strictness: StrictnessLevel, total_points: f64) -> String {
    let rules =
        strictness.rules().iter().map(|rule| format!("- {rule}")).collect::<Vec<_>>().join("\n");

    format!(
        "You are an expert exam grader using the {name} grading standard. Your task is to:\n\
         1. Grade the student's answer based on the provided rubric\n\
         2. Provide a score out of {total_points} points\n\
         3. Give detailed feedback explaining the grading\n\
         4. Be objective and consistent in your grading\n\
         5. Format your response as JSON with 'score', 'total_points', and 'feedback' fields\n\n\
         Grading Standard: {description}\n\n\
         IMPORTANT GRADING RULES - YOU MUST FOLLOW THESE EXACTLY:\n{rules}\n\n\
         Additional Notes:\n\
         - Only the Academic standard should care about spelling and grammar\n\
         - Be willing to give full marks when deserved",
        name = strictness.name(),
        description = strictness.description(),
    )
}

fn user_prompt(request: &GradeRequest<'_>) -> String {
    format!(
        "Please grade this answer based on the rubric provided:\n\n\
         Rubric:\n{rubric}\n\n\
         Student's Answer:\n{answer}\n\n\
         Remember to follow the {name} grading standard as specified.\n\n\
         Provide your response in the following JSON format:\n\
         {{\n    \"score\": <numeric_score>,\n    \"total_points\": {total},\n    \"feedback\": \"<detailed_feedback>\"\n}}",
        rubric = request.rubric_text,
        answer = request.answer_text,
        name = request.strictness.name(),
        total = request.total_points,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoringReply {
    pub(crate) score: f64,
    pub(crate) feedback: String,
}

#[derive(Deserialize)]
struct RawReply {
    score: Option<Value>,
    feedback: Option<String>,
}

/// Reads the model's reply. Well-formed JSON wins; otherwise the `score` and
/// `feedback` fields are scraped from the raw text. A missing score counts as 0.
pub(crate) fn parse_reply(content: &str) -> Result<ScoringReply, GradingError> {
    let lowered = content.to_ascii_lowercase();
    if !lowered.contains("score") && !lowered.contains("feedback") {
        return Err(GradingError::InvalidResponse(
            "reply has neither a score nor feedback".to_string(),
        ));
    }

    if let Some(raw) = json_object(content).and_then(|slice| serde_json::from_str::<RawReply>(slice).ok())
    {
        let score = raw.score.as_ref().and_then(number_from_value).unwrap_or(0.0);
        let feedback = raw
            .feedback
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| MISSING_FEEDBACK.to_string());
        return Ok(ScoringReply { score, feedback });
    }

    let score = score_pattern()
        .and_then(|pattern| pattern.captures(content))
        .and_then(|caps| caps.get(1))
        .and_then(|value| value.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let feedback = feedback_pattern()
        .and_then(|pattern| pattern.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_string())
        .unwrap_or_else(|| MISSING_FEEDBACK.to_string());

    Ok(ScoringReply { score, feedback })
}

/// Maximum points for a question: an explicit "(N points)" marker in the rubric,
/// then in the answer, then the fallback.
pub(crate) fn resolve_total_points(rubric_text: &str, answer_text: &str, fallback: f64) -> f64 {
    let Some(pattern) = total_points_pattern() else {
        return fallback;
    };

    [rubric_text, answer_text]
        .into_iter()
        .find_map(|text| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|value| value.as_str().parse::<f64>().ok())
                .filter(|points| *points > 0.0)
        })
        .unwrap_or(fallback)
}

pub(crate) fn clamp_score(score: f64, total_points: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(0.0, total_points.max(0.0))
}

fn json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn upstream_message(body: &Value) -> String {
    body.get("error")
        .and_then(|error| error.get("message").and_then(Value::as_str).or_else(|| error.as_str()))
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.get("detail").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

fn total_points_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\((\d+)[\s,]*(?:points|pts|marks|mks)\)").ok()).as_ref()
}

fn score_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""score":\s*(\d+(?:\.\d+)?)"#).ok()).as_ref()
}

fn feedback_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""feedback":\s*"([^"]+)""#).ok()).as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_points_prefers_rubric_marker() {
        assert_eq!(resolve_total_points("Q1 (20 marks)", "answer (5 points)", 10.0), 20.0);
        assert_eq!(resolve_total_points("no marker", "answer (5 PTS)", 10.0), 5.0);
        assert_eq!(resolve_total_points("none", "none", 12.5), 12.5);
        assert_eq!(resolve_total_points("(0 points)", "", 10.0), 10.0);
    }

    #[test]
    fn parses_clean_json_reply() {
        let reply =
            parse_reply(r#"{"score": 7.5, "total_points": 10, "feedback": "Solid answer."}"#)
                .expect("reply");
        assert_eq!(reply, ScoringReply { score: 7.5, feedback: "Solid answer.".to_string() });
    }

    #[test]
    fn parses_fenced_json_with_string_score() {
        let reply = parse_reply("Here you go:\n```json\n{\"score\": \"6\", \"feedback\": \"ok\"}\n```")
            .expect("reply");
        assert_eq!(reply.score, 6.0);
        assert_eq!(reply.feedback, "ok");
    }

    #[test]
    fn falls_back_to_scraping_broken_json() {
        let reply =
            parse_reply(r#"{"score": 4, "feedback": "Missing the key idea", trailing"#).expect("reply");
        assert_eq!(reply.score, 4.0);
        assert_eq!(reply.feedback, "Missing the key idea");
    }

    #[test]
    fn rejects_reply_without_score_or_feedback() {
        assert!(matches!(parse_reply("I cannot help"), Err(GradingError::InvalidResponse(_))));
    }

    #[test]
    fn clamps_scores_into_range() {
        assert_eq!(clamp_score(12.0, 10.0), 10.0);
        assert_eq!(clamp_score(-1.0, 10.0), 0.0);
        assert_eq!(clamp_score(f64::NAN, 10.0), 0.0);
        assert_eq!(clamp_score(6.5, 10.0), 6.5);
    }

    #[test]
    fn system_prompt_carries_strictness_rules() {
        let prompt = system_prompt(StrictnessLevel::ContentFocus, 10.0);
        assert!(prompt.contains("Content Focus grading standard"));
        assert!(prompt.contains("- COMPLETELY IGNORE all spelling mistakes"));
        assert!(prompt.contains("score out of 10 points"));
    }
}
