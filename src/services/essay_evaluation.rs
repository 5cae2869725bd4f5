use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::{Settings, MAX_ESSAY_RETRIES};

#[derive(Debug, Error)]
pub(crate) enum EvaluationError {
    #[error("essay scorer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("essay scorer returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("essay scorer reply has no candidate text")]
    Envelope,
    #[error("essay scorer reply is not a score: {0:?}")]
    Unparsable(String),
}

impl EvaluationError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::Transport(_) | Self::Status { .. } => "failed",
            Self::Envelope => "malformed",
            Self::Unparsable(_) => "unparsable",
        }
    }
}

/// Backend that turns a grading prompt into the model's raw reply text.
#[async_trait]
pub(crate) trait EssayScorer: Send + Sync {
    async fn request_score(&self, prompt: &str) -> Result<String, EvaluationError>;
}

pub(crate) fn build_prompt(question: &str, answer: &str, max_score: f64) -> String {
    format!(
        "Evaluate the following essay answer:\n\
         Question: \"{question}\"\n\
         Student Answer: \"{answer}\"\n\n\
         Assign a score from 0 to {max_score:.2} based on how well the answer satisfies the question.\n\
         Give a full score if highly relevant, partial if somewhat relevant, low if irrelevant.\n\
         Return only the score as a plain number."
    )
}

/// Reads the leading `[+-]?digits[.digits]` token of a reply.
pub(crate) fn parse_leading_score(reply: &str) -> Option<f64> {
    let text = reply.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let integer_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == integer_start {
        return None;
    }
    if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
    }

    text[..end].parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Scores one essay answer in `[0, max_score]`.
pub(crate) async fn evaluate_essay(
    scorer: &dyn EssayScorer,
    question: &str,
    answer: &str,
    max_score: f64,
) -> Result<f64, EvaluationError> {
    let prompt = build_prompt(question, answer, max_score);

    let result = scorer.request_score(&prompt).await.and_then(|reply| {
        parse_leading_score(&reply).ok_or(EvaluationError::Unparsable(reply))
    });

    match result {
        Ok(raw) => {
            metrics::counter!("essay_evaluations_total", "outcome" => "scored").increment(1);
            Ok(raw.max(0.0).min(max_score.max(0.0)))
        }
        Err(err) => {
            metrics::counter!("essay_evaluations_total", "outcome" => err.outcome()).increment(1);
            Err(err)
        }
    }
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub(crate) struct GeminiEssayScorer {
    client: Client,
    api_url: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiEssayScorer {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let essay = settings.essay();
        Self::new(
            essay.api_url.clone(),
            essay.api_key.clone(),
            Duration::from_secs(essay.request_timeout_seconds),
            essay.max_retries,
        )
    }

    pub(crate) fn new(
        api_url: String,
        api_key: String,
        timeout: Duration,
        max_retries: u32,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .build()
            .context("Failed to build essay scorer HTTP client")?;

        Ok(Self { client, api_url, api_key, max_retries: max_retries.min(MAX_ESSAY_RETRIES) })
    }

    async fn send_once(&self, payload: &Value) -> Result<Value, EvaluationError> {
        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluationError::Status { status, body });
        }

        response.json::<Value>().await.map_err(|_| EvaluationError::Envelope)
    }
}

#[async_trait]
impl EssayScorer for GeminiEssayScorer {
    async fn request_score(&self, prompt: &str) -> Result<String, EvaluationError> {
        let payload = json!({"contents": [{"parts": [{"text": prompt}]}]});
        let timer = Instant::now();

        let mut attempt = 0;
        let body = loop {
            match self.send_once(&payload).await {
                Ok(body) => break body,
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    tracing::warn!(attempt, error = %err, "Essay scorer call failed; retrying");
                    tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };

        let text = body
            .get("candidates")
            .and_then(|candidates| candidates.get(0))
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|part| part.get("text"))
            .and_then(Value::as_str)
            .ok_or(EvaluationError::Envelope)?;

        tracing::debug!(
            duration_seconds = timer.elapsed().as_secs_f64(),
            attempts = attempt + 1,
            "Essay scorer replied"
        );

        Ok(text.to_string())
    }
}
