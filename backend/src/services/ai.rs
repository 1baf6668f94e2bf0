//! AI-assisted document-to-quiz formatting through the Gemini API.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::{
    config::Config,
    error::AppError,
    models::{
        ai::{CacheStats, FormatMode},
        lesson::{Question, QuestionType, validate_questions},
    },
    services::document::DocumentContent,
};

const QUESTIONS_PROMPT: &str = r#"You are preparing physics exam practice material.
Extract every question from the document below and return ONLY a JSON array, no prose and no code fences.
Each element must look like:
{"type": "mcq" | "true_false" | "short_answer", "text": "...", "options": ["..."], "answer": "...", "explanation": "..."}
Rules:
- "answer" must be copied exactly from one of "options" for mcq and true_false questions.
- true_false questions use the options ["True", "False"].
- short_answer questions have an empty "options" array.
- Keep equations in LaTeX between $...$ and keep units.
- If the document marks no correct answer, infer it from the physics.
"#;

const CLEANUP_PROMPT: &str = r#"You are formatting physics lesson notes.
Rewrite the document below as clean Markdown: fix broken line wraps, number the questions,
put each choice on its own line as "a)", "b)", ..., and keep every equation in LaTeX between $...$.
Do not add, drop or change any content. Return only the formatted text.
"#;

fn prompt_for(mode: FormatMode) -> &'static str {
    match mode {
        FormatMode::Questions => QUESTIONS_PROMPT,
        FormatMode::Cleanup => CLEANUP_PROMPT,
    }
}

/// Backend that turns a prompt plus document into model text.
#[async_trait]
pub trait DocumentFormatter: Send + Sync {
    async fn generate(&self, prompt: &str, content: &DocumentContent) -> Result<String, AppError>;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_body(prompt: &str, content: &DocumentContent) -> Value {
        let parts = match content {
            DocumentContent::Text(text) => json!([
                { "text": prompt },
                { "text": format!("DOCUMENT:\n{}", text) },
            ]),
            DocumentContent::Pdf(bytes) => json!([
                { "text": prompt },
                {
                    "inline_data": {
                        "mime_type": "application/pdf",
                        "data": general_purpose::STANDARD.encode(bytes),
                    }
                },
            ]),
        };

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": 0.2 },
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl DocumentFormatter for GeminiClient {
    async fn generate(&self, prompt: &str, content: &DocumentContent) -> Result<String, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::UpstreamError("AI formatting is not configured (GEMINI_API_KEY missing)".to_string())
        })?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&Self::request_body(prompt, content))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Gemini rejected request: {}", detail);
            return Err(AppError::UpstreamError(format!(
                "AI service returned HTTP {}",
                status
            )));
        }

        let body: GenerateResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(AppError::UpstreamError("AI service returned no text".to_string()));
        }
        Ok(text)
    }
}

/// Question as the model writes it, before ids are assigned.
#[derive(Debug, Deserialize)]
struct QuestionDraft {
    #[serde(rename = "type")]
    question_type: QuestionType,
    text: String,
    #[serde(default)]
    options: Vec<String>,
    answer: String,
    #[serde(default)]
    explanation: Option<String>,
}

/// Drops a surrounding ```json fence if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parses model output into validated questions with fresh ids.
pub fn parse_questions(text: &str) -> Result<Vec<Question>, AppError> {
    let drafts: Vec<QuestionDraft> = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        AppError::UpstreamError(format!("AI returned malformed quiz JSON: {}", e))
    })?;

    let questions: Vec<Question> = drafts
        .into_iter()
        .map(|draft| {
            let options = match draft.question_type {
                QuestionType::TrueFalse if draft.options.is_empty() => {
                    vec!["True".to_string(), "False".to_string()]
                }
                QuestionType::ShortAnswer => Vec::new(),
                _ => draft.options.into_iter().map(|o| o.trim().to_string()).collect(),
            };
            Question {
                id: uuid::Uuid::new_v4().to_string(),
                question_type: draft.question_type,
                text: draft.text.trim().to_string(),
                options,
                answer: draft.answer.trim().to_string(),
                explanation: draft.explanation.filter(|e| !e.trim().is_empty()),
                image_url: None,
            }
        })
        .collect();

    validate_questions(&questions).map_err(|e| {
        AppError::UpstreamError(format!("AI returned an inconsistent question: {}", e.code))
    })?;
    Ok(questions)
}

/// Cached formatter output.
#[derive(Debug, Clone)]
pub struct Formatted {
    pub text: String,
    pub questions: Option<Vec<Question>>,
    pub cached: bool,
}

/// Formatter plus a TTL response cache keyed by the SHA-256 of mode and input.
pub struct AiService {
    formatter: Arc<dyn DocumentFormatter>,
    cache: Cache<String, Formatted>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AiService {
    pub fn new(formatter: Arc<dyn DocumentFormatter>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            formatter,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn cache_key(mode: FormatMode, content: &DocumentContent) -> String {
        let mut hasher = Sha256::new();
        hasher.update(mode.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn format(
        &self,
        mode: FormatMode,
        content: &DocumentContent,
    ) -> Result<Formatted, AppError> {
        let key = Self::cache_key(mode, content);

        if let Some(mut hit) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(mode = mode.as_str(), "AI cache hit");
            hit.cached = true;
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let text = self.formatter.generate(prompt_for(mode), content).await?;
        let questions = match mode {
            FormatMode::Questions => Some(parse_questions(&text)?),
            FormatMode::Cleanup => None,
        };

        let formatted = Formatted {
            text,
            questions,
            cached: false,
        };
        self.cache.insert(key, formatted.clone()).await;
        Ok(formatted)
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            hits,
            misses,
            entries: self.cache.entry_count(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Counts calls and replies with a canned response.
    struct CannedFormatter {
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentFormatter for CannedFormatter {
        async fn generate(&self, _prompt: &str, _content: &DocumentContent) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    const REPLY: &str = r#"```json
[
  {"type": "mcq", "text": "Unit of force?", "options": ["Newton", "Joule"], "answer": "Newton"},
  {"type": "true_false", "text": "Light is faster than sound.", "answer": "True"},
  {"type": "short_answer", "text": "g in m/s^2?", "options": ["x"], "answer": "9.8", "explanation": ""}
]
```"#;

    fn service() -> (Arc<CannedFormatter>, AiService) {
        let formatter = Arc::new(CannedFormatter {
            reply: REPLY.to_string(),
            calls: AtomicUsize::new(0),
        });
        let service = AiService::new(formatter.clone(), Duration::from_secs(60), 16);
        (formatter, service)
    }

    #[test]
    fn parses_fenced_json_into_questions() {
        let questions = parse_questions(REPLY).unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[1].options, vec!["True", "False"]);
        assert!(questions[2].options.is_empty());
        assert_eq!(questions[2].explanation, None);
        assert_ne!(questions[0].id, questions[1].id);
    }

    #[test]
    fn malformed_output_is_an_upstream_error() {
        assert!(matches!(parse_questions("Sure! Here you go"), Err(AppError::UpstreamError(_))));
        let wrong_answer =
            r#"[{"type": "mcq", "text": "?", "options": ["A", "B"], "answer": "C"}]"#;
        assert!(parse_questions(wrong_answer).is_err());
    }

    #[tokio::test]
    async fn repeated_input_is_served_from_cache() {
        let (formatter, service) = service();
        let content = DocumentContent::Text("1. Unit of force?".to_string());

        let first = service.format(FormatMode::Questions, &content).await.unwrap();
        let second = service.format(FormatMode::Questions, &content).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.text, second.text);
        assert_eq!(formatter.calls.load(Ordering::SeqCst), 1);

        let stats = service.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[tokio::test]
    async fn mode_is_part_of_the_cache_key() {
        let (formatter, service) = service();
        let content = DocumentContent::Text("notes".to_string());

        service.format(FormatMode::Cleanup, &content).await.unwrap();
        service.format(FormatMode::Questions, &content).await.unwrap();
        assert_eq!(formatter.calls.load(Ordering::SeqCst), 2);

        service.clear().await;
        let stats = service.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.entries), (0, 0, 0));
    }

    #[test]
    fn pdf_is_sent_inline() {
        let body = GeminiClient::request_body("p", &DocumentContent::Pdf(b"%PDF".to_vec()));
        let part = &body["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(part["mime_type"], "application/pdf");
        assert_eq!(part["data"], "JVBERg==");
    }
}
