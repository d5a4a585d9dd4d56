use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::db::models::{RubricBreakdownEntry, RubricCriterion};
use crate::db::types::{AssignmentFormat, AssignmentType, CompetencyLevel};
use crate::services::quiz::{QuizItem, QuizItemKind, ShortAnswerEvaluation, ShortAnswerPrompt};
use crate::services::text::truncate_chars;

const QUIZ_INPUT_CHARS: usize = 8_000;
const TOPIC_SNIPPET_CHARS: usize = 4_000;
const GRADING_BODY_CHARS: usize = 6_000;
const SHORT_ANSWER_CHARS: usize = 2_000;
const CONVERSATION_TURNS: usize = 20;
const CONVERSATION_TURN_CHARS: usize = 1_000;
const TOPIC_FALLBACK_CHARS: usize = 200;
const MAX_TOPICS: usize = 5;
const MAX_SHORT_ANSWERS_PER_CALL: usize = 15;

pub(crate) const UNCATEGORIZED: &str = "Uncategorized";
pub(crate) const ARCHITECT_FALLBACK: &str =
    "Try a quick quiz to test what you know, or a case study to go deeper.";

#[derive(Debug, Error)]
pub(crate) enum AiError {
    #[error("AI provider is not configured")]
    NotConfigured,
    #[error("AI request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI provider returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("AI response had no content")]
    EmptyContent,
    #[error("AI response was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("AI response was unusable: {0}")]
    Unusable(String),
}

impl AiError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ChatRequest {
    pub(crate) operation: &'static str,
    pub(crate) system: String,
    pub(crate) user: String,
    pub(crate) json_mode: bool,
}

/// A single chat-completion round trip. Implementations return the assistant content.
#[async_trait]
pub(crate) trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AiError>;
}

/// OpenAI-compatible `/chat/completions` client.
pub(crate) struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    max_retries: u32,
}

impl OpenAiBackend {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let ai = settings.ai();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(ai.ai_request_timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: ai.openai_api_key.clone(),
            base_url: ai.openai_base_url.trim_end_matches('/').to_string(),
            model: ai.ai_model.clone(),
            max_tokens: ai.ai_max_tokens,
            temperature: ai.ai_temperature,
            max_retries: ai.ai_max_retries,
        })
    }

    async fn send_once(&self, url: &str, payload: &Value) -> Result<Value, AiError> {
        let response = self.client.post(url).bearer_auth(&self.api_key).json(payload).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AiError::Upstream {
                status: status.as_u16(),
                body: truncate_chars(&text, 500).to_string(),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }

        let mut payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if request.json_mode {
            payload["response_format"] = json!({"type": "json_object"});
        }

        let url = format!("{}/chat/completions", self.base_url);
        let mut attempt = 0;
        let body = loop {
            match self.send_once(&url, &payload).await {
                Ok(body) => break body,
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    tracing::warn!(
                        operation = request.operation,
                        attempt,
                        error = %err,
                        "AI request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };

        let tokens_used = body.pointer("/usage/total_tokens").and_then(Value::as_u64);
        tracing::debug!(operation = request.operation, tokens_used, model = %self.model, "AI completion received");

        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(AiError::EmptyContent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AssignmentDraft {
    pub(crate) title: String,
    pub(crate) prompt: String,
    pub(crate) kind: AssignmentType,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradeOutcome {
    pub(crate) score: f64,
    pub(crate) competency_level: CompetencyLevel,
    pub(crate) rubric_breakdown: Vec<RubricBreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ConversationTurn {
    pub(crate) role: String,
    pub(crate) content: String,
}

/// How many items of each kind a generated quiz should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QuizMix {
    pub(crate) mcq: usize,
    pub(crate) short_answer: usize,
}

impl QuizMix {
    pub(crate) fn for_format(format: Option<AssignmentFormat>) -> Self {
        match format {
            Some(AssignmentFormat::MixedFormat) => Self { mcq: 3, short_answer: 2 },
            Some(AssignmentFormat::ShortAnswers) => Self { mcq: 0, short_answer: 5 },
            _ => Self { mcq: 5, short_answer: 0 },
        }
    }
}

/// Domain-level operations on top of a [`ChatBackend`].
#[derive(Clone)]
pub(crate) struct AiService {
    backend: Arc<dyn ChatBackend>,
}

impl AiService {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::with_backend(Arc::new(OpenAiBackend::from_settings(settings)?)))
    }

    pub(crate) fn with_backend(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    async fn call(&self, request: ChatRequest) -> Result<String, AiError> {
        let timer = Instant::now();
        let result = self
            .backend
            .complete(&request)
            .await
            .and_then(|content| if content.trim().is_empty() { Err(AiError::EmptyContent) } else { Ok(content) });

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::record_ai_call(request.operation, outcome, timer.elapsed());
        if let Err(err) = &result {
            tracing::warn!(operation = request.operation, error = %err, "AI call failed");
        }
        result
    }

    async fn call_json(&self, request: ChatRequest) -> Result<Value, AiError> {
        let content = self.call(request).await?;
        parse_json_content(&content)
    }

    /// Exactly five multiple-choice questions for the instant challenge.
    pub(crate) async fn generate_mcqs(&self, input: &str) -> Result<Vec<QuizItem>, AiError> {
        let value = self
            .call_json(ChatRequest {
                operation: "generate_mcqs",
                system: "You are a quiz generator. Given content, output exactly 5 multiple-choice \
                         questions. Return a JSON object {\"items\": [{\"id\", \"question\", \
                         \"options\" (array of 4 strings), \"correctIndex\" (0-3)}]}. Use short ids \
                         like q1, q2, ..."
                    .to_string(),
                user: format!(
                    "Generate 5 MCQs from this content:\n\n{}",
                    truncate_chars(input, QUIZ_INPUT_CHARS)
                ),
                json_mode: true,
            })
            .await?;

        let items: Vec<QuizItem> =
            normalize_quiz_items(&value).into_iter().filter(QuizItem::is_mcq).collect();
        if items.len() < 5 {
            return Err(AiError::Unusable(format!("expected 5 MCQ items, got {}", items.len())));
        }
        Ok(items.into_iter().take(5).collect())
    }

    /// Quiz items for an `instant_mcq` assignment in the requested mix.
    pub(crate) async fn generate_quiz_items(
        &self,
        input: &str,
        mix: QuizMix,
    ) -> Result<Vec<QuizItem>, AiError> {
        let value = self
            .call_json(ChatRequest {
                operation: "generate_quiz",
                system: "You write practice quizzes. Return a JSON object {\"items\": [...]} where \
                         each item is either {\"id\", \"type\": \"mcq\", \"question\", \"options\" \
                         (4 strings), \"correctIndex\" (0-3)} or {\"id\", \"type\": \
                         \"short_answer\", \"question\"}. Use ids q1, q2, ..."
                    .to_string(),
                user: format!(
                    "Write {} multiple-choice and {} short-answer questions about:\n\n{}",
                    mix.mcq,
                    mix.short_answer,
                    truncate_chars(input, QUIZ_INPUT_CHARS)
                ),
                json_mode: true,
            })
            .await?;

        let items: Vec<QuizItem> = normalize_quiz_items(&value)
            .into_iter()
            .filter(|item| item.is_mcq() || item.is_short_answer())
            .take(mix.mcq + mix.short_answer)
            .collect();
        if items.is_empty() {
            return Err(AiError::Unusable("no valid quiz items".to_string()));
        }
        Ok(items)
    }

    /// Topic labels for a resource. Never fails: any problem yields `["Uncategorized"]`.
    pub(crate) async fn extract_topics(&self, snippet: &str) -> Vec<String> {
        if snippet.trim().is_empty() {
            return vec![UNCATEGORIZED.to_string()];
        }

        let result = self
            .call_json(ChatRequest {
                operation: "extract_topics",
                system: "You extract 1-5 short topic labels from the given content. Return a JSON \
                         object with key 'topics' (array of strings). Example: {\"topics\": \
                         [\"DevOps\", \"GTM\"]}"
                    .to_string(),
                user: truncate_chars(snippet, TOPIC_SNIPPET_CHARS).to_string(),
                json_mode: true,
            })
            .await;

        match result {
            Ok(value) => normalize_topics(&value),
            Err(_) => vec![UNCATEGORIZED.to_string()],
        }
    }

    pub(crate) async fn architect_suggestion(
        &self,
        context_summary: &str,
        message: &str,
    ) -> Result<String, AiError> {
        let user = if context_summary.trim().is_empty() {
            message.to_string()
        } else {
            format!("User's recent topics/resources: {context_summary}\n\nUser says: {message}")
        };

        let result = self
            .call(ChatRequest {
                operation: "architect_chat",
                system: "You are a learning coach. Based on the user's saved resources and message, \
                         suggest whether they should do a quick quiz or a deeper case study. Be \
                         brief and direct."
                    .to_string(),
                user,
                json_mode: false,
            })
            .await;

        match result {
            Ok(content) => Ok(content.trim().to_string()),
            Err(AiError::EmptyContent) => Ok(ARCHITECT_FALLBACK.to_string()),
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn create_assignment(
        &self,
        topic: &str,
        resource_context: Option<&str>,
        format: Option<AssignmentFormat>,
    ) -> Result<AssignmentDraft, AiError> {
        let mut user = format!("Topic: {topic}");
        if let Some(format) = format {
            user.push_str(&format!("\nRequested format: {}", format.as_str()));
        }
        if let Some(context) = resource_context.filter(|context| !context.trim().is_empty()) {
            user.push_str(&format!("\n\nLearner's saved resources:\n{context}"));
        }

        let result = self
            .call_json(ChatRequest {
                operation: "create_assignment",
                system: "Given a topic, suggest a short assignment: title, prompt (instructions for \
                         the learner), and type (instant_mcq, case_study, or long_form). Use the \
                         learner's resources when provided, otherwise general knowledge. Return \
                         JSON: {\"title\", \"prompt\", \"type\"}."
                    .to_string(),
                user,
                json_mode: true,
            })
            .await;

        let draft = match result {
            Ok(value) => normalize_assignment(&value, topic),
            Err(AiError::EmptyContent) => fallback_assignment(topic),
            Err(err) => return Err(err),
        };

        Ok(match format {
            Some(format) => AssignmentDraft { kind: format.assignment_type(), ..draft },
            None => draft,
        })
    }

    /// Condenses a coaching conversation into an assignment topic.
    pub(crate) async fn conversation_topic(
        &self,
        conversation: &[ConversationTurn],
    ) -> Result<String, AiError> {
        let fallback = conversation
            .iter()
            .rev()
            .find(|turn| turn.role == "user" && !turn.content.trim().is_empty())
            .map(|turn| truncate_chars(turn.content.trim(), TOPIC_FALLBACK_CHARS).to_string())
            .ok_or_else(|| AiError::Unusable("conversation has no user message".to_string()))?;

        let start = conversation.len().saturating_sub(CONVERSATION_TURNS);
        let transcript = conversation[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role, truncate_chars(&turn.content, CONVERSATION_TURN_CHARS)))
            .collect::<Vec<_>>()
            .join("\n");

        let result = self
            .call_json(ChatRequest {
                operation: "conversation_topic",
                system: "Read the conversation between a learner and a coach and name the single \
                         topic the learner wants to practise, in at most 12 words. Return JSON: \
                         {\"topic\": string}."
                    .to_string(),
                user: transcript,
                json_mode: true,
            })
            .await;

        let topic = match result {
            Ok(value) => string_field(&value, &["topic"]),
            Err(AiError::EmptyContent) => None,
            Err(err) => return Err(err),
        };

        Ok(topic.unwrap_or(fallback))
    }

    pub(crate) async fn grade_submission(
        &self,
        prompt: &str,
        body: &str,
        criteria: &[RubricCriterion],
    ) -> Result<GradeOutcome, AiError> {
        let criteria_json = serde_json::to_string(criteria)?;
        let value = self
            .call_json(ChatRequest {
                operation: "grade_submission",
                system: "You grade a learner's submission against the assignment prompt and rubric. \
                         Return JSON: {\"score\" (0-100), \"competencyLevel\" \
                         (novice|competent|expert), \"rubricBreakdown\": [{\"criterionId\", \
                         \"scoreOrFeedback\", \"performanceNote\"}]} with one breakdown entry per \
                         rubric criterion."
                    .to_string(),
                user: format!(
                    "Assignment prompt:\n{prompt}\n\nRubric criteria: {criteria_json}\n\nSubmission:\n{}",
                    truncate_chars(body, GRADING_BODY_CHARS)
                ),
                json_mode: true,
            })
            .await?;

        Ok(normalize_grade(&value, criteria))
    }

    /// One evaluation per prompt, in input order. Prompts past the per-call cap get no score.
    pub(crate) async fn grade_short_answers(
        &self,
        answers: &[ShortAnswerPrompt],
    ) -> Result<Vec<ShortAnswerEvaluation>, AiError> {
        if answers.is_empty() {
            return Ok(Vec::new());
        }

        let payload: Vec<Value> = answers
            .iter()
            .take(MAX_SHORT_ANSWERS_PER_CALL)
            .enumerate()
            .map(|(index, answer)| {
                json!({
                    "index": index,
                    "question": truncate_chars(&answer.question, SHORT_ANSWER_CHARS),
                    "answer": truncate_chars(&answer.user_answer, SHORT_ANSWER_CHARS),
                })
            })
            .collect();

        let value = self
            .call_json(ChatRequest {
                operation: "grade_short_answers",
                system: "You evaluate short written answers to quiz questions. For every answer \
                         give brief constructive feedback and a score from 0 to 100. Return JSON: \
                         {\"evaluations\": [{\"index\", \"evaluation\", \"score\"}]} in the same \
                         order as the input."
                    .to_string(),
                user: serde_json::to_string(&payload)?,
                json_mode: true,
            })
            .await?;

        Ok(normalize_short_answer_evaluations(&value, answers))
    }
}

/// Parses model output as JSON, tolerating a Markdown code fence around it.
pub(crate) fn parse_json_content(content: &str) -> Result<Value, AiError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(unfenced.trim())?)
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(*key)).filter(|value| !value.is_null())
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn number_field(value: &Value, keys: &[&str]) -> Option<f64> {
    match field(value, keys)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    match field(value, keys)? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
    .filter(|text| !text.is_empty())
}

fn item_list(value: &Value, keys: &[&str]) -> Vec<Value> {
    if let Value::Array(items) = value {
        return items.clone();
    }
    field(value, keys).and_then(Value::as_array).cloned().unwrap_or_default()
}

pub(crate) fn normalize_quiz_items(value: &Value) -> Vec<QuizItem> {
    item_list(value, &["items", "questions", "quiz"])
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let question = string_field(raw, &["question", "prompt"])?;
            let id = string_field(raw, &["id"]).unwrap_or_else(|| format!("q{}", index + 1));
            let kind = match string_field(raw, &["type", "kind"]).as_deref() {
                Some("short_answer") | Some("short") => QuizItemKind::ShortAnswer,
                _ => QuizItemKind::Mcq,
            };
            let options = field(raw, &["options", "choices"])
                .and_then(Value::as_array)
                .map(|options| {
                    options
                        .iter()
                        .filter_map(|option| match option {
                            Value::String(text) => Some(text.trim().to_string()),
                            Value::Number(number) => Some(number.to_string()),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default();
            let correct_index = number_field(raw, &["correctIndex", "correct_index", "answerIndex"])
                .filter(|index| index.fract() == 0.0)
                .map(|index| index as i64);

            Some(QuizItem {
                id,
                kind,
                question,
                options: if kind == QuizItemKind::ShortAnswer { Vec::new() } else { options },
                correct_index: if kind == QuizItemKind::ShortAnswer { None } else { correct_index },
            })
        })
        .collect()
}

pub(crate) fn normalize_topics(value: &Value) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for topic in item_list(value, &["topics", "labels"]).iter().filter_map(Value::as_str) {
        let topic = topic.trim();
        if !topic.is_empty() && !topics.iter().any(|known| known.eq_ignore_ascii_case(topic)) {
            topics.push(topic.to_string());
        }
    }
    topics.truncate(MAX_TOPICS);

    if topics.is_empty() {
        topics.push(UNCATEGORIZED.to_string());
    }
    topics
}

fn fallback_assignment(topic: &str) -> AssignmentDraft {
    AssignmentDraft {
        title: format!("Assignment: {topic}"),
        prompt: format!("Reflect on and apply your knowledge of: {topic}."),
        kind: AssignmentType::LongForm,
    }
}

pub(crate) fn normalize_assignment(value: &Value, topic: &str) -> AssignmentDraft {
    let fallback = fallback_assignment(topic);
    AssignmentDraft {
        title: string_field(value, &["title"]).unwrap_or(fallback.title),
        prompt: string_field(value, &["prompt", "instructions"]).unwrap_or(fallback.prompt),
        kind: string_field(value, &["type"])
            .as_deref()
            .and_then(AssignmentType::parse)
            .unwrap_or(fallback.kind),
    }
}

pub(crate) fn normalize_grade(value: &Value, criteria: &[RubricCriterion]) -> GradeOutcome {
    let score = number_field(value, &["score"]).unwrap_or(0.0).clamp(0.0, 100.0);
    let competency_level = string_field(value, &["competencyLevel", "competency_level"])
        .map(|label| CompetencyLevel::from_label(&label))
        .unwrap_or(CompetencyLevel::Novice);

    let criterion_name = |id: &str| {
        criteria.iter().find(|criterion| criterion.id == id).map(|criterion| criterion.name.clone())
    };

    let mut rubric_breakdown = Vec::new();
    for raw in field(value, &["rubricBreakdown", "rubric_breakdown"])
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let Some(criterion_id) = text_field(raw, &["criterionId", "criterion_id", "id"]) else {
            continue;
        };
        rubric_breakdown.push(RubricBreakdownEntry {
            criterion_name: criterion_name(&criterion_id),
            score_or_feedback: text_field(raw, &["scoreOrFeedback", "score_or_feedback", "feedback"])
                .unwrap_or_else(|| "—".to_string()),
            performance_note: text_field(raw, &["performanceNote", "performance_note", "note"])
                .unwrap_or_else(|| "—".to_string()),
            criterion_id,
        });
    }

    if rubric_breakdown.is_empty() {
        rubric_breakdown = criteria
            .iter()
            .map(|criterion| RubricBreakdownEntry {
                criterion_id: criterion.id.clone(),
                criterion_name: Some(criterion.name.clone()),
                score_or_feedback: "—".to_string(),
                performance_note: "—".to_string(),
            })
            .collect();
    }

    GradeOutcome { score, competency_level, rubric_breakdown }
}

pub(crate) fn normalize_short_answer_evaluations(
    value: &Value,
    answers: &[ShortAnswerPrompt],
) -> Vec<ShortAnswerEvaluation> {
    let raw = item_list(value, &["evaluations", "results"]);

    answers
        .iter()
        .enumerate()
        .map(|(position, answer)| {
            let entry = raw
                .iter()
                .find(|entry| number_field(entry, &["index"]) == Some(position as f64))
                .or_else(|| raw.get(position))
                .filter(|_| position < MAX_SHORT_ANSWERS_PER_CALL);

            ShortAnswerEvaluation {
                question: answer.question.clone(),
                user_answer: answer.user_answer.clone(),
                evaluation: entry
                    .and_then(|entry| string_field(entry, &["evaluation", "feedback"]))
                    .unwrap_or_else(|| "No feedback available.".to_string()),
                score: entry
                    .and_then(|entry| number_field(entry, &["score"]))
                    .map(|score| score.clamp(0.0, 100.0)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubBackend;

    fn criteria() -> Vec<RubricCriterion> {
        vec![
            RubricCriterion { id: "c1".into(), name: "Clarity".into(), description: None },
            RubricCriterion { id: "c2".into(), name: "Depth".into(), description: None },
        ]
    }

    fn mcq_json(count: usize) -> String {
        let items: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "id": format!("q{}", i + 1),
                    "question": format!("Question {i}?"),
                    "options": ["a", "b", "c", "d"],
                    "correctIndex": i % 4
                })
            })
            .collect();
        json!({ "items": items }).to_string()
    }

    #[test]
    fn parse_json_content_strips_fences() {
        let value = parse_json_content("```json\n{\"topics\": [\"Rust\"]}\n```").expect("json");
        assert_eq!(value["topics"][0], "Rust");
        assert!(parse_json_content("not json").is_err());
    }

    #[test]
    fn quiz_items_are_normalised() {
        let value = json!({
            "questions": [
                {"question": "Pick one", "options": ["x", "y"], "correctIndex": "1"},
                {"id": "s1", "type": "short_answer", "question": "Why?", "options": ["ignored"]},
                {"id": "bad", "options": ["x", "y"], "correctIndex": 0}
            ]
        });

        let items = normalize_quiz_items(&value);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "q1");
        assert_eq!(items[0].correct_index, Some(1));
        assert!(items[0].is_mcq());
        assert_eq!(items[1].kind, QuizItemKind::ShortAnswer);
        assert!(items[1].options.is_empty());
    }

    #[test]
    fn topics_are_trimmed_deduplicated_and_capped() {
        let value = json!({"topics": [" Rust ", "rust", "", "Tokio", "Axum", "SQL", "Redis", "Extra"]});
        assert_eq!(normalize_topics(&value), vec!["Rust", "Tokio", "Axum", "SQL", "Redis"]);
        assert_eq!(normalize_topics(&json!({"topics": []})), vec![UNCATEGORIZED]);
    }

    #[test]
    fn grade_is_clamped_and_named() {
        let value = json!({
            "score": 140,
            "competencyLevel": "guru",
            "rubricBreakdown": [
                {"criterionId": "c2", "scoreOrFeedback": 7, "performanceNote": "Needs more depth"}
            ]
        });

        let outcome = normalize_grade(&value, &criteria());
        assert_eq!(outcome.score, 100.0);
        assert_eq!(outcome.competency_level, CompetencyLevel::Novice);
        assert_eq!(outcome.rubric_breakdown.len(), 1);
        assert_eq!(outcome.rubric_breakdown[0].criterion_name.as_deref(), Some("Depth"));
        assert_eq!(outcome.rubric_breakdown[0].score_or_feedback, "7");
    }

    #[test]
    fn missing_breakdown_falls_back_to_criteria() {
        let outcome = normalize_grade(&json!({"score": "72.5", "competency_level": "competent"}), &criteria());
        assert_eq!(outcome.score, 72.5);
        assert_eq!(outcome.competency_level, CompetencyLevel::Competent);
        assert_eq!(outcome.rubric_breakdown.len(), 2);
        assert!(outcome.rubric_breakdown.iter().all(|entry| entry.score_or_feedback == "—"));
    }

    #[test]
    fn assignment_draft_falls_back_per_field() {
        let draft = normalize_assignment(&json!({"title": "  ", "type": "case_study"}), "Supply chains");
        assert_eq!(draft.title, "Assignment: Supply chains");
        assert_eq!(draft.kind, AssignmentType::CaseStudy);

        let draft = normalize_assignment(&json!({"type": "podcast"}), "X");
        assert_eq!(draft.kind, AssignmentType::LongForm);
    }

    #[tokio::test]
    async fn generate_mcqs_requires_five_valid_items() {
        let stub = StubBackend::with_responses(vec![Ok(mcq_json(4))]);
        let ai = AiService::with_backend(stub.clone());
        assert!(matches!(ai.generate_mcqs("some content").await, Err(AiError::Unusable(_))));

        let stub = StubBackend::with_responses(vec![Ok(mcq_json(7))]);
        let ai = AiService::with_backend(stub.clone());
        let items = ai.generate_mcqs("some content").await.expect("items");
        assert_eq!(items.len(), 5);
        assert_eq!(stub.requests()[0].operation, "generate_mcqs");
    }

    #[tokio::test]
    async fn extract_topics_never_fails() {
        let stub = StubBackend::with_responses(vec![Err(AiError::NotConfigured)]);
        let ai = AiService::with_backend(stub.clone());
        assert_eq!(ai.extract_topics("Ownership and borrowing").await, vec![UNCATEGORIZED]);

        assert_eq!(ai.extract_topics("   ").await, vec![UNCATEGORIZED]);
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn create_assignment_uses_format_for_type() {
        let stub = StubBackend::with_responses(vec![Ok(
            json!({"title": "Ports", "prompt": "Explain ports", "type": "long_form"}).to_string(),
        )]);
        let ai = AiService::with_backend(stub.clone());

        let draft = ai
            .create_assignment("Networking", Some("- TCP notes"), Some(AssignmentFormat::MultipleChoice))
            .await
            .expect("draft");
        assert_eq!(draft.kind, AssignmentType::InstantMcq);
        assert!(stub.requests()[0].user.contains("TCP notes"));
    }

    #[tokio::test]
    async fn conversation_topic_falls_back_to_last_user_message() {
        let stub = StubBackend::with_responses(vec![Ok(json!({"topic": ""}).to_string())]);
        let ai = AiService::with_backend(stub);
        let conversation = vec![
            ConversationTurn { role: "user".into(), content: "I want to learn Kubernetes".into() },
            ConversationTurn { role: "assistant".into(), content: "Quiz or case study?".into() },
        ];

        let topic = ai.conversation_topic(&conversation).await.expect("topic");
        assert_eq!(topic, "I want to learn Kubernetes");

        let assistant_only =
            vec![ConversationTurn { role: "assistant".into(), content: "Hello".into() }];
        assert!(ai.conversation_topic(&assistant_only).await.is_err());
    }

    #[tokio::test]
    async fn short_answer_evaluations_pad_missing_entries() {
        let stub = StubBackend::with_responses(vec![Ok(json!({
            "evaluations": [{"index": 1, "evaluation": "Good", "score": 90}]
        })
        .to_string())]);
        let ai = AiService::with_backend(stub);
        let answers = vec![
            ShortAnswerPrompt { question: "A?".into(), user_answer: "a".into() },
            ShortAnswerPrompt { question: "B?".into(), user_answer: "b".into() },
        ];

        let evaluations = ai.grade_short_answers(&answers).await.expect("evaluations");
        assert_eq!(evaluations.len(), 2);
        assert_eq!(evaluations[1].score, Some(90.0));
        assert_eq!(evaluations[0].evaluation, "No feedback available.");
        assert_eq!(evaluations[0].score, None);
    }

    #[tokio::test]
    async fn empty_content_is_an_error_for_grading() {
        let stub = StubBackend::with_responses(vec![Ok("   ".to_string())]);
        let ai = AiService::with_backend(stub);
        let result = ai.grade_submission("prompt", "body", &criteria()).await;
        assert!(matches!(result, Err(AiError::EmptyContent)));
    }

    #[tokio::test]
    async fn architect_suggestion_falls_back_on_empty_content() {
        let stub = StubBackend::with_responses(vec![Ok(String::new())]);
        let ai = AiService::with_backend(stub);
        let reply = ai.architect_suggestion("", "What next?").await.expect("reply");
        assert_eq!(reply, ARCHITECT_FALLBACK);
    }
}
