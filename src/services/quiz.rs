//! Quiz items and the arithmetic that turns stored answers into a growth report.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::models::RubricBreakdownEntry;
use crate::db::types::CompetencyLevel;

/// Body marker written by the workbench when a quiz attempt is submitted.
pub(crate) const QUIZ_BODY_TYPE: &str = "instant_mcq_quiz";

/// Score given to an evaluated short answer when the grader omits one.
pub(crate) const DEFAULT_SHORT_ANSWER_SCORE: f64 = 70.0;

const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QuizItemKind {
    #[default]
    #[serde(alias = "multiple_choice")]
    Mcq,
    ShortAnswer,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuizItem {
    pub(crate) id: String,
    #[serde(default, rename = "type")]
    pub(crate) kind: QuizItemKind,
    pub(crate) question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "correctIndex", skip_serializing_if = "Option::is_none")]
    pub(crate) correct_index: Option<i64>,
}

impl QuizItem {
    pub(crate) fn is_mcq(&self) -> bool {
        self.kind != QuizItemKind::ShortAnswer
            && self.options.len() >= 2
            && self.correct_index.is_some_and(|index| index >= 0 && (index as usize) < self.options.len())
    }

    pub(crate) fn is_short_answer(&self) -> bool {
        self.kind == QuizItemKind::ShortAnswer && !self.question.trim().is_empty()
    }

    fn correct_option(&self) -> Option<(usize, &str)> {
        let index = usize::try_from(self.correct_index?).ok()?;
        self.options.get(index).map(|text| (index, text.as_str()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct McqAnswer {
    #[serde(alias = "itemId")]
    pub(crate) item_id: String,
    #[serde(alias = "selectedIndex")]
    pub(crate) selected_index: i64,
}

/// JSON stored in `submissions.body_text` for quiz attempts.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuizSubmissionBody {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(alias = "quizItems")]
    pub(crate) quiz_items: Vec<QuizItem>,
    #[serde(default, alias = "mcqAnswers")]
    pub(crate) mcq_answers: Vec<McqAnswer>,
    #[serde(default, alias = "shortAnswers")]
    pub(crate) short_answers: HashMap<String, String>,
}

impl QuizSubmissionBody {
    /// `None` means the body is not a quiz attempt and should be graded as prose.
    pub(crate) fn parse(body: &str) -> Option<Self> {
        let parsed: Self = serde_json::from_str(body.trim()).ok()?;
        (parsed.kind == QUIZ_BODY_TYPE).then_some(parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct McqFeedback {
    pub(crate) position: usize,
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_index: i64,
    pub(crate) user_selected_index: i64,
    pub(crate) correct: bool,
    pub(crate) correct_answer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ShortAnswerPrompt {
    pub(crate) question: String,
    #[serde(alias = "userAnswer")]
    pub(crate) user_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ShortAnswerEvaluation {
    pub(crate) question: String,
    pub(crate) user_answer: String,
    pub(crate) evaluation: String,
    pub(crate) score: Option<f64>,
}

/// First half of quiz grading: everything that can be decided locally.
#[derive(Debug)]
pub(crate) struct QuizPlan {
    mcq_feedback: Vec<McqFeedback>,
    mcq_total: usize,
    mcq_correct: usize,
    short_total: usize,
    to_evaluate: Vec<ShortAnswerPrompt>,
}

#[derive(Debug)]
pub(crate) struct QuizGrade {
    pub(crate) score: f64,
    pub(crate) competency_level: CompetencyLevel,
    pub(crate) rubric_breakdown: Vec<RubricBreakdownEntry>,
    pub(crate) evaluation_details: Value,
}

impl QuizPlan {
    pub(crate) fn new(body: &QuizSubmissionBody) -> Self {
        let answers: HashMap<&str, i64> = body
            .mcq_answers
            .iter()
            .map(|answer| (answer.item_id.as_str(), answer.selected_index))
            .collect();

        let mut mcq_feedback = Vec::new();
        let mut to_evaluate = Vec::new();
        let mut short_total = 0;

        for (index, item) in body.quiz_items.iter().enumerate() {
            if item.is_mcq() {
                let selected = answers.get(item.id.as_str()).copied();
                let correct_index = item.correct_index.unwrap_or_default();
                mcq_feedback.push(McqFeedback {
                    position: index + 1,
                    question: item.question.clone(),
                    options: item.options.clone(),
                    correct_index,
                    user_selected_index: selected.unwrap_or(-1),
                    correct: selected == Some(correct_index),
                    correct_answer_text: item.correct_option().map(|(_, text)| text.to_string()),
                });
            } else if item.kind == QuizItemKind::ShortAnswer {
                short_total += 1;
                let answer = body.short_answers.get(&item.id).map(|value| value.trim()).unwrap_or("");
                if !answer.is_empty() {
                    to_evaluate.push(ShortAnswerPrompt {
                        question: item.question.clone(),
                        user_answer: answer.to_string(),
                    });
                }
            }
        }

        let mcq_total = mcq_feedback.len();
        let mcq_correct = mcq_feedback.iter().filter(|feedback| feedback.correct).count();

        Self { mcq_feedback, mcq_total, mcq_correct, short_total, to_evaluate }
    }

    /// Answered short-answer items that need an external evaluation.
    pub(crate) fn short_answers_to_evaluate(&self) -> &[ShortAnswerPrompt] {
        &self.to_evaluate
    }

    pub(crate) fn mcq_score(&self) -> f64 {
        if self.mcq_total == 0 {
            return 0.0;
        }
        (self.mcq_correct as f64 / self.mcq_total as f64 * 100.0).round()
    }

    pub(crate) fn finish(self, evaluations: Vec<ShortAnswerEvaluation>) -> QuizGrade {
        let mcq_score = self.mcq_score();
        // Ungraded short answers take the average of the graded ones.
        let score = if self.short_total > 0 && !evaluations.is_empty() {
            let short_average = evaluations
                .iter()
                .map(|evaluation| evaluation.score.unwrap_or(DEFAULT_SHORT_ANSWER_SCORE))
                .sum::<f64>()
                / evaluations.len() as f64;
            let total = (self.mcq_total + self.short_total) as f64;
            ((mcq_score * self.mcq_total as f64 + short_average * self.short_total as f64) / total)
                .round()
        } else {
            mcq_score
        };

        let rubric_breakdown = self
            .mcq_feedback
            .iter()
            .filter(|feedback| !feedback.correct)
            .enumerate()
            .map(|(index, feedback)| breakdown_entry(index + 1, feedback))
            .collect();

        let evaluation_details = json!({
            "mcq_feedback": self.mcq_feedback,
            "short_answer_evaluations": evaluations,
        });

        QuizGrade {
            score,
            competency_level: CompetencyLevel::from_score(score),
            rubric_breakdown,
            evaluation_details,
        }
    }
}

fn option_label(index: i64) -> String {
    usize::try_from(index)
        .ok()
        .and_then(|index| OPTION_LABELS.get(index))
        .map(|label| label.to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

/// `number` counts incorrect answers only, so rows read q1, q2, ... in report order.
fn breakdown_entry(number: usize, feedback: &McqFeedback) -> RubricBreakdownEntry {
    let answer_text = feedback.correct_answer_text.as_deref().unwrap_or_default();
    let your_answer = if feedback.user_selected_index >= 0 {
        option_label(feedback.user_selected_index)
    } else {
        "—".to_string()
    };

    RubricBreakdownEntry {
        criterion_id: format!("q{number}"),
        criterion_name: Some(feedback.question.clone()),
        score_or_feedback: format!(
            "Incorrect. Correct answer: {}. {answer_text}",
            option_label(feedback.correct_index)
        )
        .trim_end()
        .to_string(),
        performance_note: format!("Your answer: {your_answer}"),
    }
}

/// Answers accepted by the anonymous instant challenge: either a list of
/// `{item_id, selected_index}` or a map of item id to selected index. Malformed
/// entries are dropped rather than failing the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Value")]
pub(crate) struct ChallengeAnswers(HashMap<String, i64>);

impl From<Value> for ChallengeAnswers {
    fn from(value: Value) -> Self {
        let answers = match value {
            Value::Array(entries) => entries
                .iter()
                .filter_map(|entry| {
                    let item_id = ["item_id", "itemId"]
                        .iter()
                        .find_map(|key| entry.get(key).and_then(Value::as_str))?;
                    let selected = ["selected_index", "selectedIndex"]
                        .iter()
                        .find_map(|key| entry.get(key).and_then(Value::as_i64))?;
                    Some((item_id.to_string(), selected))
                })
                .collect(),
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(item_id, selected)| selected.as_i64().map(|index| (item_id, index)))
                .collect(),
            _ => HashMap::new(),
        };
        Self(answers)
    }
}

impl ChallengeAnswers {
    pub(crate) fn into_map(self) -> HashMap<String, i64> {
        self.0
    }
}

pub(crate) const CHALLENGE_QUESTION_COUNT: usize = 5;

/// Scores an instant challenge. With the generated items available the result is the
/// share of correct answers; otherwise only participation can be measured.
pub(crate) fn score_challenge(answers: &HashMap<String, i64>, items: Option<&[QuizItem]>) -> ChallengeScore {
    match items.map(|items| items.iter().filter(|item| item.is_mcq()).collect::<Vec<_>>()) {
        Some(mcqs) if !mcqs.is_empty() => {
            let correct = mcqs
                .iter()
                .filter(|item| answers.get(&item.id).copied() == item.correct_index)
                .count();
            ChallengeScore {
                score: (correct as f64 / mcqs.len() as f64 * 100.0).round(),
                correct: Some(correct),
                total: mcqs.len(),
            }
        }
        _ => {
            let answered = answers.len() as f64;
            ChallengeScore {
                score: (answered / CHALLENGE_QUESTION_COUNT as f64 * 100.0).round().min(100.0),
                correct: None,
                total: CHALLENGE_QUESTION_COUNT,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ChallengeScore {
    pub(crate) score: f64,
    pub(crate) correct: Option<usize>,
    pub(crate) total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(id: &str, correct: i64) -> QuizItem {
        QuizItem {
            id: id.to_string(),
            kind: QuizItemKind::Mcq,
            question: format!("Question {id}?"),
            options: vec!["alpha".into(), "beta".into(), "gamma".into(), "delta".into()],
            correct_index: Some(correct),
        }
    }

    fn short(id: &str) -> QuizItem {
        QuizItem {
            id: id.to_string(),
            kind: QuizItemKind::ShortAnswer,
            question: format!("Explain {id}"),
            options: Vec::new(),
            correct_index: None,
        }
    }

    fn evaluation(score: Option<f64>) -> ShortAnswerEvaluation {
        ShortAnswerEvaluation {
            question: "q".into(),
            user_answer: "a".into(),
            evaluation: "ok".into(),
            score,
        }
    }

    #[test]
    fn mcq_validity_requires_options_and_index_in_range() {
        assert!(mcq("q1", 3).is_mcq());
        assert!(!mcq("q1", 4).is_mcq());
        assert!(!mcq("q1", -1).is_mcq());

        let mut single_option = mcq("q1", 0);
        single_option.options.truncate(1);
        assert!(!single_option.is_mcq());

        assert!(!short("s1").is_mcq());
        assert!(short("s1").is_short_answer());
    }

    #[test]
    fn parses_camel_case_quiz_body() {
        let body = r#"{
            "type": "instant_mcq_quiz",
            "quizItems": [{"id": "q1", "question": "?", "options": ["a","b"], "correctIndex": 1}],
            "mcqAnswers": [{"itemId": "q1", "selectedIndex": 1}],
            "shortAnswers": {}
        }"#;
        let parsed = QuizSubmissionBody::parse(body).expect("quiz body");
        assert_eq!(parsed.quiz_items.len(), 1);
        assert_eq!(parsed.mcq_answers[0].selected_index, 1);
    }

    #[test]
    fn non_quiz_bodies_are_prose() {
        assert!(QuizSubmissionBody::parse("My essay about photosynthesis").is_none());
        assert!(QuizSubmissionBody::parse(r#"{"type": "notes", "quiz_items": []}"#).is_none());
        assert!(QuizSubmissionBody::parse(r#"{"type": "instant_mcq_quiz"}"#).is_none());
    }

    #[test]
    fn mcq_only_quiz_scores_share_correct() {
        let body = QuizSubmissionBody {
            kind: QUIZ_BODY_TYPE.into(),
            quiz_items: vec![mcq("q1", 0), mcq("q2", 1), mcq("q3", 2)],
            mcq_answers: vec![
                McqAnswer { item_id: "q1".into(), selected_index: 0 },
                McqAnswer { item_id: "q2".into(), selected_index: 3 },
            ],
            short_answers: HashMap::new(),
        };

        let plan = QuizPlan::new(&body);
        assert!(plan.short_answers_to_evaluate().is_empty());
        let grade = plan.finish(Vec::new());

        assert_eq!(grade.score, 33.0);
        assert_eq!(grade.competency_level, CompetencyLevel::Novice);
        assert_eq!(grade.rubric_breakdown.len(), 2);

        let wrong = &grade.rubric_breakdown[0];
        assert_eq!(wrong.criterion_id, "q1");
        assert_eq!(wrong.criterion_name.as_deref(), Some("Question q2?"));
        assert_eq!(wrong.score_or_feedback, "Incorrect. Correct answer: B. beta");
        assert_eq!(wrong.performance_note, "Your answer: D");

        let unanswered = &grade.rubric_breakdown[1];
        assert_eq!(unanswered.criterion_id, "q2");
        assert_eq!(unanswered.performance_note, "Your answer: —");
    }

    #[test]
    fn mixed_quiz_weights_by_item_count() {
        let body = QuizSubmissionBody {
            kind: QUIZ_BODY_TYPE.into(),
            quiz_items: vec![mcq("q1", 0), mcq("q2", 0), mcq("q3", 0), short("s1"), short("s2")],
            mcq_answers: ["q1", "q2", "q3"]
                .iter()
                .map(|id| McqAnswer { item_id: id.to_string(), selected_index: 0 })
                .collect(),
            short_answers: HashMap::from([
                ("s1".to_string(), "An answer".to_string()),
                ("s2".to_string(), "   ".to_string()),
            ]),
        };

        let plan = QuizPlan::new(&body);
        assert_eq!(plan.short_answers_to_evaluate().len(), 1);
        assert_eq!(plan.mcq_score(), 100.0);

        // The blank answer takes the graded average: (100 * 3 + 50 * 2) / 5
        let grade = plan.finish(vec![evaluation(Some(50.0))]);
        assert_eq!(grade.score, 80.0);
        assert_eq!(grade.competency_level, CompetencyLevel::Expert);
        assert!(grade.rubric_breakdown.is_empty());
        assert_eq!(grade.evaluation_details["short_answer_evaluations"][0]["score"], 50.0);
    }

    #[test]
    fn missing_short_answer_score_defaults() {
        let body = QuizSubmissionBody {
            kind: QUIZ_BODY_TYPE.into(),
            quiz_items: vec![short("s1")],
            mcq_answers: Vec::new(),
            short_answers: HashMap::from([("s1".to_string(), "text".to_string())]),
        };

        let grade = QuizPlan::new(&body).finish(vec![evaluation(None)]);
        assert_eq!(grade.score, DEFAULT_SHORT_ANSWER_SCORE);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let body = QuizSubmissionBody {
            kind: QUIZ_BODY_TYPE.into(),
            quiz_items: Vec::new(),
            mcq_answers: Vec::new(),
            short_answers: HashMap::new(),
        };
        let grade = QuizPlan::new(&body).finish(Vec::new());
        assert_eq!(grade.score, 0.0);
        assert_eq!(grade.competency_level, CompetencyLevel::Novice);
    }

    #[test]
    fn challenge_answers_accept_both_shapes() {
        let list: ChallengeAnswers =
            serde_json::from_str(r#"[{"item_id": "q1", "selected_index": 2}]"#).unwrap();
        assert_eq!(list.into_map().get("q1"), Some(&2));

        let map: ChallengeAnswers = serde_json::from_str(r#"{"q1": 1, "q2": 0}"#).unwrap();
        assert_eq!(map.into_map().len(), 2);
    }

    #[test]
    fn malformed_challenge_answers_are_skipped() {
        let list: ChallengeAnswers = serde_json::from_str(
            r#"[{"itemId": "q1", "selectedIndex": 1}, {"item_id": 7}, "junk", {"item_id": "q3", "selected_index": "2"}]"#,
        )
        .unwrap();
        assert_eq!(list.into_map(), HashMap::from([("q1".to_string(), 1)]));

        let map: ChallengeAnswers =
            serde_json::from_str(r#"{"q1": 0, "q2": "b", "q3": null}"#).unwrap();
        assert_eq!(map.into_map(), HashMap::from([("q1".to_string(), 0)]));

        let nothing: ChallengeAnswers = serde_json::from_str(r#""not answers""#).unwrap();
        assert!(nothing.into_map().is_empty());
    }

    #[test]
    fn quiz_without_graded_short_answers_keeps_mcq_score() {
        let body = QuizSubmissionBody {
            kind: QUIZ_BODY_TYPE.into(),
            quiz_items: vec![mcq("q1", 0), mcq("q2", 0), mcq("q3", 0), short("s1"), short("s2")],
            mcq_answers: ["q1", "q2", "q3"]
                .iter()
                .map(|id| McqAnswer { item_id: id.to_string(), selected_index: 0 })
                .collect(),
            short_answers: HashMap::new(),
        };

        let plan = QuizPlan::new(&body);
        assert!(plan.short_answers_to_evaluate().is_empty());
        let grade = plan.finish(Vec::new());
        assert_eq!(grade.score, 100.0);
        assert_eq!(grade.competency_level, CompetencyLevel::Expert);
    }

    #[test]
    fn challenge_scoring_with_and_without_items() {
        let answers = HashMap::from([("q1".to_string(), 0), ("q2".to_string(), 2)]);
        let items = vec![mcq("q1", 0), mcq("q2", 1), mcq("q3", 0), mcq("q4", 0)];

        let scored = score_challenge(&answers, Some(&items));
        assert_eq!(scored.score, 25.0);
        assert_eq!(scored.correct, Some(1));
        assert_eq!(scored.total, 4);

        let participation = score_challenge(&answers, None);
        assert_eq!(participation.score, 40.0);
        assert_eq!(participation.correct, None);

        let many: HashMap<String, i64> = (0..7).map(|i| (format!("q{i}"), 0)).collect();
        assert_eq!(score_challenge(&many, None).score, 100.0);
    }
}
