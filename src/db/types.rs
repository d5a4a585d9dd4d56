use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "resourcetype", rename_all = "lowercase")]
pub(crate) enum ResourceType {
    Text,
    Pdf,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "assignmenttype", rename_all = "snake_case")]
pub(crate) enum AssignmentType {
    InstantMcq,
    CaseStudy,
    LongForm,
}

impl AssignmentType {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "instant_mcq" => Some(Self::InstantMcq),
            "case_study" => Some(Self::CaseStudy),
            "long_form" => Some(Self::LongForm),
            _ => None,
        }
    }

    /// Seeded rubric used when an assignment of this type is graded.
    pub(crate) fn default_rubric_id(self) -> Option<&'static str> {
        match self {
            Self::InstantMcq => None,
            Self::CaseStudy => Some("rubric-case-study"),
            Self::LongForm => Some("rubric-long-form"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "assignmentstatus", rename_all = "snake_case")]
pub(crate) enum AssignmentStatus {
    Draft,
    InProgress,
    Submitted,
}

impl AssignmentStatus {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "draft" => Some(Self::Draft),
            "in_progress" => Some(Self::InProgress),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

/// Learner-facing format requested at assignment creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AssignmentFormat {
    MultipleChoice,
    MixedFormat,
    ShortAnswers,
    CaseStudy,
    Project,
    Presentation,
    Essay,
}

impl AssignmentFormat {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "multiple_choice" => Some(Self::MultipleChoice),
            "mixed_format" => Some(Self::MixedFormat),
            "short_answers" => Some(Self::ShortAnswers),
            "case_study" => Some(Self::CaseStudy),
            "project" => Some(Self::Project),
            "presentation" => Some(Self::Presentation),
            "essay" => Some(Self::Essay),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::MixedFormat => "mixed_format",
            Self::ShortAnswers => "short_answers",
            Self::CaseStudy => "case_study",
            Self::Project => "project",
            Self::Presentation => "presentation",
            Self::Essay => "essay",
        }
    }

    pub(crate) fn assignment_type(self) -> AssignmentType {
        match self {
            Self::MultipleChoice | Self::MixedFormat | Self::ShortAnswers => {
                AssignmentType::InstantMcq
            }
            Self::CaseStudy => AssignmentType::CaseStudy,
            Self::Project | Self::Presentation | Self::Essay => AssignmentType::LongForm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "submissionstate", rename_all = "lowercase")]
pub(crate) enum SubmissionState {
    Draft,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gradingstatus", rename_all = "lowercase")]
pub(crate) enum GradingStatus {
    Pending,
    Grading,
    Graded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "competencylevel", rename_all = "lowercase")]
pub(crate) enum CompetencyLevel {
    Novice,
    Competent,
    Expert,
}

impl CompetencyLevel {
    pub(crate) fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Expert
        } else if score >= 60.0 {
            Self::Competent
        } else {
            Self::Novice
        }
    }

    /// Lenient parse of a model-supplied level; anything unknown is `Novice`.
    pub(crate) fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "expert" => Self::Expert,
            "competent" => Self::Competent,
            _ => Self::Novice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competency_thresholds() {
        assert_eq!(CompetencyLevel::from_score(100.0), CompetencyLevel::Expert);
        assert_eq!(CompetencyLevel::from_score(80.0), CompetencyLevel::Expert);
        assert_eq!(CompetencyLevel::from_score(79.0), CompetencyLevel::Competent);
        assert_eq!(CompetencyLevel::from_score(60.0), CompetencyLevel::Competent);
        assert_eq!(CompetencyLevel::from_score(59.0), CompetencyLevel::Novice);
    }

    #[test]
    fn competency_labels_fall_back_to_novice() {
        assert_eq!(CompetencyLevel::from_label(" Expert "), CompetencyLevel::Expert);
        assert_eq!(CompetencyLevel::from_label("competent"), CompetencyLevel::Competent);
        assert_eq!(CompetencyLevel::from_label("master"), CompetencyLevel::Novice);
    }

    #[test]
    fn formats_map_to_assignment_types() {
        assert_eq!(
            AssignmentFormat::parse("mixed_format").map(AssignmentFormat::assignment_type),
            Some(AssignmentType::InstantMcq)
        );
        assert_eq!(
            AssignmentFormat::parse("case_study").map(AssignmentFormat::assignment_type),
            Some(AssignmentType::CaseStudy)
        );
        assert_eq!(
            AssignmentFormat::parse("essay").map(AssignmentFormat::assignment_type),
            Some(AssignmentType::LongForm)
        );
        assert_eq!(AssignmentFormat::parse("podcast"), None);
    }

    #[test]
    fn rubric_defaults_by_type() {
        assert_eq!(AssignmentType::CaseStudy.default_rubric_id(), Some("rubric-case-study"));
        assert_eq!(AssignmentType::LongForm.default_rubric_id(), Some("rubric-long-form"));
        assert_eq!(AssignmentType::InstantMcq.default_rubric_id(), None);
    }
}
