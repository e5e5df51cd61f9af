//! Structured model replies
//!
//! The model answers every turn with one of two JSON shapes. They are modeled
//! as a closed tagged union so consumers match exhaustively instead of probing
//! fields. Values only enter through [`parse`], and serialize back into the
//! same contract shape.

mod parse;
#[cfg(test)]
mod proptests;
mod view;

pub use parse::{parse, MalformedKind, MalformedReply};
pub use view::{
    AssessmentView, DiagnosisView, InputKind, OptionView, QuestionView, ReplyView, TreatmentView,
    UrgencyLevel,
};

use serde::{Deserialize, Serialize, Serializer};

/// Upper bound of the implicit numeric scale
pub const NUMERIC_SCALE_MAX: u8 = 10;

/// A validated model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredReply {
    Question(Question),
    Assessment(Assessment),
}

impl StructuredReply {
    /// Discriminant value as it appears on the wire
    pub fn response_type(&self) -> &'static str {
        match self {
            StructuredReply::Question(_) => "question",
            StructuredReply::Assessment(_) => "assessment",
        }
    }
}

#[derive(Serialize)]
struct ReplyWire<'a> {
    response_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<&'a Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<&'a Assessment>,
}

impl Serialize for StructuredReply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            StructuredReply::Question(q) => ReplyWire {
                response_type: self.response_type(),
                question: Some(q),
                assessment: None,
            },
            StructuredReply::Assessment(a) => ReplyWire {
                response_type: self.response_type(),
                question: None,
                assessment: Some(a),
            },
        };
        wire.serialize(serializer)
    }
}

// ============================================================================
// Question
// ============================================================================

/// Kind of follow-up question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    /// Always a 1-10 scale
    Numeric,
    FreeResponse,
}

/// Follow-up question
///
/// `options` is non-empty with distinct entries for multiple choice, exactly
/// `"1"..="10"` for numeric, and empty for free response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Question {
    pub fn numeric(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: QuestionKind::Numeric,
            options: numeric_scale(),
        }
    }
}

/// The implicit options of a numeric question
pub fn numeric_scale() -> Vec<String> {
    (1..=NUMERIC_SCALE_MAX).map(|n| n.to_string()).collect()
}

// ============================================================================
// Assessment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Likelihood {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Bacterial,
    Viral,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentKind {
    OtcMedication,
    HomeRemedy,
}

/// How soon the user should see a doctor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "within_24_hours")]
    Within24Hours,
    #[serde(rename = "within_week")]
    WithinWeek,
    #[serde(rename = "not_needed")]
    NotNeeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PossibleCondition {
    pub condition: String,
    pub likelihood: Likelihood,
    #[serde(rename = "type")]
    pub kind: ConditionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Treatment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TreatmentKind,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorVisit {
    pub urgency: Urgency,
    pub reason: String,
}

/// Final assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub possible_conditions: Vec<PossibleCondition>,
    pub recommended_treatments: Vec<Treatment>,
    #[serde(rename = "doctor_visit_recommendation")]
    pub doctor_visit: DoctorVisit,
    pub expected_recovery_time: String,
}
