//! Presentation-neutral view of a reply
//!
//! Maps each reply variant onto the deterministic state a client renders:
//! which input control a question needs, and the summary fields of an
//! assessment. Clients never have to interpret the raw contract themselves.

use super::{
    Assessment, ConditionType, Likelihood, Question, QuestionKind, StructuredReply, TreatmentKind,
    Urgency,
};
use serde::Serialize;

/// Shown when the model leaves the recovery time blank
const DEFAULT_RECOVERY_TIME: &str = "Varies based on treatment adherence";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyView {
    Question(QuestionView),
    Assessment(AssessmentView),
}

impl From<&StructuredReply> for ReplyView {
    fn from(reply: &StructuredReply) -> Self {
        match reply {
            StructuredReply::Question(q) => ReplyView::Question(QuestionView::from(q)),
            StructuredReply::Assessment(a) => ReplyView::Assessment(AssessmentView::from(a)),
        }
    }
}

// ============================================================================
// Questions
// ============================================================================

/// Input control a question is answered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Options,
    Scale,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub text: String,
    pub input: InputKind,
    pub options: Vec<OptionView>,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        let (input, options) = match q.kind {
            QuestionKind::MultipleChoice => (
                InputKind::Options,
                q.options
                    .iter()
                    .enumerate()
                    .map(|(i, opt)| OptionView {
                        id: i.to_string(),
                        text: opt.clone(),
                        value: opt.clone(),
                    })
                    .collect(),
            ),
            // Scale ids are the values themselves
            QuestionKind::Numeric => (
                InputKind::Scale,
                q.options
                    .iter()
                    .map(|v| OptionView {
                        id: v.clone(),
                        text: v.clone(),
                        value: v.clone(),
                    })
                    .collect(),
            ),
            QuestionKind::FreeResponse => (InputKind::FreeText, Vec::new()),
        };

        Self {
            text: q.text.clone(),
            input,
            options,
        }
    }
}

// ============================================================================
// Assessments
// ============================================================================

/// Coarse urgency shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn level(self) -> UrgencyLevel {
        match self {
            Urgency::Immediate => UrgencyLevel::High,
            Urgency::Within24Hours => UrgencyLevel::Medium,
            Urgency::WithinWeek | Urgency::NotNeeded => UrgencyLevel::Low,
        }
    }

    pub fn requires_doctor(self) -> bool {
        self != Urgency::NotNeeded
    }
}

impl Likelihood {
    pub fn as_str(self) -> &'static str {
        match self {
            Likelihood::High => "high",
            Likelihood::Medium => "medium",
            Likelihood::Low => "low",
        }
    }

    /// Display weight in `0.0..=1.0`
    pub fn score(self) -> f64 {
        match self {
            Likelihood::High => 0.9,
            Likelihood::Medium => 0.6,
            Likelihood::Low => 0.3,
        }
    }
}

impl TreatmentKind {
    pub fn note(self) -> &'static str {
        match self {
            TreatmentKind::OtcMedication => "Over-the-counter medication",
            TreatmentKind::HomeRemedy => "Home remedy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisView {
    pub condition: String,
    pub likelihood: f64,
    pub condition_type: ConditionType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreatmentView {
    pub name: String,
    pub instructions: String,
    pub note: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentView {
    pub diagnoses: Vec<DiagnosisView>,
    pub treatments: Vec<TreatmentView>,
    pub requires_doctor: bool,
    pub urgency: UrgencyLevel,
    pub doctor_reason: String,
    pub recovery_time: String,
}

impl From<&Assessment> for AssessmentView {
    fn from(a: &Assessment) -> Self {
        let diagnoses = a
            .possible_conditions
            .iter()
            .map(|c| DiagnosisView {
                condition: c.condition.clone(),
                likelihood: c.likelihood.score(),
                condition_type: c.kind,
                description: format!(
                    "This condition is {} likelihood and requires attention.",
                    c.likelihood.as_str()
                ),
            })
            .collect();

        let treatments = a
            .recommended_treatments
            .iter()
            .map(|t| TreatmentView {
                name: t.name.clone(),
                instructions: t.instructions.clone(),
                note: t.kind.note(),
            })
            .collect();

        let recovery_time = if a.expected_recovery_time.trim().is_empty() {
            DEFAULT_RECOVERY_TIME.to_string()
        } else {
            a.expected_recovery_time.clone()
        };

        Self {
            diagnoses,
            treatments,
            requires_doctor: a.doctor_visit.urgency.requires_doctor(),
            urgency: a.doctor_visit.urgency.level(),
            doctor_reason: a.doctor_visit.reason.clone(),
            recovery_time,
        }
    }
}
