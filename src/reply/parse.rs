//! Reply validation
//!
//! Turns the model's raw text into a [`StructuredReply`]. The producer is a
//! non-deterministic remote process, so the checks are strict: anything that
//! does not match the contract exactly is rejected, never coerced.
//!
//! Checks run in order: JSON well-formedness, discriminant, required fields
//! and enumeration values, then option rules for the question kind.

use super::{
    numeric_scale, Assessment, DoctorVisit, PossibleCondition, Question, QuestionKind,
    StructuredReply, Treatment,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Classification of a rejected reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// Not parseable as JSON at all
    InvalidJson,
    /// `response_type` missing, unrecognized, or in conflict with the payload
    UnknownDiscriminant,
    /// A required field is absent or null
    MissingField,
    /// A field is present but holds the wrong JSON type
    InvalidFieldType,
    /// A string field holds a value outside its enumeration
    InvalidEnumValue,
    /// A multiple-choice question repeats an option
    DuplicateOption,
}

impl MalformedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MalformedKind::InvalidJson => "invalid_json",
            MalformedKind::UnknownDiscriminant => "unknown_discriminant",
            MalformedKind::MissingField => "missing_field",
            MalformedKind::InvalidFieldType => "invalid_field_type",
            MalformedKind::InvalidEnumValue => "invalid_enum_value",
            MalformedKind::DuplicateOption => "duplicate_option",
        }
    }
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reply that failed validation, with the offending text attached
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct MalformedReply {
    pub kind: MalformedKind,
    pub detail: String,
    pub raw: String,
}

/// Parse and validate raw model output.
pub fn parse(raw: &str) -> Result<StructuredReply, MalformedReply> {
    check_reply(raw).map_err(|v| MalformedReply {
        kind: v.kind,
        detail: v.detail,
        raw: raw.to_string(),
    })
}

// ============================================================================
// Violations
// ============================================================================

struct Violation {
    kind: MalformedKind,
    detail: String,
}

impl Violation {
    fn new(kind: MalformedKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    fn discriminant(detail: impl Into<String>) -> Self {
        Self::new(MalformedKind::UnknownDiscriminant, detail)
    }

    fn missing(path: &str) -> Self {
        Self::new(MalformedKind::MissingField, format!("{path} is required"))
    }

    fn wrong_type(path: &str, expected: &str, found: &Value) -> Self {
        Self::new(
            MalformedKind::InvalidFieldType,
            format!("{path} must be {expected}, found {}", type_name(found)),
        )
    }
}

type Check<T> = Result<T, Violation>;

// ============================================================================
// Shapes
// ============================================================================

fn check_reply(raw: &str) -> Check<StructuredReply> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Violation::new(MalformedKind::InvalidJson, e.to_string()))?;

    let root = match value {
        Value::Object(map) => map,
        other => {
            return Err(Violation::discriminant(format!(
                "expected a JSON object, found {}",
                type_name(&other)
            )))
        }
    };

    let response_type = match root.get("response_type") {
        None | Some(Value::Null) => return Err(Violation::discriminant("response_type is missing")),
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(Violation::discriminant(format!(
                "response_type must be a string, found {}",
                type_name(other)
            )))
        }
    };

    let has_question = is_populated(root.get("question"));
    let has_assessment = is_populated(root.get("assessment"));
    if has_question && has_assessment {
        return Err(Violation::discriminant(
            "both question and assessment are present",
        ));
    }

    match response_type {
        "question" => {
            if has_assessment {
                return Err(Violation::discriminant(
                    "response_type is question but the payload is an assessment",
                ));
            }
            let question = object_field(&root, "", "question")?;
            check_question(question, "question").map(StructuredReply::Question)
        }
        "assessment" => {
            if has_question {
                return Err(Violation::discriminant(
                    "response_type is assessment but the payload is a question",
                ));
            }
            let assessment = object_field(&root, "", "assessment")?;
            check_assessment(assessment, "assessment").map(StructuredReply::Assessment)
        }
        other => Err(Violation::discriminant(format!(
            "unrecognized response_type {other:?}"
        ))),
    }
}

fn check_question(q: &Map<String, Value>, path: &str) -> Check<Question> {
    let text = string_field(q, path, "text")?;
    let kind: QuestionKind = enum_field(q, path, "type")?;

    let options = match kind {
        QuestionKind::MultipleChoice => check_options(q, path)?,
        // The contract never enumerates the scale; raw options are ignored
        QuestionKind::Numeric => numeric_scale(),
        QuestionKind::FreeResponse => Vec::new(),
    };

    Ok(Question {
        text,
        kind,
        options,
    })
}

fn check_options(q: &Map<String, Value>, path: &str) -> Check<Vec<String>> {
    let options_path = join(path, "options");
    let raw_options = array_field(q, path, "options")?;
    if raw_options.is_empty() {
        return Err(Violation::new(
            MalformedKind::MissingField,
            format!("{options_path} must list at least one choice"),
        ));
    }

    let mut seen = HashSet::new();
    let mut options = Vec::with_capacity(raw_options.len());
    for (i, value) in raw_options.iter().enumerate() {
        let Value::String(option) = value else {
            return Err(Violation::wrong_type(
                &format!("{options_path}[{i}]"),
                "a string",
                value,
            ));
        };
        if !seen.insert(option.as_str()) {
            return Err(Violation::new(
                MalformedKind::DuplicateOption,
                format!("{options_path}[{i}] repeats {option:?}"),
            ));
        }
        options.push(option.clone());
    }

    Ok(options)
}

fn check_assessment(a: &Map<String, Value>, path: &str) -> Check<Assessment> {
    let conditions_path = join(path, "possible_conditions");
    let possible_conditions = array_field(a, path, "possible_conditions")?
        .iter()
        .enumerate()
        .map(|(i, value)| -> Check<PossibleCondition> {
            let item_path = format!("{conditions_path}[{i}]");
            let item = as_object(value, &item_path)?;
            Ok(PossibleCondition {
                condition: string_field(item, &item_path, "condition")?,
                likelihood: enum_field(item, &item_path, "likelihood")?,
                kind: enum_field(item, &item_path, "type")?,
            })
        })
        .collect::<Check<Vec<_>>>()?;

    let treatments_path = join(path, "recommended_treatments");
    let recommended_treatments = array_field(a, path, "recommended_treatments")?
        .iter()
        .enumerate()
        .map(|(i, value)| -> Check<Treatment> {
            let item_path = format!("{treatments_path}[{i}]");
            let item = as_object(value, &item_path)?;
            Ok(Treatment {
                name: string_field(item, &item_path, "name")?,
                kind: enum_field(item, &item_path, "type")?,
                instructions: string_field(item, &item_path, "instructions")?,
            })
        })
        .collect::<Check<Vec<_>>>()?;

    let visit_path = join(path, "doctor_visit_recommendation");
    let visit = object_field(a, path, "doctor_visit_recommendation")?;
    let doctor_visit = DoctorVisit {
        urgency: enum_field(visit, &visit_path, "urgency")?,
        reason: string_field(visit, &visit_path, "reason")?,
    };

    Ok(Assessment {
        possible_conditions,
        recommended_treatments,
        doctor_visit,
        expected_recovery_time: string_field(a, path, "expected_recovery_time")?,
    })
}

// ============================================================================
// Field access
// ============================================================================

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn is_populated(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn required<'a>(obj: &'a Map<String, Value>, path: &str, name: &str) -> Check<&'a Value> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(Violation::missing(&join(path, name))),
        Some(value) => Ok(value),
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Check<&'a Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Violation::wrong_type(path, "an object", other)),
    }
}

fn object_field<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    name: &str,
) -> Check<&'a Map<String, Value>> {
    as_object(required(obj, path, name)?, &join(path, name))
}

fn array_field<'a>(obj: &'a Map<String, Value>, path: &str, name: &str) -> Check<&'a [Value]> {
    match required(obj, path, name)? {
        Value::Array(items) => Ok(items.as_slice()),
        other => Err(Violation::wrong_type(&join(path, name), "an array", other)),
    }
}

fn string_field(obj: &Map<String, Value>, path: &str, name: &str) -> Check<String> {
    match required(obj, path, name)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(Violation::wrong_type(&join(path, name), "a string", other)),
    }
}

fn enum_field<T: DeserializeOwned>(obj: &Map<String, Value>, path: &str, name: &str) -> Check<T> {
    let value = required(obj, path, name)?;
    let Value::String(s) = value else {
        return Err(Violation::wrong_type(&join(path, name), "a string", value));
    };
    serde_json::from_value(value.clone()).map_err(|_| {
        Violation::new(
            MalformedKind::InvalidEnumValue,
            format!("{} has unexpected value {s:?}", join(path, name)),
        )
    })
}
