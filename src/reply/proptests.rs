//! Property-based tests for the reply contract
//!
//! - Serializing any valid reply and parsing it back is lossless
//! - Numeric questions always normalize to the 1-10 scale
//! - A payload carrying both variants is always rejected

use super::*;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Strategies
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.?'-]{0,60}"
}

fn arb_question() -> impl Strategy<Value = Question> {
    prop_oneof![
        (
            arb_text(),
            proptest::collection::hash_set("[a-zA-Z ]{1,20}", 1..6)
        )
            .prop_map(|(text, options)| Question {
                text,
                kind: QuestionKind::MultipleChoice,
                options: options.into_iter().collect(),
            }),
        arb_text().prop_map(Question::numeric),
        arb_text().prop_map(|text| Question {
            text,
            kind: QuestionKind::FreeResponse,
            options: vec![],
        }),
    ]
}

fn arb_likelihood() -> impl Strategy<Value = Likelihood> {
    prop_oneof![
        Just(Likelihood::High),
        Just(Likelihood::Medium),
        Just(Likelihood::Low),
    ]
}

fn arb_condition_type() -> impl Strategy<Value = ConditionType> {
    prop_oneof![
        Just(ConditionType::Bacterial),
        Just(ConditionType::Viral),
        Just(ConditionType::Other),
    ]
}

fn arb_treatment_kind() -> impl Strategy<Value = TreatmentKind> {
    prop_oneof![Just(TreatmentKind::OtcMedication), Just(TreatmentKind::HomeRemedy)]
}

fn arb_urgency() -> impl Strategy<Value = Urgency> {
    prop_oneof![
        Just(Urgency::Immediate),
        Just(Urgency::Within24Hours),
        Just(Urgency::WithinWeek),
        Just(Urgency::NotNeeded),
    ]
}

fn arb_assessment() -> impl Strategy<Value = Assessment> {
    let conditions = proptest::collection::vec(
        (arb_text(), arb_likelihood(), arb_condition_type()).prop_map(
            |(condition, likelihood, kind)| PossibleCondition {
                condition,
                likelihood,
                kind,
            },
        ),
        0..4,
    );
    let treatments = proptest::collection::vec(
        (arb_text(), arb_treatment_kind(), arb_text()).prop_map(|(name, kind, instructions)| {
            Treatment {
                name,
                kind,
                instructions,
            }
        }),
        0..4,
    );

    (conditions, treatments, arb_urgency(), arb_text(), arb_text()).prop_map(
        |(possible_conditions, recommended_treatments, urgency, reason, recovery)| Assessment {
            possible_conditions,
            recommended_treatments,
            doctor_visit: DoctorVisit { urgency, reason },
            expected_recovery_time: recovery,
        },
    )
}

fn arb_reply() -> impl Strategy<Value = StructuredReply> {
    prop_oneof![
        arb_question().prop_map(StructuredReply::Question),
        arb_assessment().prop_map(StructuredReply::Assessment),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_round_trip(reply in arb_reply()) {
        let raw = serde_json::to_string(&reply).unwrap();
        let parsed = parse(&raw).unwrap();
        prop_assert_eq!(parsed, reply);
    }

    #[test]
    fn prop_numeric_scale_synthesized(
        text in arb_text(),
        raw_options in proptest::option::of(proptest::collection::vec("[a-z0-9]{0,5}", 0..12)),
    ) {
        let mut question = json!({"text": text, "type": "numeric"});
        if let Some(options) = raw_options {
            question["options"] = json!(options);
        }
        let raw = json!({"response_type": "question", "question": question}).to_string();

        let StructuredReply::Question(q) = parse(&raw).unwrap() else {
            return Err(TestCaseError::fail("expected question"));
        };
        prop_assert_eq!(q.options, numeric_scale());
    }

    #[test]
    fn prop_both_payloads_rejected(
        question in arb_question(),
        assessment in arb_assessment(),
        tag in prop_oneof![Just("question"), Just("assessment")],
    ) {
        let raw = json!({
            "response_type": tag,
            "question": question,
            "assessment": assessment,
        })
        .to_string();
        let err = parse(&raw).unwrap_err();
        prop_assert_eq!(err.kind, MalformedKind::UnknownDiscriminant);
    }

    #[test]
    fn prop_view_urgency_matches_doctor_flag(assessment in arb_assessment()) {
        let view = AssessmentView::from(&assessment);
        prop_assert_eq!(
            view.requires_doctor,
            assessment.doctor_visit.urgency != Urgency::NotNeeded
        );
        prop_assert_eq!(view.diagnoses.len(), assessment.possible_conditions.len());
    }
}
