//! Merging one section snapshot with one rule evaluation result.
//!
//! This is a pure reduction: the same snapshot and result always produce the
//! same section list. The only side effect is reporting an evaluation
//! failure, after which the snapshot is returned untouched.

use crate::effects::ErrorReporter;
use crate::errors::FormError;
use crate::identifiers::{FieldUid, SectionUid};
use crate::rules::{EvaluationResult, RuleEffect};
use crate::sections::{FieldViewModel, SectionViewModel};
use indexmap::IndexMap;
use std::sync::Arc;

/// Applies evaluation results to section snapshots.
#[derive(Clone)]
pub struct EffectApplier {
    reporter: Arc<dyn ErrorReporter>,
}

impl EffectApplier {
    /// Create an applier that reports evaluation failures to `reporter`.
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }

    /// Merge `sections` with `result`.
    ///
    /// A failed evaluation never blanks the form: the failure is reported and
    /// `sections` comes back unchanged.
    pub fn apply(
        &self,
        sections: Vec<SectionViewModel>,
        result: &EvaluationResult,
    ) -> Vec<SectionViewModel> {
        match result {
            EvaluationResult::Failure(failure) => {
                tracing::warn!(
                    error = %failure,
                    sections = sections.len(),
                    "rule evaluation failed, rendering sections without effects"
                );
                self.reporter.report(&FormError::Evaluation(failure.clone()));
                sections
            }
            EvaluationResult::Effects(effects) => merge_effects(sections, effects),
        }
    }
}

impl std::fmt::Debug for EffectApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectApplier").finish_non_exhaustive()
    }
}

/// Apply `effects` in evaluator order to `sections`.
///
/// Sections are keyed by uid in input order; on duplicate uids the first one
/// wins. Effects targeting absent sections or fields are no-ops.
pub fn merge_effects(
    sections: Vec<SectionViewModel>,
    effects: &[RuleEffect],
) -> Vec<SectionViewModel> {
    let mut by_uid: IndexMap<SectionUid, SectionViewModel> =
        IndexMap::with_capacity(sections.len());
    for section in sections {
        if by_uid.contains_key(&section.uid) {
            tracing::debug!(section = %section.uid, "dropping duplicate section");
            continue;
        }
        by_uid.insert(section.uid.clone(), section);
    }

    for effect in effects {
        match effect {
            RuleEffect::HideSection { section } => {
                by_uid.shift_remove(section);
            }
            RuleEffect::HideField { field } => {
                update_field(&mut by_uid, field, |f| f.visible = false);
            }
            RuleEffect::AssignValue { field, value } => {
                update_field(&mut by_uid, field, |f| {
                    f.value = Some(value.clone());
                    f.editable = false;
                });
            }
            RuleEffect::ShowWarning { field, message } => {
                update_field(&mut by_uid, field, |f| f.warning = Some(message.clone()));
            }
            RuleEffect::ShowError { field, message } => {
                update_field(&mut by_uid, field, |f| f.error = Some(message.clone()));
            }
            RuleEffect::Unknown => {
                tracing::trace!("ignoring unsupported rule effect");
            }
        }
    }

    by_uid.into_values().collect()
}

fn update_field<F>(sections: &mut IndexMap<SectionUid, SectionViewModel>, uid: &FieldUid, f: F)
where
    F: FnMut(&mut FieldViewModel),
{
    sections
        .values_mut()
        .flat_map(|section| section.fields.iter_mut())
        .filter(|field| &field.uid == uid)
        .for_each(f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EvaluationFailure;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<FormError>>);

    impl ErrorReporter for Recorder {
        fn report(&self, error: &FormError) {
            self.0.lock().unwrap().push(error.clone());
        }
    }

    fn section(uid: &str) -> SectionViewModel {
        SectionViewModel::new(uid, uid.to_uppercase())
    }

    fn uids(sections: &[SectionViewModel]) -> Vec<&str> {
        sections.iter().map(|s| s.uid.as_str()).collect()
    }

    #[test]
    fn hide_section_preserves_order() {
        let merged = merge_effects(
            vec![section("a"), section("b"), section("c")],
            &[RuleEffect::hide_section("b")],
        );
        assert_eq!(uids(&merged), ["a", "c"]);
    }

    #[test]
    fn hiding_absent_section_is_noop() {
        let sections = vec![section("s1")];
        let merged = merge_effects(sections.clone(), &[RuleEffect::hide_section("zz")]);
        assert_eq!(merged, sections);
    }

    #[test]
    fn duplicate_uid_keeps_first() {
        let mut second = section("a");
        second.label = "second".into();
        let merged = merge_effects(vec![section("a"), section("b"), second], &[]);
        assert_eq!(uids(&merged), ["a", "b"]);
        assert_eq!(merged[0].label, "A");
    }

    #[test]
    fn field_effects_update_fields() {
        let sections = vec![section("s1").with_fields(vec![
            FieldViewModel::new("f1", "Weight"),
            FieldViewModel::new("f2", "Height"),
            FieldViewModel::new("f3", "BMI"),
        ])];
        let merged = merge_effects(
            sections,
            &[
                RuleEffect::HideField { field: "f1".into() },
                RuleEffect::AssignValue {
                    field: "f3".into(),
                    value: "21.4".into(),
                },
                RuleEffect::ShowWarning {
                    field: "f2".into(),
                    message: "unusually tall".into(),
                },
                RuleEffect::ShowError {
                    field: "f2".into(),
                    message: "out of range".into(),
                },
                RuleEffect::Unknown,
            ],
        );
        let fields = &merged[0].fields;
        assert!(!fields[0].visible);
        assert_eq!(fields[1].warning.as_deref(), Some("unusually tall"));
        assert_eq!(fields[1].error.as_deref(), Some("out of range"));
        assert_eq!(fields[2].value.as_deref(), Some("21.4"));
        assert!(!fields[2].editable);
        assert_eq!(merged[0].visible_fields().count(), 2);
    }

    #[test]
    fn failure_returns_sections_and_reports() {
        let recorder = Arc::new(Recorder::default());
        let applier = EffectApplier::new(recorder.clone());
        let sections = vec![section("s1")];

        let merged = applier.apply(sections.clone(), &EvaluationResult::failure("bad expr"));

        assert_eq!(merged, sections);
        let reported = recorder.0.lock().unwrap();
        assert_eq!(
            *reported,
            vec![FormError::Evaluation(EvaluationFailure::new("bad expr"))]
        );
    }

    #[test]
    fn scenario_hide_second_section() {
        let recorder = Arc::new(Recorder::default());
        let applier = EffectApplier::new(recorder.clone());
        let merged = applier.apply(
            vec![section("s1"), section("s2")],
            &vec![RuleEffect::hide_section("s2")].into(),
        );
        assert_eq!(uids(&merged), ["s1"]);
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    fn arb_field() -> impl Strategy<Value = FieldViewModel> {
        ("f[0-3]", prop::option::of("[0-9]{1,2}")).prop_map(|(uid, value)| {
            let field = FieldViewModel::new(uid.as_str(), uid.to_uppercase());
            match value {
                Some(value) => field.with_value(value),
                None => field,
            }
        })
    }

    fn arb_sections() -> impl Strategy<Value = Vec<SectionViewModel>> {
        let with_fields = ("[a-e]", prop::collection::vec(arb_field(), 0..4))
            .prop_map(|(id, fields)| section(&id).with_fields(fields));
        prop::collection::vec(with_fields, 0..8)
    }

    fn arb_effect() -> impl Strategy<Value = RuleEffect> {
        prop_oneof![
            "[a-g]".prop_map(RuleEffect::hide_section),
            "f[0-4]".prop_map(|field| RuleEffect::HideField {
                field: field.into()
            }),
            ("f[0-4]", "[0-9]{1,2}").prop_map(|(field, value)| RuleEffect::AssignValue {
                field: field.into(),
                value,
            }),
            ("f[0-4]", "[a-z]{1,6}").prop_map(|(field, message)| RuleEffect::ShowWarning {
                field: field.into(),
                message,
            }),
            ("f[0-4]", "[a-z]{1,6}").prop_map(|(field, message)| RuleEffect::ShowError {
                field: field.into(),
                message,
            }),
            Just(RuleEffect::Unknown),
        ]
    }

    fn arb_effects() -> impl Strategy<Value = Vec<RuleEffect>> {
        prop::collection::vec(arb_effect(), 0..8)
    }

    proptest! {
        #[test]
        fn applying_twice_equals_applying_once(sections in arb_sections(), effects in arb_effects()) {
            let once = merge_effects(sections, &effects);
            let twice = merge_effects(once.clone(), &effects);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn output_is_ordered_subsequence_of_input(sections in arb_sections(), effects in arb_effects()) {
            let merged = merge_effects(sections.clone(), &effects);
            let mut input = sections.iter().map(|s| &s.uid);
            for kept in &merged {
                prop_assert!(input.any(|uid| uid == &kept.uid));
            }
            for effect in &effects {
                if let RuleEffect::HideSection { section } = effect {
                    prop_assert!(merged.iter().all(|s| &s.uid != section));
                }
            }
        }

        #[test]
        fn applier_is_idempotent_for_every_effect_kind(
            sections in arb_sections(),
            effects in arb_effects(),
        ) {
            let recorder = Arc::new(Recorder::default());
            let applier = EffectApplier::new(recorder.clone());
            let result = EvaluationResult::Effects(effects);
            let once = applier.apply(sections, &result);
            let twice = applier.apply(once.clone(), &result);
            prop_assert_eq!(once, twice);
            prop_assert!(recorder.0.lock().unwrap().is_empty());
        }

        #[test]
        fn failure_is_identity(sections in arb_sections(), effects in arb_effects()) {
            let applier = EffectApplier::new(Arc::new(Recorder::default()));
            let merged = applier.apply(sections.clone(), &EvaluationResult::failure("boom"));
            prop_assert_eq!(&merged, &sections);

            // Effects applied before a failed evaluation are carried through untouched.
            let annotated = merge_effects(sections, &effects);
            let merged = applier.apply(annotated.clone(), &EvaluationResult::failure("boom"));
            prop_assert_eq!(merged, annotated);
        }
    }
}
