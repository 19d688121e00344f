//! Rule-engine output consumed by the effect applier.

use crate::errors::EvaluationFailure;
use crate::identifiers::{FieldUid, SectionUid};
use serde::{Deserialize, Serialize};

/// A single instruction produced by rule evaluation.
///
/// The variant set is closed. Kinds this crate does not understand decode to
/// [`RuleEffect::Unknown`] and are skipped by the applier, so a newer rule
/// engine never breaks an older form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RuleEffect {
    /// Remove a whole section from the rendered form
    HideSection {
        /// Target section
        section: SectionUid,
    },
    /// Hide a single field wherever it appears
    HideField {
        /// Target field
        field: FieldUid,
    },
    /// Force a computed value into a field and lock it
    AssignValue {
        /// Target field
        field: FieldUid,
        /// Computed value
        value: String,
    },
    /// Attach a warning message to a field
    ShowWarning {
        /// Target field
        field: FieldUid,
        /// Message shown next to the field
        message: String,
    },
    /// Attach an error message to a field
    ShowError {
        /// Target field
        field: FieldUid,
        /// Message shown next to the field
        message: String,
    },
    /// An effect kind not known to this build
    #[serde(other)]
    Unknown,
}

impl RuleEffect {
    /// Convenience constructor for the most common effect.
    pub fn hide_section(section: impl Into<SectionUid>) -> Self {
        Self::HideSection {
            section: section.into(),
        }
    }

    /// Short kebab-case name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HideSection { .. } => "hide-section",
            Self::HideField { .. } => "hide-field",
            Self::AssignValue { .. } => "assign-value",
            Self::ShowWarning { .. } => "show-warning",
            Self::ShowError { .. } => "show-error",
            Self::Unknown => "unknown",
        }
    }
}

/// Outcome of one rule evaluation: either effects or a failure, never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvaluationResult {
    /// Evaluation succeeded; effects are in evaluator order (may be empty)
    Effects(Vec<RuleEffect>),
    /// Evaluation could not produce effects
    Failure(EvaluationFailure),
}

impl EvaluationResult {
    /// Successful evaluation with no effects.
    pub fn empty() -> Self {
        Self::Effects(Vec::new())
    }

    /// Failed evaluation with a message and no cause.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(EvaluationFailure::new(message))
    }

    /// Effects of a successful evaluation; empty for failures.
    pub fn effects(&self) -> &[RuleEffect] {
        match self {
            Self::Effects(effects) => effects,
            Self::Failure(_) => &[],
        }
    }

    /// The failure, if evaluation failed.
    pub fn as_failure(&self) -> Option<&EvaluationFailure> {
        match self {
            Self::Effects(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

impl From<Vec<RuleEffect>> for EvaluationResult {
    fn from(effects: Vec<RuleEffect>) -> Self {
        Self::Effects(effects)
    }
}

impl From<Result<Vec<RuleEffect>, EvaluationFailure>> for EvaluationResult {
    fn from(result: Result<Vec<RuleEffect>, EvaluationFailure>) -> Self {
        match result {
            Ok(effects) => Self::Effects(effects),
            Err(failure) => Self::Failure(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_effect() {
        let effect: RuleEffect =
            serde_json::from_str(r#"{"action":"hide-section","section":"s2"}"#).unwrap();
        assert_eq!(effect, RuleEffect::hide_section("s2"));
    }

    #[test]
    fn unknown_kind_decodes_to_unknown() {
        let effect: RuleEffect =
            serde_json::from_str(r#"{"action":"display-key-value-pair"}"#).unwrap();
        assert_eq!(effect, RuleEffect::Unknown);
        assert_eq!(effect.kind(), "unknown");
    }

    #[test]
    fn failure_has_no_effects() {
        let result = EvaluationResult::failure("bad expr");
        assert!(result.effects().is_empty());
        assert_eq!(result.as_failure().map(|f| f.message.as_str()), Some("bad expr"));
    }
}
