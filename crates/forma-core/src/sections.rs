//! Section and field view-models.
//!
//! A section snapshot is produced fresh on every `SectionSource` emission and
//! is never mutated after it has been delivered to a sink.

use crate::identifiers::{FieldUid, SectionUid};
use serde::{Deserialize, Serialize};

/// A renderable data field owned by exactly one section snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViewModel {
    /// Field identifier
    pub uid: FieldUid,
    /// Display label
    pub label: String,
    /// Current stored value, if any
    pub value: Option<String>,
    /// Whether the field is rendered at all
    pub visible: bool,
    /// Whether the user may edit the value
    pub editable: bool,
    /// Warning attached by rule evaluation
    pub warning: Option<String>,
    /// Error attached by rule evaluation
    pub error: Option<String>,
}

impl FieldViewModel {
    /// Visible, editable field without a value.
    pub fn new(uid: impl Into<FieldUid>, label: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            label: label.into(),
            value: None,
            visible: true,
            editable: true,
            warning: None,
            error: None,
        }
    }

    /// Builder-style value setter.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A named, orderable group of fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionViewModel {
    /// Section identifier, unique within a snapshot
    pub uid: SectionUid,
    /// Display name
    pub label: String,
    /// Optional long description
    pub description: Option<String>,
    /// Fields in render order
    pub fields: Vec<FieldViewModel>,
}

impl SectionViewModel {
    /// Empty section with the given uid and label.
    pub fn new(uid: impl Into<SectionUid>, label: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            label: label.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Builder-style field list setter.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldViewModel>) -> Self {
        self.fields = fields;
        self
    }

    /// Fields that are currently rendered.
    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldViewModel> {
        self.fields.iter().filter(|field| field.visible)
    }
}
