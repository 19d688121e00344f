//! Small constructors for test data.

use forma_core::{FieldViewModel, RuleEffect, SectionViewModel};

/// Section with an upper-cased label and no fields.
pub fn section(uid: &str) -> SectionViewModel {
    SectionViewModel::new(uid, uid.to_uppercase())
}

/// Sections for each uid, in order.
pub fn sections(uids: &[&str]) -> Vec<SectionViewModel> {
    uids.iter().map(|uid| section(uid)).collect()
}

/// Visible, editable field.
pub fn field(uid: &str) -> FieldViewModel {
    FieldViewModel::new(uid, uid.to_uppercase())
}

/// Hide-section effect.
pub fn hide(uid: &str) -> RuleEffect {
    RuleEffect::hide_section(uid)
}

/// Section uids in order.
pub fn uids(sections: &[SectionViewModel]) -> Vec<String> {
    sections.iter().map(|s| s.uid.to_string()).collect()
}
