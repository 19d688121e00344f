//! Opaque string identifiers for forms, sections and fields.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_uid {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(uid: impl Into<String>) -> Self {
                Self(uid.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(uid: &str) -> Self {
                Self(uid.to_string())
            }
        }

        impl From<String> for $name {
            fn from(uid: String) -> Self {
                Self(uid)
            }
        }
    };
}

string_uid!(
    /// Identifier of the form (event or enrollment) being captured.
    FormId
);

string_uid!(
    /// Identifier of a section, unique within one section snapshot.
    SectionUid
);

string_uid!(
    /// Identifier of a data field.
    FieldUid
);
