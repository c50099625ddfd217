use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declare a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier (UUID v4).
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// View the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of an automation definition.
    AutomationId
);
string_id!(
    /// Identifier of a single step within an automation.
    StepId
);
string_id!(
    /// Identifier of a lead (sales prospect record).
    LeadId
);
string_id!(
    /// Identifier of one lead's enrollment in one automation.
    EnrollmentId
);
string_id!(
    /// Identifier of a message template.
    TemplateId
);
string_id!(
    /// Identifier of a pipeline stage.
    StageId
);
string_id!(
    /// Identifier of a CRM user.
    UserId
);
string_id!(
    /// The organization boundary all engine operations are confined to.
    TenantId
);
