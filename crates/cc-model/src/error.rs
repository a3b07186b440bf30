//! Validation errors raised while editing the measure catalogue

/// Documentation for the tag restrictions every measure name must satisfy.
pub const TAG_NAMING_RESTRICTIONS_URL: &str = "https://docs.microsoft.com/en-us/azure/devops/organizations/settings/naming-restrictions?view=azure-devops#tags-work-items";

/// Rejections produced by catalogue validation.
///
/// These never reach persistence: the editor surfaces them inline and leaves
/// the catalogue untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Name is empty, too long, or contains characters illegal in a tag
    #[error("Conformance name must be a valid tag name. See Azure DevOps naming restrictions ({TAG_NAMING_RESTRICTIONS_URL}) for more information.")]
    InvalidName(String),

    /// Another measure already uses this name
    #[error("A measure with this name exists already.")]
    DuplicateName(String),

    /// No measure with this name in the catalogue
    #[error("unknown measure: {0}")]
    UnknownMeasure(String),

    /// Tag value is not a legal Azure DevOps tag
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),
}

impl ValidationError {
    /// The offending value
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::InvalidName(s)
            | Self::DuplicateName(s)
            | Self::UnknownMeasure(s)
            | Self::InvalidTag(s) => s,
        }
    }
}
