//! Engine error taxonomy.

use css_cssom::BackendError;
use css_selectors::SelectorError;
use css_style_attr::StyleInputError;
use thiserror::Error;

/// Everything a define, remove, or patch can fail with.
#[derive(Debug, Error)]
pub enum StyleError {
    /// The style argument is neither a mapping nor a reactive mapping.
    /// Raised before any bucket or cache mutation.
    #[error("invalid style input: {0}")]
    InvalidStyleInput(#[from] StyleInputError),

    /// The selector starts with an at-rule marker.
    #[error("invalid selector: {0}")]
    InvalidSelector(#[from] SelectorError),

    /// The backend rejected the rule text. Not retried.
    #[error("stylesheet backend rejected `{rule_text}`")]
    RuleInsertionFailed {
        rule_text: String,
        #[source]
        source: BackendError,
    },

    /// The backend cannot host stylesheets; the engine was not constructed.
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StyleError {
    /// Classify a failed insertion of `rule_text`.
    pub fn insertion(rule_text: &str, source: BackendError) -> Self {
        match source {
            BackendError::InvalidRule { .. } => Self::RuleInsertionFailed {
                rule_text: rule_text.to_owned(),
                source,
            },
            other => Self::Backend(other),
        }
    }
}
