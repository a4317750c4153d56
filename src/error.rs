//! Error taxonomy for builder registration and group binding.
//!
//! Configuration errors are caller-fixable and carry the dotted field path
//! of the offending declaration. Builder and registrar failures keep their
//! underlying cause as the error source.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed error returned by builders.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure while deriving a label schema from a label record.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The single parameter of a metric slot is not a label record.
    #[error("labels must be a label record, got `{type_name}`")]
    NotAStruct { type_name: &'static str },

    /// A scalar label field has no `label` metadata entry.
    #[error("label field `{field}` does not have the `label` metadata key")]
    MissingLabelTag { field: String },

    /// A label field's type is not a string, bool or signed integer.
    #[error("label `{label}` (field `{field}`) has unsupported type `{type_name}`")]
    UnsupportedLabelKind {
        field: String,
        label: String,
        type_name: &'static str,
    },

    /// Two fields resolve to the same wire label name.
    #[error("label `{label}` can't be registered twice")]
    DuplicateLabel { label: String },
}

/// What went wrong while binding one field of a metric group.
#[derive(Debug, Error)]
pub enum BindErrorKind {
    #[error("`name` metadata missing")]
    MissingNameTag,

    #[error("`help` metadata missing")]
    MissingHelpTag,

    /// A nested group lacks a non-empty `namespace` entry.
    #[error("nested group does not have the `namespace` metadata defined")]
    MissingNamespaceTag,

    /// The group already has bound slots; nothing was registered.
    #[error("metric group `{type_name}` is already bound")]
    AlreadyBound { type_name: &'static str },

    /// The field is neither a metric slot nor a nested metric group.
    #[error("metric groups may only contain metric slots or nested groups, got `{type_name}`")]
    UnsupportedFieldKind { type_name: &'static str },

    #[error("expected at most 1 label parameter, got {count}")]
    TooManyParameters { count: usize },

    #[error("expected 1 return value, got {count}")]
    TooManyReturnValues { count: usize },

    #[error("build labels: {0}")]
    Labels(#[from] LabelError),

    /// No builder is registered for the slot's output type.
    #[error("no builder found for type `{type_name}`")]
    NoBuilderForType { type_name: &'static str },

    /// The builder rejected the declaration (e.g. malformed `buckets`).
    #[error("build metric `{metric}`: {source}")]
    BuilderFailed {
        metric: String,
        #[source]
        source: BoxError,
    },

    /// The registrar rejected the collector, commonly a name collision.
    #[error("register metric `{metric}`: {source}")]
    RegistrationFailed {
        metric: String,
        #[source]
        source: prometheus::Error,
    },
}

/// A failed bind, located by the dotted path of the offending field.
#[derive(Debug)]
pub struct BindError {
    path: String,
    kind: BindErrorKind,
}

impl BindError {
    pub(crate) fn new(path: String, kind: BindErrorKind) -> Self {
        Self { path, kind }
    }

    /// Dotted field path, e.g. `server.hits`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &BindErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> BindErrorKind {
        self.kind
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "field `{}`: {}", self.path, self.kind)
        }
    }
}

impl StdError for BindError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.kind.source()
    }
}

/// Failure while registering a builder.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("type `{type_name}` already has a builder")]
    DuplicateBuilder { type_name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display_includes_path() {
        let err = BindError::new("server.hits".to_string(), BindErrorKind::MissingHelpTag);
        assert_eq!(err.to_string(), "field `server.hits`: `help` metadata missing");
        assert_eq!(err.path(), "server.hits");
    }

    #[test]
    fn test_bind_error_source_skips_kind() {
        let inner: BoxError = "invalid bucket".into();
        let err = BindError::new(
            "latency".to_string(),
            BindErrorKind::BuilderFailed {
                metric: "latency_seconds".to_string(),
                source: inner,
            },
        );
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("invalid bucket"));
    }
}
