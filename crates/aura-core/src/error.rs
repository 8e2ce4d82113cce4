use thiserror::Error;

use crate::descriptor::{DefDescriptor, DefType};

/// Failure of a single resolution request.
///
/// Cloneable so that every caller coalesced onto the same in-flight build
/// observes the identical failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Structural parse failure of the markup text.
    #[error("{source_name}:{line}:{col}: malformed markup: {message}")]
    MalformedMarkup {
        source_name: String,
        line: usize,
        col: usize,
        message: String,
    },

    /// Markup that parses but is forbidden regardless of context.
    #[error("{source_name}:{line}:{col}: invalid markup in <{tag}>: {message}")]
    InvalidMarkup {
        source_name: String,
        tag: String,
        line: usize,
        col: usize,
        message: String,
    },

    #[error("No {} named {qualified_name} found", def_type.label())]
    DefinitionNotFound {
        def_type: DefType,
        qualified_name: String,
    },

    #[error("Cyclic extension detected: {chain}")]
    CyclicExtension { chain: String },

    #[error("{descriptor}: {message}")]
    InvalidDefinition { descriptor: String, message: String },

    #[error("The flavor named '{name}' was not found in {flavor_descriptor}")]
    FlavorNameNotFound {
        name: String,
        flavor_descriptor: String,
    },

    #[error("Unable to read source for {descriptor}: {reason}")]
    SourceUnreadable { descriptor: String, reason: String },
}

impl DefinitionError {
    pub fn invalid(descriptor: &DefDescriptor, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            descriptor: descriptor.qualified_name(),
            message: message.into(),
        }
    }

    pub fn not_found(descriptor: &DefDescriptor) -> Self {
        Self::DefinitionNotFound {
            def_type: descriptor.def_type,
            qualified_name: descriptor.qualified_name(),
        }
    }

    /// Short kind name, used by the CLI when reporting diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedMarkup { .. } => "malformed-markup",
            Self::InvalidMarkup { .. } => "invalid-markup",
            Self::DefinitionNotFound { .. } => "definition-not-found",
            Self::CyclicExtension { .. } => "cyclic-extension",
            Self::InvalidDefinition { .. } => "invalid-definition",
            Self::FlavorNameNotFound { .. } => "flavor-name-not-found",
            Self::SourceUnreadable { .. } => "source-unreadable",
        }
    }
}

/// Failure reported by a [`crate::source::SourceProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("no source found for {0}")]
    NotFound(DefDescriptor),

    #[error("unable to read {descriptor}: {reason}")]
    Unreadable {
        descriptor: DefDescriptor,
        reason: String,
    },
}

impl From<SourceError> for DefinitionError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(descriptor) => DefinitionError::not_found(&descriptor),
            SourceError::Unreadable { descriptor, reason } => DefinitionError::SourceUnreadable {
                descriptor: descriptor.qualified_name(),
                reason,
            },
        }
    }
}

/// Failure to turn a qualified-name string into a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorParseError {
    #[error("qualified name is required for descriptors")]
    Empty,

    #[error("unknown descriptor prefix '{0}'")]
    UnknownPrefix(String),

    #[error("invalid qualified name '{0}'")]
    Malformed(String),
}
