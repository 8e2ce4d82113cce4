use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::DescriptorParseError;

static RE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w$-]*$").unwrap());
static RE_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w]*(?:\.[A-Za-z_][\w]*)*$").unwrap());

// ---------------------------------------------------------------------------
// Definition types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefType {
    Application,
    Component,
    Event,
    Controller,
    Model,
    Provider,
    Style,
    Flavor,
}

impl DefType {
    /// Upper-case label used in "No X named ... found" messages.
    pub fn label(&self) -> &'static str {
        match self {
            DefType::Application => "APPLICATION",
            DefType::Component => "COMPONENT",
            DefType::Event => "EVENT",
            DefType::Controller => "CONTROLLER",
            DefType::Model => "MODEL",
            DefType::Provider => "PROVIDER",
            DefType::Style => "STYLE",
            DefType::Flavor => "FLAVOR",
        }
    }

    /// Kind assumed for a qualified name that carries no prefix.
    pub fn default_kind(&self) -> ReferenceKind {
        match self {
            DefType::Application | DefType::Component | DefType::Event => ReferenceKind::Markup,
            DefType::Controller | DefType::Model | DefType::Provider => ReferenceKind::Native,
            DefType::Style | DefType::Flavor => ReferenceKind::Stylesheet,
        }
    }

    /// Whether this type is built from markup (and so can extend or be referenced).
    pub fn is_markup(&self) -> bool {
        matches!(self, DefType::Application | DefType::Component)
    }
}

// ---------------------------------------------------------------------------
// Reference kind (resolved once from the qualified-name prefix)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Markup,
    Native,
    Scripted,
    Stylesheet,
}

impl ReferenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ReferenceKind::Markup => "markup",
            ReferenceKind::Native => "java",
            ReferenceKind::Scripted => "js",
            ReferenceKind::Stylesheet => "css",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "markup" => Some(ReferenceKind::Markup),
            "java" | "apex" => Some(ReferenceKind::Native),
            "js" => Some(ReferenceKind::Scripted),
            "css" => Some(ReferenceKind::Stylesheet),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Immutable identity of a definable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefDescriptor {
    pub kind: ReferenceKind,
    pub namespace: String,
    pub name: String,
    #[serde(rename = "type")]
    pub def_type: DefType,
}

impl DefDescriptor {
    pub fn new(
        kind: ReferenceKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        def_type: DefType,
    ) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            def_type,
        }
    }

    pub fn markup(namespace: impl Into<String>, name: impl Into<String>, def_type: DefType) -> Self {
        Self::new(ReferenceKind::Markup, namespace, name, def_type)
    }

    /// Parse a qualified name such as `markup://ui:button`, `java://pkg.Cls`,
    /// `js://ns.name` or the unprefixed forms `ui:button` and `pkg.Cls`.
    pub fn parse(qualified: &str, def_type: DefType) -> Result<Self, DescriptorParseError> {
        let qualified = qualified.trim();
        if qualified.is_empty() {
            return Err(DescriptorParseError::Empty);
        }

        let (kind, rest) = match qualified.split_once("://") {
            Some((prefix, rest)) => {
                let kind = ReferenceKind::from_prefix(prefix)
                    .ok_or_else(|| DescriptorParseError::UnknownPrefix(prefix.to_string()))?;
                (kind, rest)
            }
            None if qualified.contains(':') => (ReferenceKind::Markup, qualified),
            None => (def_type.default_kind(), qualified),
        };

        let malformed = || DescriptorParseError::Malformed(qualified.to_string());
        if rest.is_empty() {
            return Err(malformed());
        }

        let (namespace, name) = match kind {
            ReferenceKind::Markup => rest.split_once(':').ok_or_else(malformed)?,
            _ => rest.rsplit_once('.').unwrap_or(("", rest)),
        };

        if !RE_NAME.is_match(name) {
            return Err(malformed());
        }
        let namespace_ok = match kind {
            ReferenceKind::Markup => RE_NAME.is_match(namespace),
            _ => namespace.is_empty() || RE_PACKAGE.is_match(namespace),
        };
        if !namespace_ok {
            return Err(malformed());
        }

        Ok(Self::new(kind, namespace, name, def_type))
    }

    pub fn qualified_name(&self) -> String {
        match self.kind {
            ReferenceKind::Markup => {
                format!("{}://{}:{}", self.kind.prefix(), self.namespace, self.name)
            }
            _ if self.namespace.is_empty() => format!("{}://{}", self.kind.prefix(), self.name),
            _ => format!("{}://{}.{}", self.kind.prefix(), self.namespace, self.name),
        }
    }

    /// `ns:name`, the form used in markup (`extends='ns:name'`, `<ns:name/>`).
    pub fn descriptor_name(&self) -> String {
        format!("{}:{}", self.namespace, self.name)
    }

    /// Standard flavor file of a component; derived, never independently named.
    pub fn flavor_descriptor(&self) -> DefDescriptor {
        Self::new(ReferenceKind::Stylesheet, &self.namespace, &self.name, DefType::Flavor)
    }

    pub fn style_descriptor(&self) -> DefDescriptor {
        Self::new(ReferenceKind::Stylesheet, &self.namespace, &self.name, DefType::Style)
    }

    /// Script artifact of the given type attached to this component by name.
    pub fn script_descriptor(&self, def_type: DefType) -> DefDescriptor {
        Self::new(ReferenceKind::Scripted, &self.namespace, &self.name, def_type)
    }
}

impl fmt::Display for DefDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}
