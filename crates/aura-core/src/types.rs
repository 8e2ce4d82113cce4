use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::{DefDescriptor, ReferenceKind};

// ---------------------------------------------------------------------------
// Token types (internal, produced by the lexer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    OpenTag,
    CloseTag,
    Text,
    Comment,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub raw: String,
    pub line: usize,
    pub col: usize,
    pub data: TokenData,
}

#[derive(Debug, Clone, Default)]
pub struct TokenData {
    /// Tag name for open/close tags.
    pub name: Option<String>,
    pub attributes: Vec<RawAttribute>,
    pub self_closing: bool,
    /// Entity-decoded text for text and comment tokens.
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub value: String,
    pub line: usize,
    pub col: usize,
}

// ---------------------------------------------------------------------------
// Parse tree
// ---------------------------------------------------------------------------

/// Attribute value as written: a literal or a `{!...}` / `{#...}` expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Literal(String),
    Expression(String),
}

impl AttributeValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let is_expression =
            (trimmed.starts_with("{!") || trimmed.starts_with("{#")) && trimmed.ends_with('}');
        if is_expression {
            AttributeValue::Expression(trimmed[2..trimmed.len() - 1].trim().to_string())
        } else {
            AttributeValue::Literal(raw.to_string())
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            AttributeValue::Literal(s) => Some(s),
            AttributeValue::Expression(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupAttribute {
    pub name: String,
    pub value: AttributeValue,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Full tag as written, e.g. `aura:component` or `div`.
    pub tag: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub attributes: Vec<MarkupAttribute>,
    pub children: Vec<MarkupNode>,
    pub line: usize,
    pub col: usize,
}

impl Element {
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Attribute lookup; names compare case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&MarkupAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn literal(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|a| a.value.as_literal())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            MarkupNode::Element(e) => Some(e),
            MarkupNode::Text(_) => None,
        })
    }

    /// Concatenated direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                MarkupNode::Text(t) => Some(t.as_str()),
                MarkupNode::Element(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupTree {
    pub source_name: String,
    pub root: Element,
}

// ---------------------------------------------------------------------------
// Definition model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderType {
    #[default]
    Auto,
    Server,
    Client,
}

impl RenderType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(RenderType::Auto),
            "server" => Some(RenderType::Server),
            "client" => Some(RenderType::Client),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<AttributeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub declared_by: DefDescriptor,
}

/// A standard flavor file and the flavor names it defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlavorFile {
    pub descriptor: DefDescriptor,
    pub names: BTreeSet<String>,
}

/// Resolved, validated representation of one descriptor. Immutable once
/// published by the registry; a changed source produces a new instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub descriptor: DefDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends_descriptor: Option<DefDescriptor>,
    pub attribute_defs: BTreeMap<String, AttributeDef>,
    /// Values assigned with `<aura:set>`, inherited ones overlaid by own.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_values: BTreeMap<String, AttributeValue>,
    pub controller_descriptors: Vec<DefDescriptor>,
    pub model_descriptors: Vec<DefDescriptor>,
    /// Resolved provider chain: own declarations first, then inherited.
    pub provider_descriptors: Vec<DefDescriptor>,
    /// Providers declared on this definition only.
    pub own_provider_descriptors: Vec<DefDescriptor>,
    pub registered_events: BTreeMap<String, DefDescriptor>,
    /// Components referenced by tags in the body.
    pub component_refs: BTreeSet<DefDescriptor>,
    pub is_abstract: bool,
    pub is_extensible: bool,
    pub dynamically_flavorable: bool,
    pub has_flavorable_child: bool,
    /// Nearest definition in the chain (self first) marked flavorable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavorable_owner: Option<DefDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_flavor: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_file: Option<FlavorFile>,
    /// Nearest ancestor's standard flavor file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherited_flavor_file: Option<FlavorFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_descriptor: Option<DefDescriptor>,
    pub render_type: RenderType,
    /// Stamps of every source this definition was built from. `None` marks
    /// an optional artifact that was looked up and found absent.
    #[serde(skip)]
    pub source_stamps: BTreeMap<DefDescriptor, Option<u64>>,
    pub dependency_set: BTreeSet<DefDescriptor>,
    pub has_local_dependencies: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_flavor_or_implicit: Option<String>,
}

impl Definition {
    /// Bare definition with every collection empty and every flag off.
    pub fn empty(descriptor: DefDescriptor) -> Self {
        Self {
            descriptor,
            extends_descriptor: None,
            attribute_defs: BTreeMap::new(),
            attribute_values: BTreeMap::new(),
            controller_descriptors: Vec::new(),
            model_descriptors: Vec::new(),
            provider_descriptors: Vec::new(),
            own_provider_descriptors: Vec::new(),
            registered_events: BTreeMap::new(),
            component_refs: BTreeSet::new(),
            is_abstract: false,
            is_extensible: false,
            dynamically_flavorable: false,
            has_flavorable_child: false,
            flavorable_owner: None,
            default_flavor: None,
            flavor_file: None,
            inherited_flavor_file: None,
            style_descriptor: None,
            render_type: RenderType::Auto,
            source_stamps: BTreeMap::new(),
            dependency_set: BTreeSet::new(),
            has_local_dependencies: false,
            default_flavor_or_implicit: None,
        }
    }

    pub fn attribute_def(&self, name: &str) -> Option<&AttributeDef> {
        self.attribute_defs.get(name)
    }

    pub fn controller_def_descriptor(&self) -> Option<&DefDescriptor> {
        self.controller_descriptors.first()
    }

    pub fn model_def_descriptor(&self) -> Option<&DefDescriptor> {
        self.model_descriptors.first()
    }

    pub fn default_flavor_or_implicit(&self) -> Option<&str> {
        self.default_flavor_or_implicit.as_deref()
    }

    pub fn dependency_set(&self) -> &BTreeSet<DefDescriptor> {
        &self.dependency_set
    }

    pub fn has_local_dependencies(&self) -> bool {
        self.has_local_dependencies
    }

    /// False when forced client-side or when any provider runs as script.
    pub fn is_locally_renderable(&self) -> bool {
        if self.render_type == RenderType::Client {
            return false;
        }
        !self
            .provider_descriptors
            .iter()
            .any(|p| p.kind == ReferenceKind::Scripted)
    }
}

/// Result of instantiating a definition with caller-supplied attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentInstance {
    pub descriptor: DefDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provided_by: Option<DefDescriptor>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}
