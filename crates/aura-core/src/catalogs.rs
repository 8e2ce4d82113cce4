use std::collections::HashSet;
use std::sync::LazyLock;

use crate::descriptor::{DefDescriptor, DefType};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Namespace of framework-owned tags and root definitions.
pub const SYSTEM_NAMESPACE: &str = "aura";

pub const COMPONENT_ROOT_NAME: &str = "component";
pub const APPLICATION_ROOT_NAME: &str = "application";

/// Attribute marking an element as a flavor target.
pub const FLAVORABLE_ATTRIBUTE: &str = "aura:flavorable";

/// Flavor name implied by a bare `.THIS` selector.
pub const IMPLICIT_FLAVOR: &str = "default";

/// `aura:` tags handled by the framework itself; never component references.
/// Compared lower-case.
pub static SYSTEM_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut s = HashSet::new();
    // Definition-level declarations
    s.insert("attribute");
    s.insert("set");
    s.insert("registerevent");
    s.insert("handler");
    s.insert("method");
    s.insert("dependency");
    s.insert("import");
    // Body helpers
    s.insert("html");
    s.insert("if");
    s.insert("renderif");
    s.insert("iteration");
    s.insert("text");
    s.insert("expression");
    s.insert("unescapedhtml");
    s.insert("template");
    s
});

/// Attributes accepted on `<aura:component>` / `<aura:application>`.
/// Compared lower-case.
pub static ROOT_ATTRIBUTES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut s = HashSet::new();
    s.insert("abstract");
    s.insert("access");
    s.insert("controller");
    s.insert("defaultflavor");
    s.insert("description");
    s.insert("dynamicallyflavorable");
    s.insert("extends");
    s.insert("extensible");
    s.insert("model");
    s.insert("provider");
    s.insert("render");
    s.insert("support");
    s.insert("whitespace");
    s
});

/// Attribute types accepted by `<aura:attribute type='...'>`.
/// Compared lower-case; any of these may carry a `[]` array suffix.
pub static ATTRIBUTE_TYPES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut s = HashSet::new();
    // Primitives
    s.insert("string");
    s.insert("boolean");
    s.insert("integer");
    s.insert("long");
    s.insert("decimal");
    s.insert("double");
    s.insert("date");
    s.insert("datetime");
    // Structures
    s.insert("object");
    s.insert("map");
    s.insert("list");
    s.insert("set");
    // Framework types
    s.insert("aura.component");
    s.insert("aura.action");
    s.insert("aura.componentdefref");
    s
});

pub fn is_system_tag(local_name: &str) -> bool {
    SYSTEM_TAGS.contains(local_name.to_ascii_lowercase().as_str())
}

pub fn is_root_attribute(name: &str) -> bool {
    ROOT_ATTRIBUTES.contains(name.to_ascii_lowercase().as_str())
}

pub fn is_attribute_type(type_name: &str) -> bool {
    let lower = type_name.trim().to_ascii_lowercase();
    let base = lower.strip_suffix("[]").unwrap_or(&lower);
    ATTRIBUTE_TYPES.contains(base)
}

/// Root every definition of `def_type` implicitly extends.
pub fn root_descriptor(def_type: DefType) -> Option<DefDescriptor> {
    match def_type {
        DefType::Component => Some(DefDescriptor::markup(
            SYSTEM_NAMESPACE,
            COMPONENT_ROOT_NAME,
            DefType::Component,
        )),
        DefType::Application => Some(DefDescriptor::markup(
            SYSTEM_NAMESPACE,
            APPLICATION_ROOT_NAME,
            DefType::Application,
        )),
        _ => None,
    }
}

pub fn is_root(descriptor: &DefDescriptor) -> bool {
    root_descriptor(descriptor.def_type).as_ref() == Some(descriptor)
}

/// Expected root tag for a markup definition type.
pub fn root_tag(def_type: DefType) -> Option<&'static str> {
    match def_type {
        DefType::Component => Some("aura:component"),
        DefType::Application => Some("aura:application"),
        _ => None,
    }
}
