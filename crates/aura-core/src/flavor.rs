//! Flavor name lookup and default-flavor rules.
//!
//! A definition carries summaries of its extension chain computed at build
//! time (`flavorable_owner`, `inherited_flavor_file`), so the rules here never
//! walk ancestors themselves.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::catalogs::IMPLICIT_FLAVOR;
use crate::error::DefinitionError;
use crate::types::{Definition, FlavorFile};

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static RE_FLAVOR_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.THIS(?:--([\w-]+))?").unwrap());

/// Carries both wordings of the missing-flavorable-element failure.
pub const NO_FLAVORABLE_CHILDREN: &str = "The defaultFlavor attribute cannot be specified on a \
     component with no flavorable children; a component declaring a default flavor must contain \
     at least one aura:flavorable element";

/// Flavor names defined by a flavor stylesheet. `.THIS--name` defines
/// `name`; a bare `.THIS` defines the implicit `default`.
pub fn flavor_names(css: &str) -> BTreeSet<String> {
    let stripped = RE_COMMENT.replace_all(css, "");
    RE_FLAVOR_SELECTOR
        .captures_iter(&stripped)
        .map(|caps| match caps.get(1) {
            Some(name) => name.as_str().to_string(),
            None => IMPLICIT_FLAVOR.to_string(),
        })
        .collect()
}

/// Split a `defaultFlavor` attribute into its ordered names.
pub fn parse_default_flavor(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// The flavor file default names are checked against: own, else the
/// nearest ancestor's.
pub fn effective_flavor_file(def: &Definition) -> Option<&FlavorFile> {
    def.flavor_file.as_ref().or(def.inherited_flavor_file.as_ref())
}

pub fn validate_flavorable(def: &Definition) -> Result<(), DefinitionError> {
    let Some(names) = &def.default_flavor else {
        if def.flavor_file.is_some() && def.flavorable_owner.is_none() {
            return Err(DefinitionError::invalid(&def.descriptor, NO_FLAVORABLE_CHILDREN));
        }
        return Ok(());
    };

    if def.flavorable_owner.is_none() {
        return Err(DefinitionError::invalid(&def.descriptor, NO_FLAVORABLE_CHILDREN));
    }

    let file = effective_flavor_file(def);
    for name in names {
        if !file.is_some_and(|f| f.names.contains(name)) {
            let flavor_descriptor = file
                .map(|f| f.descriptor.clone())
                .unwrap_or_else(|| def.descriptor.flavor_descriptor());
            return Err(DefinitionError::FlavorNameNotFound {
                name: name.clone(),
                flavor_descriptor: flavor_descriptor.qualified_name(),
            });
        }
    }
    Ok(())
}

/// Explicit default names joined with `,`; otherwise `default` when the
/// chain is flavorable and the component's own flavor file defines it.
pub fn resolve_default_flavor(def: &Definition) -> Option<String> {
    if let Some(names) = &def.default_flavor {
        return Some(names.join(","));
    }
    let own_defines_default = def
        .flavor_file
        .as_ref()
        .is_some_and(|f| f.names.contains(IMPLICIT_FLAVOR));
    if def.flavorable_owner.is_some() && own_defines_default {
        return Some(IMPLICIT_FLAVOR.to_string());
    }
    None
}
