//! Turns a parsed markup tree into a validated [`Definition`].
//!
//! Ancestors and referenced components are obtained through a
//! [`DefinitionResolver`], normally the registry, which recurses back into
//! this builder for descriptors that are not cached yet.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalogs::{self, FLAVORABLE_ATTRIBUTE, SYSTEM_NAMESPACE};
use crate::dependency;
use crate::descriptor::{DefDescriptor, DefType, ReferenceKind};
use crate::error::DefinitionError;
use crate::flavor;
use crate::source::SourceProvider;
use crate::types::*;
use crate::validator::ScriptValidator;

/// Edge of the definition graph a build follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Extends,
    Reference,
}

/// Supplies already-built definitions to the builder.
pub trait DefinitionResolver {
    fn resolve_ancestor(&self, descriptor: &DefDescriptor)
        -> Result<Arc<Definition>, DefinitionError>;

    fn resolve_reference(
        &self,
        descriptor: &DefDescriptor,
    ) -> Result<Arc<Definition>, DefinitionError>;
}

pub struct BuildContext<'a> {
    pub sources: &'a dyn SourceProvider,
    pub resolver: &'a dyn DefinitionResolver,
    /// `None` skips validation of attached scripts.
    pub scripts: Option<&'a dyn ScriptValidator>,
}

/// Built-in root every component (or application) implicitly extends.
pub fn root_definition(descriptor: DefDescriptor) -> Definition {
    let mut def = Definition::empty(descriptor.clone());
    def.is_extensible = true;
    def.attribute_defs.insert(
        "body".into(),
        AttributeDef {
            name: "body".into(),
            type_name: "Aura.Component[]".into(),
            required: false,
            default_value: None,
            description: Some("The body of the component".into()),
            declared_by: descriptor,
        },
    );
    def
}

/// Outgoing extends/reference edges of a tree, without validation. Used to
/// detect cycles before any build starts.
pub fn graph_edges(descriptor: &DefDescriptor, tree: &MarkupTree) -> Vec<(DefDescriptor, EdgeKind)> {
    let mut edges = Vec::new();
    if let Some(parent) = tree
        .root
        .literal("extends")
        .and_then(|raw| DefDescriptor::parse(raw, descriptor.def_type).ok())
    {
        edges.push((parent, EdgeKind::Extends));
    }
    let mut refs = BTreeSet::new();
    collect_reference_tags(&tree.root, &mut refs);
    edges.extend(refs.into_iter().map(|d| (d, EdgeKind::Reference)));
    edges
}

fn collect_reference_tags(element: &Element, out: &mut BTreeSet<DefDescriptor>) {
    for child in element.elements() {
        if is_component_tag(child) {
            if let Ok(d) = DefDescriptor::parse(&child.tag, DefType::Component) {
                out.insert(d);
            }
        }
        collect_reference_tags(child, out);
    }
}

/// A prefixed tag that the framework does not handle itself.
fn is_component_tag(element: &Element) -> bool {
    match &element.prefix {
        Some(prefix) => {
            !(prefix.eq_ignore_ascii_case(SYSTEM_NAMESPACE)
                && catalogs::is_system_tag(&element.local_name))
        }
        None => false,
    }
}

// --- Body scan ---

#[derive(Default)]
struct BodyScan {
    attributes: Vec<AttributeDef>,
    sets: Vec<(String, AttributeValue)>,
    events: Vec<(String, DefDescriptor)>,
    references: BTreeSet<DefDescriptor>,
    flavorable: bool,
}

/// Build the definition of `descriptor` from its parsed markup.
pub fn build(
    descriptor: &DefDescriptor,
    tree: &MarkupTree,
    ctx: &BuildContext,
) -> Result<Definition, DefinitionError> {
    let root = &tree.root;
    let expected = catalogs::root_tag(descriptor.def_type).ok_or_else(|| {
        DefinitionError::invalid(
            descriptor,
            format!("{} definitions are not built from markup", descriptor.def_type.label()),
        )
    })?;
    if !root.is_tag(expected) {
        return Err(DefinitionError::invalid(
            descriptor,
            format!("expected <{expected}> as the root tag, found <{}>", root.tag),
        ));
    }
    check_root_attributes(descriptor, root)?;

    let mut def = Definition::empty(descriptor.clone());
    def.is_abstract = flag(descriptor, root, "abstract")?;
    def.is_extensible = flag(descriptor, root, "extensible")?;
    def.dynamically_flavorable = flag(descriptor, root, "dynamicallyFlavorable")?;
    def.render_type = match root_literal(descriptor, root, "render")? {
        None => RenderType::Auto,
        Some(raw) => RenderType::parse(raw).ok_or_else(|| {
            DefinitionError::invalid(descriptor, format!("invalid render value '{raw}'"))
        })?,
    };

    // Extension chain
    let parent = resolve_parent(descriptor, root, ctx)?;
    if let Some(parent) = &parent {
        def.extends_descriptor = Some(parent.descriptor.clone());
        def.attribute_defs = parent.attribute_defs.clone();
        def.attribute_values = parent.attribute_values.clone();
        def.registered_events = parent.registered_events.clone();
        def.source_stamps.extend(
            parent
                .source_stamps
                .iter()
                .map(|(d, s)| (d.clone(), *s)),
        );
    }

    // Providers, controllers, models
    let own_providers = reference_list(&mut def, root, "provider", DefType::Provider, ctx)?;
    let attached_provider = attached_script(&mut def, DefType::Provider, ctx)?;
    def.own_provider_descriptors = own_providers.clone();
    def.provider_descriptors = merge_chain(
        own_providers,
        attached_provider,
        parent.as_ref().map(|p| p.provider_descriptors.as_slice()),
    );

    let own_controllers = reference_list(&mut def, root, "controller", DefType::Controller, ctx)?;
    let attached_controller = attached_script(&mut def, DefType::Controller, ctx)?;
    def.controller_descriptors = merge_chain(
        own_controllers,
        attached_controller,
        parent.as_ref().map(|p| p.controller_descriptors.as_slice()),
    );

    let own_models = reference_list(&mut def, root, "model", DefType::Model, ctx)?;
    def.model_descriptors = merge_chain(
        own_models,
        None,
        parent.as_ref().map(|p| p.model_descriptors.as_slice()),
    );

    // Body
    let mut scan = BodyScan::default();
    scan_body(descriptor, root, 0, false, &mut scan)?;

    for attr in scan.attributes {
        def.attribute_defs.insert(attr.name.clone(), attr);
    }
    for (name, value) in scan.sets {
        let Some(attr) = def.attribute_defs.get(&name) else {
            return Err(DefinitionError::invalid(
                descriptor,
                format!("cannot set unknown attribute '{name}'"),
            ));
        };
        if let AttributeValue::Literal(raw) = &value {
            check_boolean(descriptor, attr, raw)?;
        }
        def.attribute_values.insert(name, value);
    }
    for (name, event) in scan.events {
        def.registered_events.insert(name, event);
    }

    let mut references: Vec<Arc<Definition>> = Vec::new();
    for reference in &scan.references {
        let resolved = ctx.resolver.resolve_reference(reference)?;
        def.source_stamps.extend(
            resolved
                .source_stamps
                .iter()
                .map(|(d, s)| (d.clone(), *s)),
        );
        references.push(resolved);
    }
    def.component_refs = scan.references;

    // Flavors and style
    def.has_flavorable_child = scan.flavorable;
    def.flavorable_owner = if def.has_flavorable_child || def.dynamically_flavorable {
        Some(descriptor.clone())
    } else {
        parent.as_ref().and_then(|p| p.flavorable_owner.clone())
    };
    if let Some(raw) = root_literal(descriptor, root, "defaultFlavor")? {
        let names = flavor::parse_default_flavor(raw);
        if names.is_empty() {
            return Err(DefinitionError::invalid(
                descriptor,
                "defaultFlavor must name at least one flavor",
            ));
        }
        def.default_flavor = Some(names);
    }
    def.flavor_file = load_flavor_file(&mut def, ctx)?;
    def.inherited_flavor_file = parent
        .as_ref()
        .and_then(|p| p.flavor_file.clone().or_else(|| p.inherited_flavor_file.clone()));
    let style = descriptor.style_descriptor();
    let style_stamp = ctx.sources.last_modified(&style);
    def.source_stamps.insert(style.clone(), style_stamp);
    if style_stamp.is_some() {
        def.style_descriptor = Some(style);
    }

    // Post-build passes
    flavor::validate_flavorable(&def)?;
    def.default_flavor_or_implicit = flavor::resolve_default_flavor(&def);

    let reference_defs: Vec<&Definition> = references.iter().map(|r| r.as_ref()).collect();
    let mut resolved: Vec<&Definition> = reference_defs.clone();
    resolved.extend(parent.as_deref());
    def.dependency_set = dependency::collect(&def, &resolved);
    def.has_local_dependencies =
        dependency::has_local_dependencies(&def, parent.as_deref(), &reference_defs);

    Ok(def)
}

fn check_root_attributes(descriptor: &DefDescriptor, root: &Element) -> Result<(), DefinitionError> {
    for attr in &root.attributes {
        if attr.name.contains(':') || catalogs::is_root_attribute(&attr.name) {
            continue;
        }
        return Err(DefinitionError::invalid(
            descriptor,
            format!(
                "invalid attribute \"{}\" on <{}> at line {}",
                attr.name, root.tag, attr.line
            ),
        ));
    }
    Ok(())
}

fn root_literal<'e>(
    descriptor: &DefDescriptor,
    root: &'e Element,
    name: &str,
) -> Result<Option<&'e str>, DefinitionError> {
    match root.attribute(name) {
        None => Ok(None),
        Some(attr) => attr.value.as_literal().map(Some).ok_or_else(|| {
            DefinitionError::invalid(
                descriptor,
                format!("attribute '{name}' must be a literal, not an expression"),
            )
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn flag(descriptor: &DefDescriptor, root: &Element, name: &str) -> Result<bool, DefinitionError> {
    match root_literal(descriptor, root, name)? {
        None => Ok(false),
        Some(raw) => parse_bool(raw).ok_or_else(|| {
            DefinitionError::invalid(
                descriptor,
                format!("attribute '{name}' must be true or false, found '{raw}'"),
            )
        }),
    }
}

fn resolve_parent(
    descriptor: &DefDescriptor,
    root: &Element,
    ctx: &BuildContext,
) -> Result<Option<Arc<Definition>>, DefinitionError> {
    let parent_descriptor = match root_literal(descriptor, root, "extends")? {
        Some(raw) => {
            let parsed = DefDescriptor::parse(raw, descriptor.def_type)
                .map_err(|e| DefinitionError::invalid(descriptor, e.to_string()))?;
            if parsed.kind != ReferenceKind::Markup {
                return Err(DefinitionError::invalid(
                    descriptor,
                    format!("cannot extend {parsed}: only markup definitions can be extended"),
                ));
            }
            Some(parsed)
        }
        None if catalogs::is_root(descriptor) => None,
        None => catalogs::root_descriptor(descriptor.def_type),
    };
    let Some(parent_descriptor) = parent_descriptor else {
        return Ok(None);
    };

    let parent = ctx.resolver.resolve_ancestor(&parent_descriptor)?;
    if !(parent.is_extensible || parent.is_abstract) {
        return Err(DefinitionError::invalid(
            descriptor,
            format!("cannot extend non-extensible component {parent_descriptor}"),
        ));
    }
    Ok(Some(parent))
}

/// Parse a comma-separated list of artifact references and check each one
/// exists. Scripted entries are validated.
fn reference_list(
    def: &mut Definition,
    root: &Element,
    name: &str,
    def_type: DefType,
    ctx: &BuildContext,
) -> Result<Vec<DefDescriptor>, DefinitionError> {
    let Some(raw) = root_literal(&def.descriptor, root, name)? else {
        return Ok(Vec::new());
    };

    let mut out: Vec<DefDescriptor> = Vec::new();
    for entry in raw.split(',') {
        let reference = DefDescriptor::parse(entry, def_type)
            .map_err(|e| DefinitionError::invalid(&def.descriptor, e.to_string()))?;
        if reference.kind == ReferenceKind::Markup || reference.kind == ReferenceKind::Stylesheet {
            return Err(DefinitionError::invalid(
                &def.descriptor,
                format!("{reference} cannot be used as a {}", def_type.label().to_lowercase()),
            ));
        }
        let stamp = ctx
            .sources
            .last_modified(&reference)
            .ok_or_else(|| DefinitionError::not_found(&reference))?;
        if reference.kind == ReferenceKind::Scripted {
            validate_script(&def.descriptor, &reference, ctx)?;
        }
        def.source_stamps.insert(reference.clone(), Some(stamp));
        if !out.contains(&reference) {
            out.push(reference);
        }
    }
    Ok(out)
}

/// The `js://ns.name` artifact bundled with a component, if present.
fn attached_script(
    def: &mut Definition,
    def_type: DefType,
    ctx: &BuildContext,
) -> Result<Option<DefDescriptor>, DefinitionError> {
    let script = def.descriptor.script_descriptor(def_type);
    let stamp = ctx.sources.last_modified(&script);
    def.source_stamps.insert(script.clone(), stamp);
    if stamp.is_none() {
        return Ok(None);
    }
    validate_script(&def.descriptor, &script, ctx)?;
    Ok(Some(script))
}

fn validate_script(
    owner: &DefDescriptor,
    script: &DefDescriptor,
    ctx: &BuildContext,
) -> Result<(), DefinitionError> {
    let Some(validator) = ctx.scripts else {
        return Ok(());
    };
    let source = ctx.sources.get_source(script)?;
    validator
        .validate(script, &source.contents)
        .map_err(|reason| {
            DefinitionError::invalid(
                owner,
                format!("JS Processing Error: {owner} ({script}): {reason}"),
            )
        })
}

/// Own entries first, then the attached artifact, then inherited ones.
fn merge_chain(
    own: Vec<DefDescriptor>,
    attached: Option<DefDescriptor>,
    inherited: Option<&[DefDescriptor]>,
) -> Vec<DefDescriptor> {
    let mut out = own;
    for d in attached
        .into_iter()
        .chain(inherited.unwrap_or_default().iter().cloned())
    {
        if !out.contains(&d) {
            out.push(d);
        }
    }
    out
}

fn load_flavor_file(
    def: &mut Definition,
    ctx: &BuildContext,
) -> Result<Option<FlavorFile>, DefinitionError> {
    let descriptor = def.descriptor.flavor_descriptor();
    if !ctx.sources.exists(&descriptor) {
        def.source_stamps.insert(descriptor, None);
        return Ok(None);
    }
    let source = ctx.sources.get_source(&descriptor)?;
    def.source_stamps
        .insert(descriptor.clone(), Some(source.last_modified));
    Ok(Some(FlavorFile {
        names: flavor::flavor_names(&source.contents),
        descriptor,
    }))
}

/// Walk the body of `owner`. Inside a component reference, `aura:set`
/// targets the referenced component and is not collected.
fn scan_body(
    owner: &DefDescriptor,
    element: &Element,
    depth: usize,
    in_reference: bool,
    scan: &mut BodyScan,
) -> Result<(), DefinitionError> {
    for child in element.elements() {
        let mut child_in_reference = in_reference;
        if child
            .literal(FLAVORABLE_ATTRIBUTE)
            .and_then(parse_bool)
            .unwrap_or(false)
        {
            scan.flavorable = true;
        }

        if is_component_tag(child) {
            let reference = DefDescriptor::parse(&child.tag, DefType::Component).map_err(|_| {
                DefinitionError::invalid(
                    owner,
                    format!("invalid component tag <{}> at line {}", child.tag, child.line),
                )
            })?;
            scan.references.insert(reference);
            child_in_reference = true;
        } else if child.prefix.is_some() {
            match child.local_name.to_ascii_lowercase().as_str() {
                "attribute" => {
                    if depth > 0 {
                        return Err(DefinitionError::invalid(
                            owner,
                            format!(
                                "<{}> at line {} must be a direct child of the root tag",
                                child.tag, child.line
                            ),
                        ));
                    }
                    let attr = attribute_def(owner, child)?;
                    if scan.attributes.iter().any(|a| a.name == attr.name) {
                        return Err(DefinitionError::invalid(
                            owner,
                            format!("duplicate attribute definition '{}'", attr.name),
                        ));
                    }
                    scan.attributes.push(attr);
                }
                "set" if !in_reference => scan.sets.push(set_value(owner, child)?),
                "registerevent" => {
                    let (name, event) = registered_event(owner, child)?;
                    if scan.events.iter().any(|(n, _)| *n == name) {
                        return Err(DefinitionError::invalid(
                            owner,
                            format!("duplicate registered event '{name}'"),
                        ));
                    }
                    scan.events.push((name, event));
                }
                _ => {}
            }
        }

        scan_body(owner, child, depth + 1, child_in_reference, scan)?;
    }
    Ok(())
}

fn required_literal<'e>(
    owner: &DefDescriptor,
    element: &'e Element,
    name: &str,
) -> Result<&'e str, DefinitionError> {
    element
        .literal(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            DefinitionError::invalid(
                owner,
                format!("<{}> at line {} requires a '{name}' attribute", element.tag, element.line),
            )
        })
}

fn attribute_def(owner: &DefDescriptor, element: &Element) -> Result<AttributeDef, DefinitionError> {
    let name = required_literal(owner, element, "name")?;
    let type_name = required_literal(owner, element, "type")?;
    if !catalogs::is_attribute_type(type_name) {
        return Err(DefinitionError::invalid(
            owner,
            format!("attribute '{name}' has unknown type '{type_name}'"),
        ));
    }
    let required = match element.literal("required") {
        None => false,
        Some(raw) => parse_bool(raw).ok_or_else(|| {
            DefinitionError::invalid(
                owner,
                format!("attribute '{name}' has invalid required value '{raw}'"),
            )
        })?,
    };

    let attr = AttributeDef {
        name: name.to_string(),
        type_name: type_name.to_string(),
        required,
        default_value: element.attribute("default").map(|a| a.value.clone()),
        description: element.literal("description").map(str::to_string),
        declared_by: owner.clone(),
    };
    if let Some(AttributeValue::Literal(raw)) = &attr.default_value {
        check_boolean(owner, &attr, raw)?;
    }
    Ok(attr)
}

fn check_boolean(owner: &DefDescriptor, attr: &AttributeDef, raw: &str) -> Result<(), DefinitionError> {
    if attr.type_name.eq_ignore_ascii_case("boolean") && parse_bool(raw).is_none() {
        return Err(DefinitionError::invalid(
            owner,
            format!("attribute '{}' has invalid Boolean value '{raw}'", attr.name),
        ));
    }
    Ok(())
}

fn set_value(
    owner: &DefDescriptor,
    element: &Element,
) -> Result<(String, AttributeValue), DefinitionError> {
    let name = required_literal(owner, element, "attribute")?;
    let value = match element.attribute("value") {
        Some(attr) => attr.value.clone(),
        None => AttributeValue::parse(element.text().trim()),
    };
    Ok((name.to_string(), value))
}

fn registered_event(
    owner: &DefDescriptor,
    element: &Element,
) -> Result<(String, DefDescriptor), DefinitionError> {
    let name = required_literal(owner, element, "name")?;
    let type_name = required_literal(owner, element, "type")?;
    let event = DefDescriptor::parse(type_name, DefType::Event)
        .map_err(|e| DefinitionError::invalid(owner, e.to_string()))?;
    if event.kind != ReferenceKind::Markup {
        return Err(DefinitionError::invalid(
            owner,
            format!("event type {event} of '{name}' must be a markup event"),
        ));
    }
    Ok((name.to_string(), event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_string;
    use crate::source::MemorySourceProvider;
    use crate::validator::BalancedScriptValidator;
    use std::collections::HashMap;

    /// Resolver over a fixed set of prebuilt definitions.
    #[derive(Default)]
    struct Fixed(HashMap<DefDescriptor, Arc<Definition>>);

    impl Fixed {
        fn with_roots() -> Self {
            let mut fixed = Self::default();
            for t in [DefType::Component, DefType::Application] {
                let root = catalogs::root_descriptor(t).unwrap();
                fixed.0.insert(root.clone(), Arc::new(root_definition(root)));
            }
            fixed
        }

        fn add(&mut self, def: Definition) {
            self.0.insert(def.descriptor.clone(), Arc::new(def));
        }

        fn get(&self, d: &DefDescriptor) -> Result<Arc<Definition>, DefinitionError> {
            self.0
                .get(d)
                .cloned()
                .ok_or_else(|| DefinitionError::not_found(d))
        }
    }

    impl DefinitionResolver for Fixed {
        fn resolve_ancestor(&self, d: &DefDescriptor) -> Result<Arc<Definition>, DefinitionError> {
            self.get(d)
        }
        fn resolve_reference(&self, d: &DefDescriptor) -> Result<Arc<Definition>, DefinitionError> {
            self.get(d)
        }
    }

    fn cmp(name: &str) -> DefDescriptor {
        DefDescriptor::markup("test", name, DefType::Component)
    }

    fn build_with(
        resolver: &Fixed,
        sources: &MemorySourceProvider,
        desc: &DefDescriptor,
        markup: &str,
    ) -> Result<Definition, DefinitionError> {
        let tree = parse_string(markup, &desc.qualified_name())?;
        let ctx = BuildContext {
            sources,
            resolver,
            scripts: Some(&BalancedScriptValidator),
        };
        build(desc, &tree, &ctx)
    }

    fn build_one(markup: &str) -> Result<Definition, DefinitionError> {
        build_with(&Fixed::with_roots(), &MemorySourceProvider::new(), &cmp("a"), markup)
    }

    #[test]
    fn implicit_root_is_the_parent() {
        let def = build_one("<aura:component/>").unwrap();
        let root = catalogs::root_descriptor(DefType::Component).unwrap();
        assert_eq!(def.extends_descriptor, Some(root.clone()));
        assert!(def.dependency_set.contains(&root));
        assert!(def.attribute_defs.contains_key("body"));
    }

    #[test]
    fn wrong_root_tag_is_invalid() {
        let err = build_one("<aura:application/>").unwrap_err();
        assert!(err.to_string().contains("expected <aura:component>"));
    }

    #[test]
    fn unknown_root_attribute_is_invalid() {
        let err = build_one("<aura:component colour='red'/>").unwrap_err();
        assert!(err.to_string().contains("invalid attribute \"colour\""));
    }

    #[test]
    fn empty_provider_requires_qualified_name() {
        let err = build_one("<aura:component provider=''/>").unwrap_err();
        assert_eq!(err.kind(), "invalid-definition");
        assert!(err.to_string().contains("qualified name is required"));
    }

    #[test]
    fn unknown_provider_is_not_found() {
        let err = build_one("<aura:component provider='oops'/>").unwrap_err();
        assert_eq!(err.to_string(), "No PROVIDER named java://oops found");
    }

    #[test]
    fn attributes_merge_with_parent() {
        let mut resolver = Fixed::with_roots();
        let sources = MemorySourceProvider::new();
        let parent = build_with(
            &resolver,
            &sources,
            &cmp("parent"),
            "<aura:component extensible='true'>
                <aura:attribute name='label' type='String' default='parent'/>
                <aura:attribute name='size' type='Integer'/>
             </aura:component>",
        )
        .unwrap();
        resolver.add(parent);

        let child = build_with(
            &resolver,
            &sources,
            &cmp("child"),
            "<aura:component extends='test:parent'>
                <aura:attribute name='label' type='String' default='child'/>
                <aura:set attribute='size' value='3'/>
             </aura:component>",
        )
        .unwrap();
        assert_eq!(
            child.attribute_def("label").unwrap().default_value,
            Some(AttributeValue::Literal("child".into()))
        );
        assert_eq!(child.attribute_def("size").unwrap().declared_by, cmp("parent"));
        assert_eq!(
            child.attribute_values.get("size"),
            Some(&AttributeValue::Literal("3".into()))
        );
    }

    #[test]
    fn non_extensible_parent_is_rejected() {
        let mut resolver = Fixed::with_roots();
        let sources = MemorySourceProvider::new();
        let parent = build_with(&resolver, &sources, &cmp("parent"), "<aura:component/>").unwrap();
        resolver.add(parent);
        let err = build_with(
            &resolver,
            &sources,
            &cmp("child"),
            "<aura:component extends='test:parent'/>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-extensible"));
    }

    #[test]
    fn setting_unknown_attribute_is_invalid() {
        let err =
            build_one("<aura:component><aura:set attribute='nope' value='x'/></aura:component>")
                .unwrap_err();
        assert!(err.to_string().contains("cannot set unknown attribute 'nope'"));
    }

    #[test]
    fn attribute_rules_are_enforced() {
        let dup = build_one(
            "<aura:component>
                <aura:attribute name='x' type='String'/>
                <aura:attribute name='x' type='String'/>
             </aura:component>",
        )
        .unwrap_err();
        assert!(dup.to_string().contains("duplicate attribute definition"));

        let bad_type =
            build_one("<aura:component><aura:attribute name='x' type='Banana'/></aura:component>")
                .unwrap_err();
        assert!(bad_type.to_string().contains("unknown type 'Banana'"));

        let bad_bool = build_one(
            "<aura:component><aura:attribute name='x' type='Boolean' default='yes'/></aura:component>",
        )
        .unwrap_err();
        assert!(bad_bool.to_string().contains("invalid Boolean value"));

        let nested = build_one(
            "<aura:component><div><aura:attribute name='x' type='String'/></div></aura:component>",
        )
        .unwrap_err();
        assert!(nested.to_string().contains("direct child"));
    }

    #[test]
    fn registered_events_are_dependencies() {
        let def = build_one(
            "<aura:component><aura:registerEvent name='press' type='ui:press'/></aura:component>",
        )
        .unwrap();
        let event = DefDescriptor::markup("ui", "press", DefType::Event);
        assert_eq!(def.registered_events.get("press"), Some(&event));
        assert!(def.dependency_set.contains(&event));
    }

    #[test]
    fn missing_reference_is_not_found() {
        let err = build_one("<aura:component><ui:missing/></aura:component>").unwrap_err();
        assert_eq!(err.to_string(), "No COMPONENT named markup://ui:missing found");
    }

    #[test]
    fn set_inside_reference_targets_the_reference() {
        let mut resolver = Fixed::with_roots();
        let sources = MemorySourceProvider::new();
        let button = build_with(
            &resolver,
            &sources,
            &cmp("button"),
            "<aura:component><aura:attribute name='label' type='String'/></aura:component>",
        )
        .unwrap();
        resolver.add(button);

        let def = build_with(
            &resolver,
            &sources,
            &cmp("a"),
            "<aura:component>
                <test:button><aura:set attribute='label'>Go</aura:set></test:button>
             </aura:component>",
        )
        .unwrap();
        assert!(def.attribute_values.is_empty());
        assert!(def.component_refs.contains(&cmp("button")));
    }

    #[test]
    fn system_tags_are_not_references() {
        let def = build_one(
            "<aura:component><aura:if isTrue='{!v.x}'><aura:text value='x'/></aura:if></aura:component>",
        )
        .unwrap();
        assert!(def.component_refs.is_empty());
    }

    #[test]
    fn attached_controller_is_validated() {
        let sources = MemorySourceProvider::new();
        sources.put(
            cmp("a").script_descriptor(DefType::Controller),
            "({ function1: function(cmp) {var a = {k:}} })",
        );
        let err = build_with(&Fixed::with_roots(), &sources, &cmp("a"), "<aura:component/>")
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("JS Processing Error: markup://test:a"));
    }

    #[test]
    fn attached_artifacts_are_recorded() {
        let sources = MemorySourceProvider::new();
        let controller = sources.put(
            cmp("a").script_descriptor(DefType::Controller),
            "({ go: function(cmp) {} })",
        );
        sources.put(cmp("a").style_descriptor(), ".THIS { color: red; }");
        let def = build_with(&Fixed::with_roots(), &sources, &cmp("a"), "<aura:component/>")
            .unwrap();
        assert_eq!(def.controller_def_descriptor(), Some(&controller));
        assert_eq!(def.style_descriptor, Some(cmp("a").style_descriptor()));
        assert!(def.source_stamps.contains_key(&controller));
    }

    #[test]
    fn invalid_render_is_rejected() {
        let err = build_one("<aura:component render='sometimes'/>").unwrap_err();
        assert!(err.to_string().contains("invalid render value"));
        let def = build_one("<aura:component render='CLIENT'/>").unwrap();
        assert!(!def.is_locally_renderable());
    }

    #[test]
    fn graph_edges_include_extends_and_tags() {
        let tree = parse_string(
            "<aura:component extends='test:p'><div><ui:button/></div><aura:if/></aura:component>",
            "t",
        )
        .unwrap();
        let edges = graph_edges(&cmp("a"), &tree);
        assert_eq!(
            edges,
            vec![
                (cmp("p"), EdgeKind::Extends),
                (DefDescriptor::markup("ui", "button", DefType::Component), EdgeKind::Reference),
            ]
        );
    }
}
