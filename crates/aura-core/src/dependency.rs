use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::descriptor::{DefDescriptor, ReferenceKind};
use crate::types::Definition;

/// Descriptors a definition names directly.
pub fn direct_references(def: &Definition) -> BTreeSet<DefDescriptor> {
    let mut refs = BTreeSet::new();
    refs.extend(def.extends_descriptor.iter().cloned());
    refs.extend(def.provider_descriptors.iter().cloned());
    refs.extend(def.controller_descriptors.iter().cloned());
    refs.extend(def.model_descriptors.iter().cloned());
    refs.extend(def.component_refs.iter().cloned());
    refs.extend(def.registered_events.values().cloned());
    refs.extend(def.flavor_file.iter().map(|f| f.descriptor.clone()));
    refs.extend(def.style_descriptor.iter().cloned());
    refs
}

/// Transitive dependency set of `def`.
///
/// `resolved` holds the already-built definitions `def` points at (parent
/// and body references). Their memoized dependency sets are followed
/// instead of rebuilding them; a descriptor already visited is not
/// expanded again, and `def` itself is never part of its own set.
pub fn collect(def: &Definition, resolved: &[&Definition]) -> BTreeSet<DefDescriptor> {
    let known: HashMap<&DefDescriptor, &Definition> =
        resolved.iter().map(|d| (&d.descriptor, *d)).collect();

    let mut result: BTreeSet<DefDescriptor> = BTreeSet::new();
    let mut queue: VecDeque<DefDescriptor> = direct_references(def).into_iter().collect();

    while let Some(next) = queue.pop_front() {
        if next == def.descriptor || !result.insert(next.clone()) {
            continue;
        }
        if let Some(dep) = known.get(&next) {
            queue.extend(
                dep.dependency_set
                    .iter()
                    .filter(|d| !result.contains(*d))
                    .cloned(),
            );
        }
    }

    result
}

/// Whether rendering needs the defining side.
///
/// An abstract definition with a native provider is locally dependent; the
/// flag then carries to every child and every component that nests it.
pub fn has_local_dependencies(
    def: &Definition,
    parent: Option<&Definition>,
    references: &[&Definition],
) -> bool {
    let own = def.is_abstract
        && def
            .own_provider_descriptors
            .iter()
            .any(|p| p.kind == ReferenceKind::Native);
    own || parent.is_some_and(|p| p.has_local_dependencies)
        || references.iter().any(|r| r.has_local_dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DefType;
    use pretty_assertions::assert_eq;

    fn cmp(name: &str) -> Definition {
        Definition::empty(DefDescriptor::markup("test", name, DefType::Component))
    }

    fn native_provider() -> DefDescriptor {
        DefDescriptor::parse("java://org.example.Provider", DefType::Provider).unwrap()
    }

    #[test]
    fn collects_through_memoized_sets() {
        let mut leaf = cmp("leaf");
        leaf.provider_descriptors.push(native_provider());
        leaf.dependency_set = direct_references(&leaf);

        let mut mid = cmp("mid");
        mid.component_refs.insert(leaf.descriptor.clone());
        mid.dependency_set = collect(&mid, &[&leaf]);

        let mut top = cmp("top");
        top.component_refs.insert(mid.descriptor.clone());
        let deps = collect(&top, &[&mid]);

        let expected: BTreeSet<DefDescriptor> = [
            mid.descriptor.clone(),
            leaf.descriptor.clone(),
            native_provider(),
        ]
        .into_iter()
        .collect();
        assert_eq!(deps, expected);
    }

    #[test]
    fn self_is_excluded_from_cycles() {
        let mut a = cmp("a");
        let mut b = cmp("b");
        b.dependency_set.insert(a.descriptor.clone());
        a.component_refs.insert(b.descriptor.clone());
        let deps = collect(&a, &[&b]);
        assert_eq!(deps.len(), 1);
        assert!(deps.contains(&b.descriptor));
    }

    #[test]
    fn flavor_and_events_are_dependencies() {
        let mut a = cmp("a");
        a.style_descriptor = Some(a.descriptor.style_descriptor());
        a.registered_events.insert(
            "press".into(),
            DefDescriptor::markup("test", "pressEvent", DefType::Event),
        );
        let deps = collect(&a, &[]);
        assert!(deps.contains(&a.descriptor.style_descriptor()));
        assert!(deps.contains(&DefDescriptor::markup("test", "pressEvent", DefType::Event)));
    }

    #[test]
    fn abstract_native_provider_is_local() {
        let mut a = cmp("a");
        a.is_abstract = true;
        a.own_provider_descriptors.push(native_provider());
        assert!(has_local_dependencies(&a, None, &[]));
    }

    #[test]
    fn concrete_native_provider_is_not_local() {
        let mut a = cmp("a");
        a.is_extensible = true;
        a.own_provider_descriptors.push(native_provider());
        assert!(!has_local_dependencies(&a, None, &[]));
    }

    #[test]
    fn flag_propagates_from_parent_and_references() {
        let mut parent = cmp("parent");
        parent.has_local_dependencies = true;
        let child = cmp("child");
        assert!(has_local_dependencies(&child, Some(&parent), &[]));
        assert!(has_local_dependencies(&child, None, &[&parent]));
        assert!(!has_local_dependencies(&child, None, &[]));
    }
}
