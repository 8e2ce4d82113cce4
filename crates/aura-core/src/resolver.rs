//! Definition registry: caching, build coalescing and cycle detection.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

use crate::builder::{self, BuildContext, DefinitionResolver, EdgeKind};
use crate::catalogs;
use crate::descriptor::{DefDescriptor, DefType};
use crate::error::DefinitionError;
use crate::parser::parse_string;
use crate::source::{Source, SourceProvider};
use crate::types::{ComponentInstance, Definition, MarkupTree};
use crate::validator::{self, BalancedScriptValidator, ScriptValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    /// Rebuild cached definitions whose sources changed.
    pub check_freshness: bool,
    /// Run the script validator over attached script artifacts.
    pub validate_scripts: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            check_freshness: true,
            validate_scripts: true,
        }
    }
}

type BuildCell = Arc<OnceLock<Result<Arc<Definition>, DefinitionError>>>;

/// Descriptors currently being built on this call path, each with the edge
/// it was reached through.
#[derive(Debug, Clone, Default)]
struct ResolutionChain {
    links: Vec<(DefDescriptor, Option<EdgeKind>)>,
}

impl ResolutionChain {
    fn push(&self, descriptor: &DefDescriptor, via: Option<EdgeKind>) -> Self {
        let mut links = self.links.clone();
        links.push((descriptor.clone(), via));
        Self { links }
    }

    /// Error for following `edge` to `target`, if that closes a cycle. A
    /// cycle made only of extends edges is a cyclic extension; any other
    /// cycle is an invalid definition.
    fn cycle_error(&self, target: &DefDescriptor, edge: EdgeKind) -> Option<DefinitionError> {
        let start = self.links.iter().position(|(d, _)| d == target)?;
        let path = self.links[start..]
            .iter()
            .map(|(d, _)| d.qualified_name())
            .chain(std::iter::once(target.qualified_name()))
            .collect::<Vec<_>>()
            .join(" -> ");
        let only_extends = edge == EdgeKind::Extends
            && self.links[start + 1..]
                .iter()
                .all(|(_, via)| *via == Some(EdgeKind::Extends));
        Some(if only_extends {
            DefinitionError::CyclicExtension { chain: path }
        } else {
            DefinitionError::invalid(target, format!("cyclic component reference: {path}"))
        })
    }
}

/// Owns every built definition, keyed by descriptor.
///
/// At most one build per descriptor is in flight at any time; concurrent
/// requests for the same descriptor wait on that build and share its
/// result. Failures are handed to those waiters but never cached.
pub struct Registry {
    sources: Arc<dyn SourceProvider>,
    scripts: Arc<dyn ScriptValidator>,
    options: RegistryOptions,
    definitions: DashMap<DefDescriptor, Arc<Definition>>,
    in_flight: DashMap<DefDescriptor, BuildCell>,
    builds: AtomicUsize,
}

impl Registry {
    pub fn new(sources: Arc<dyn SourceProvider>) -> Self {
        Self::with_options(sources, RegistryOptions::default())
    }

    pub fn with_options(sources: Arc<dyn SourceProvider>, options: RegistryOptions) -> Self {
        let registry = Self {
            sources,
            scripts: Arc::new(BalancedScriptValidator),
            options,
            definitions: DashMap::new(),
            in_flight: DashMap::new(),
            builds: AtomicUsize::new(0),
        };
        registry.install_roots();
        registry
    }

    pub fn with_script_validator(mut self, scripts: Arc<dyn ScriptValidator>) -> Self {
        self.scripts = scripts;
        self
    }

    fn install_roots(&self) {
        for def_type in [DefType::Component, DefType::Application] {
            if let Some(root) = catalogs::root_descriptor(def_type) {
                let def = builder::root_definition(root.clone());
                self.definitions.insert(root, Arc::new(def));
            }
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn sources(&self) -> &dyn SourceProvider {
        self.sources.as_ref()
    }

    /// Number of build executions so far. Cache hits and coalesced waits
    /// do not count.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Number of cached definitions, built-in roots included.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolve a definition, building it (and anything it needs) on a miss.
    pub fn get_definition(
        &self,
        descriptor: &DefDescriptor,
    ) -> Result<Arc<Definition>, DefinitionError> {
        if let Some(def) = self.cached(descriptor) {
            trace!(descriptor = %descriptor, "cache hit");
            return Ok(def);
        }
        self.preflight(descriptor)?;
        self.resolve(descriptor, &ResolutionChain::default(), None)
    }

    /// Build `source` as the definition of `descriptor` without reading or
    /// writing the cache for `descriptor` itself. Its ancestors and
    /// references still go through the registry.
    pub fn compile(
        &self,
        descriptor: &DefDescriptor,
        source: &Source,
    ) -> Result<Definition, DefinitionError> {
        let tree = parse_string(&source.contents, &descriptor.qualified_name())?;
        let root_chain = ResolutionChain::default().push(descriptor, None);
        for (target, edge) in builder::graph_edges(descriptor, &tree) {
            if let Some(err) = root_chain.cycle_error(&target, edge) {
                return Err(err);
            }
            self.preflight(&target)?;
        }
        self.build_tree(descriptor, &tree, source.last_modified, &ResolutionChain::default())
    }

    /// Resolve and instantiate with caller-supplied attribute values.
    pub fn instantiate(
        &self,
        descriptor: &DefDescriptor,
        attributes: &BTreeMap<String, Value>,
    ) -> Result<ComponentInstance, DefinitionError> {
        let def = self.get_definition(descriptor)?;
        validator::instantiate(&def, attributes)
    }

    /// Evict `descriptor` and every cached definition built from it.
    /// Returns the number of evicted entries.
    pub fn invalidate(&self, descriptor: &DefDescriptor) -> usize {
        let before = self.definitions.len();
        self.definitions.retain(|key, def| {
            catalogs::is_root(key)
                || (key != descriptor && !def.source_stamps.contains_key(descriptor))
        });
        let evicted = before.saturating_sub(self.definitions.len());
        debug!(descriptor = %descriptor, evicted, "invalidated");
        evicted
    }

    /// Drop every cached definition except the built-in roots.
    pub fn clear(&self) {
        self.definitions.retain(|key, _| catalogs::is_root(key));
    }

    fn cached(&self, descriptor: &DefDescriptor) -> Option<Arc<Definition>> {
        let def = self
            .definitions
            .get(descriptor)
            .map(|entry| Arc::clone(entry.value()))?;
        if self.options.check_freshness && !self.is_fresh(&def) {
            debug!(descriptor = %descriptor, "source changed, evicting cached definition");
            self.definitions
                .remove_if(descriptor, |_, current| Arc::ptr_eq(current, &def));
            return None;
        }
        Some(def)
    }

    fn is_fresh(&self, def: &Definition) -> bool {
        def.source_stamps
            .iter()
            .all(|(d, stamp)| self.sources.last_modified(d) == *stamp)
    }

    /// Resolve through the per-descriptor in-flight cell.
    fn resolve(
        &self,
        descriptor: &DefDescriptor,
        chain: &ResolutionChain,
        via: Option<EdgeKind>,
    ) -> Result<Arc<Definition>, DefinitionError> {
        if !descriptor.def_type.is_markup() {
            return Err(DefinitionError::invalid(
                descriptor,
                "only component and application definitions are registered",
            ));
        }

        let cell: BuildCell = Arc::clone(
            self.in_flight
                .entry(descriptor.clone())
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .value(),
        );

        let mut ran = false;
        let result = cell
            .get_or_init(|| {
                ran = true;
                self.build_and_publish(descriptor, chain, via)
            })
            .clone();
        if !ran {
            debug!(descriptor = %descriptor, "joined in-flight build");
        }

        self.in_flight
            .remove_if(descriptor, |_, current| Arc::ptr_eq(current, &cell));
        result
    }

    fn build_and_publish(
        &self,
        descriptor: &DefDescriptor,
        chain: &ResolutionChain,
        via: Option<EdgeKind>,
    ) -> Result<Arc<Definition>, DefinitionError> {
        // Another caller may have published between our cache miss and
        // acquiring this cell.
        if let Some(def) = self.cached(descriptor) {
            return Ok(def);
        }
        let source = self.sources.get_source(descriptor)?;
        let tree = parse_string(&source.contents, &descriptor.qualified_name())?;
        let def = Arc::new(self.build_tree(
            descriptor,
            &tree,
            source.last_modified,
            &chain.push(descriptor, via),
        )?);
        self.definitions
            .insert(descriptor.clone(), Arc::clone(&def));
        Ok(def)
    }

    fn build_tree(
        &self,
        descriptor: &DefDescriptor,
        tree: &MarkupTree,
        stamp: u64,
        chain: &ResolutionChain,
    ) -> Result<Definition, DefinitionError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        debug!(descriptor = %descriptor, depth = chain.links.len(), "building definition");

        let chain = if chain.links.is_empty() {
            chain.push(descriptor, None)
        } else {
            chain.clone()
        };
        let resolver = ChainResolver {
            registry: self,
            chain,
        };
        let ctx = BuildContext {
            sources: self.sources.as_ref(),
            resolver: &resolver,
            scripts: self
                .options
                .validate_scripts
                .then_some(self.scripts.as_ref()),
        };

        let mut def = builder::build(descriptor, tree, &ctx).inspect_err(|err| {
            debug!(descriptor = %descriptor, kind = err.kind(), "build failed");
        })?;
        def.source_stamps.insert(descriptor.clone(), Some(stamp));
        Ok(def)
    }

    /// Reject cycles before any build starts, so no build ever waits on a
    /// cell its own call path holds. Walks sources with an explicit stack;
    /// cached definitions are already known to be acyclic and unreadable
    /// or malformed sources are left for the build to report.
    fn preflight(&self, start: &DefDescriptor) -> Result<(), DefinitionError> {
        struct Frame {
            descriptor: DefDescriptor,
            via: Option<EdgeKind>,
            edges: Vec<(DefDescriptor, EdgeKind)>,
            next: usize,
        }

        let mut done: HashSet<DefDescriptor> = HashSet::new();
        let mut stack = vec![Frame {
            descriptor: start.clone(),
            via: None,
            edges: self.edges_of(start),
            next: 0,
        }];

        while let Some(top) = stack.last_mut() {
            if top.next >= top.edges.len() {
                done.insert(top.descriptor.clone());
                stack.pop();
                continue;
            }
            let (target, edge) = top.edges[top.next].clone();
            top.next += 1;

            if done.contains(&target) {
                continue;
            }
            if stack.iter().any(|f| f.descriptor == target) {
                let chain = ResolutionChain {
                    links: stack
                        .iter()
                        .map(|f| (f.descriptor.clone(), f.via))
                        .collect(),
                };
                if let Some(err) = chain.cycle_error(&target, edge) {
                    debug!(descriptor = %start, "cycle rejected before build");
                    return Err(err);
                }
            }
            let edges = self.edges_of(&target);
            stack.push(Frame {
                descriptor: target,
                via: Some(edge),
                edges,
                next: 0,
            });
        }
        Ok(())
    }

    fn edges_of(&self, descriptor: &DefDescriptor) -> Vec<(DefDescriptor, EdgeKind)> {
        if self.cached(descriptor).is_some() {
            return Vec::new();
        }
        let Ok(source) = self.sources.get_source(descriptor) else {
            return Vec::new();
        };
        match parse_string(&source.contents, &descriptor.qualified_name()) {
            Ok(tree) => builder::graph_edges(descriptor, &tree),
            Err(_) => Vec::new(),
        }
    }
}

/// Resolver handed to the builder: follows edges through the registry
/// while tracking the current call path.
struct ChainResolver<'r> {
    registry: &'r Registry,
    chain: ResolutionChain,
}

impl ChainResolver<'_> {
    fn follow(
        &self,
        descriptor: &DefDescriptor,
        edge: EdgeKind,
    ) -> Result<Arc<Definition>, DefinitionError> {
        if let Some(err) = self.chain.cycle_error(descriptor, edge) {
            return Err(err);
        }
        if let Some(def) = self.registry.cached(descriptor) {
            trace!(descriptor = %descriptor, "cache hit");
            return Ok(def);
        }
        self.registry.resolve(descriptor, &self.chain, Some(edge))
    }
}

impl DefinitionResolver for ChainResolver<'_> {
    fn resolve_ancestor(
        &self,
        descriptor: &DefDescriptor,
    ) -> Result<Arc<Definition>, DefinitionError> {
        self.follow(descriptor, EdgeKind::Extends)
    }

    fn resolve_reference(
        &self,
        descriptor: &DefDescriptor,
    ) -> Result<Arc<Definition>, DefinitionError> {
        self.follow(descriptor, EdgeKind::Reference)
    }
}
