//! Source snapshots and the provider seam the registry reads them through.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::descriptor::{DefDescriptor, ReferenceKind};
use crate::error::SourceError;

/// Raw text of one descriptor plus the stamp it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub descriptor: DefDescriptor,
    pub contents: String,
    pub last_modified: u64,
}

impl Source {
    pub fn new(descriptor: DefDescriptor, contents: impl Into<String>, last_modified: u64) -> Self {
        Self {
            descriptor,
            contents: contents.into(),
            last_modified,
        }
    }
}

/// Supplies source text for descriptors.
///
/// Native descriptors have no text; a provider reports them as a source with
/// empty contents when the native class is known.
pub trait SourceProvider: Send + Sync {
    fn get_source(&self, descriptor: &DefDescriptor) -> Result<Source, SourceError>;

    fn exists(&self, descriptor: &DefDescriptor) -> bool {
        self.get_source(descriptor).is_ok()
    }

    /// Current stamp of a descriptor, or `None` when it no longer exists.
    fn last_modified(&self, descriptor: &DefDescriptor) -> Option<u64> {
        self.get_source(descriptor).ok().map(|s| s.last_modified)
    }
}

/// In-memory provider for tooling and tests.
///
/// Every `put` bumps a process-local clock, so replacing a source always
/// changes its stamp.
#[derive(Debug, Default)]
pub struct MemorySourceProvider {
    sources: DashMap<DefDescriptor, (String, u64)>,
    clock: AtomicU64,
}

impl MemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the source of `descriptor`.
    pub fn put(&self, descriptor: DefDescriptor, contents: impl Into<String>) -> DefDescriptor {
        let stamp = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        self.sources
            .insert(descriptor.clone(), (contents.into(), stamp));
        descriptor
    }

    /// Record a known native class (provider, controller or model).
    pub fn register_native(&self, descriptor: DefDescriptor) -> DefDescriptor {
        debug_assert_eq!(descriptor.kind, ReferenceKind::Native);
        self.put(descriptor, "")
    }

    pub fn remove(&self, descriptor: &DefDescriptor) -> bool {
        self.sources.remove(descriptor).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl SourceProvider for MemorySourceProvider {
    fn get_source(&self, descriptor: &DefDescriptor) -> Result<Source, SourceError> {
        self.sources
            .get(descriptor)
            .map(|entry| {
                let (contents, stamp) = entry.value();
                Source::new(descriptor.clone(), contents.clone(), *stamp)
            })
            .ok_or_else(|| SourceError::NotFound(descriptor.clone()))
    }

    fn exists(&self, descriptor: &DefDescriptor) -> bool {
        self.sources.contains_key(descriptor)
    }

    fn last_modified(&self, descriptor: &DefDescriptor) -> Option<u64> {
        self.sources.get(descriptor).map(|entry| entry.value().1)
    }
}
