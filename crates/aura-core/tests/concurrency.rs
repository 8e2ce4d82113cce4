use aura_core::{
    DefDescriptor, DefType, DefinitionError, MemorySourceProvider, Registry, ScriptValidator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;

/// Validator that holds the build open long enough for every thread to
/// arrive while it is in flight.
struct SlowValidator {
    calls: AtomicUsize,
    fail: bool,
}

impl ScriptValidator for SlowValidator {
    fn validate(&self, _descriptor: &DefDescriptor, _contents: &str) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(200));
        if self.fail {
            Err("rejected".into())
        } else {
            Ok(())
        }
    }
}

fn setup(fail: bool) -> (Arc<Registry>, Arc<SlowValidator>, DefDescriptor) {
    let sources = Arc::new(MemorySourceProvider::new());
    let desc = sources.put(
        DefDescriptor::markup("test", "shared", DefType::Component),
        "<aura:component><aura:attribute name='x' type='String'/></aura:component>",
    );
    sources.put(
        desc.script_descriptor(DefType::Controller),
        "({ go: function(cmp) {} })",
    );
    let validator = Arc::new(SlowValidator {
        calls: AtomicUsize::new(0),
        fail,
    });
    let registry = Arc::new(Registry::new(sources).with_script_validator(validator.clone()));
    (registry, validator, desc)
}

fn resolve_concurrently(
    registry: &Arc<Registry>,
    desc: &DefDescriptor,
) -> Vec<Result<Arc<aura_core::Definition>, DefinitionError>> {
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(registry);
            let barrier = Arc::clone(&barrier);
            let desc = desc.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.get_definition(&desc)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn concurrent_requests_share_one_build() {
    let (registry, validator, desc) = setup(false);
    let results = resolve_concurrently(&registry, &desc);

    let defs: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(registry.build_count(), 1);
    assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    for def in &defs[1..] {
        assert!(Arc::ptr_eq(&defs[0], def));
    }
}

#[test]
fn concurrent_failure_is_shared_but_not_cached() {
    let (registry, _, desc) = setup(true);
    let results = resolve_concurrently(&registry, &desc);

    let errors: Vec<_> = results.into_iter().map(Result::unwrap_err).collect();
    assert_eq!(registry.build_count(), 1);
    assert!(errors[0].to_string().contains("JS Processing Error"));
    for err in &errors[1..] {
        assert_eq!(err, &errors[0]);
    }

    // The failure is not cached: the next request builds again.
    assert!(registry.get_definition(&desc).is_err());
    assert_eq!(registry.build_count(), 2);
}

#[test]
fn disjoint_descriptors_build_independently() {
    let sources = Arc::new(MemorySourceProvider::new());
    let descs: Vec<DefDescriptor> = (0..THREADS)
        .map(|i| {
            sources.put(
                DefDescriptor::markup("test", format!("c{i}"), DefType::Component),
                "<aura:component/>",
            )
        })
        .collect();
    let registry = Arc::new(Registry::new(sources));

    let handles: Vec<_> = descs
        .iter()
        .cloned()
        .map(|desc| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.get_definition(&desc).map(|d| d.descriptor.clone()))
        })
        .collect();
    for (handle, desc) in handles.into_iter().zip(&descs) {
        assert_eq!(&handle.join().unwrap().unwrap(), desc);
    }
    assert_eq!(registry.build_count(), THREADS);
}

#[test]
fn shared_parent_is_built_once_for_concurrent_children() {
    let sources = Arc::new(MemorySourceProvider::new());
    let parent = sources.put(
        DefDescriptor::markup("test", "base", DefType::Component),
        "<aura:component extensible='true'>{!v.body}</aura:component>",
    );
    let children: Vec<DefDescriptor> = (0..THREADS)
        .map(|i| {
            sources.put(
                DefDescriptor::markup("test", format!("child{i}"), DefType::Component),
                "<aura:component extends='test:base'/>",
            )
        })
        .collect();
    let registry = Arc::new(Registry::new(sources));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = children
        .into_iter()
        .map(|desc| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_definition(&desc).unwrap()
            })
        })
        .collect();
    for handle in handles {
        let child = handle.join().unwrap();
        assert_eq!(child.extends_descriptor.as_ref(), Some(&parent));
    }
    // Each child once and the shared parent once.
    assert_eq!(registry.build_count(), THREADS + 1);
    let before = registry.build_count();
    registry.get_definition(&parent).unwrap();
    assert_eq!(registry.build_count(), before);
}
