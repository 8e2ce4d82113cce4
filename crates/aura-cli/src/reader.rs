use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::{debug, warn};

use aura_core::{
    DefDescriptor, DefType, ReferenceKind, Registry, RegistryOptions, Source, SourceError,
    SourceProvider,
};

pub const CONFIG_FILE: &str = "aura.config.yaml";

/// Project configuration from aura.config.yaml.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuraConfig {
    pub name: Option<String>,
    /// Component roots, relative to the project directory.
    pub components: Vec<String>,
    /// Qualified names of known native classes.
    pub native: Vec<String>,
    pub registry: RegistryOptions,
}

impl Default for AuraConfig {
    fn default() -> Self {
        Self {
            name: None,
            components: vec!["components".into()],
            native: Vec::new(),
            registry: RegistryOptions::default(),
        }
    }
}

/// Read the project config, falling back to defaults when the file is absent.
pub fn read_project_config(dir_path: &Path) -> anyhow::Result<AuraConfig> {
    let config_path = dir_path.join(CONFIG_FILE);
    if !config_path.exists() {
        debug!(path = %config_path.display(), "no project config, using defaults");
        return Ok(AuraConfig::default());
    }
    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid YAML config: {}", config_path.display()))
}

/// A component bundle found on disk.
#[derive(Debug, Clone)]
pub struct DiscoveredComponent {
    pub descriptor: DefDescriptor,
    pub path: PathBuf,
}

/// Reads component bundles laid out as `<root>/<ns>/<name>/<name>.<ext>`.
#[derive(Debug)]
pub struct FileSourceProvider {
    roots: Vec<PathBuf>,
    natives: HashSet<DefDescriptor>,
}

impl FileSourceProvider {
    pub fn new(roots: Vec<PathBuf>, natives: impl IntoIterator<Item = DefDescriptor>) -> Self {
        Self {
            roots,
            natives: natives.into_iter().collect(),
        }
    }

    /// File name of a descriptor inside its bundle directory.
    fn file_name(descriptor: &DefDescriptor) -> Option<String> {
        let name = &descriptor.name;
        let file = match (descriptor.kind, descriptor.def_type) {
            (ReferenceKind::Markup, DefType::Component) => format!("{name}.cmp"),
            (ReferenceKind::Markup, DefType::Application) => format!("{name}.app"),
            (ReferenceKind::Markup, DefType::Event) => format!("{name}.evt"),
            (ReferenceKind::Scripted, DefType::Controller) => format!("{name}Controller.js"),
            (ReferenceKind::Scripted, DefType::Provider) => format!("{name}Provider.js"),
            (ReferenceKind::Stylesheet, DefType::Style) => format!("{name}.css"),
            (ReferenceKind::Stylesheet, DefType::Flavor) => format!("{name}Flavors.css"),
            _ => return None,
        };
        Some(file)
    }

    /// First existing path for a descriptor across the component roots.
    pub fn path_of(&self, descriptor: &DefDescriptor) -> Option<PathBuf> {
        let file = Self::file_name(descriptor)?;
        self.roots
            .iter()
            .map(|root| {
                root.join(&descriptor.namespace)
                    .join(&descriptor.name)
                    .join(&file)
            })
            .find(|path| path.is_file())
    }

    /// Every `.cmp` and `.app` bundle under the component roots, sorted by path.
    pub fn discover(&self) -> anyhow::Result<Vec<DiscoveredComponent>> {
        let mut found: Vec<DiscoveredComponent> = Vec::new();
        let mut seen: HashSet<DefDescriptor> = HashSet::new();

        for root in &self.roots {
            for (ext, def_type) in [("cmp", DefType::Component), ("app", DefType::Application)] {
                let pattern = root.join(format!("*/*/*.{ext}"));
                let pattern_str = pattern.to_string_lossy().replace('\\', "/");
                let entries = glob::glob(&pattern_str)
                    .with_context(|| format!("Invalid glob pattern: {pattern_str}"))?;

                for entry in entries {
                    let path = entry.context("Glob error")?;
                    let Some(descriptor) = bundle_descriptor(&path, def_type) else {
                        warn!(path = %path.display(), "file name does not match its bundle, skipped");
                        continue;
                    };
                    // Earlier roots shadow later ones.
                    if seen.insert(descriptor.clone()) {
                        found.push(DiscoveredComponent { descriptor, path });
                    }
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }
}

/// `<ns>/<name>/<name>.<ext>` → `markup://ns:name`.
fn bundle_descriptor(path: &Path, def_type: DefType) -> Option<DefDescriptor> {
    let stem = path.file_stem()?.to_str()?;
    let bundle = path.parent()?;
    let namespace = bundle.parent()?.file_name()?.to_str()?;
    if bundle.file_name()?.to_str()? != stem {
        return None;
    }
    DefDescriptor::parse(&format!("{namespace}:{stem}"), def_type).ok()
}

fn stamp_of(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let since = modified.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(since.as_nanos()).ok()
}

impl SourceProvider for FileSourceProvider {
    fn get_source(&self, descriptor: &DefDescriptor) -> Result<Source, SourceError> {
        if descriptor.kind == ReferenceKind::Native {
            return if self.natives.contains(descriptor) {
                Ok(Source::new(descriptor.clone(), "", 0))
            } else {
                Err(SourceError::NotFound(descriptor.clone()))
            };
        }

        let path = self
            .path_of(descriptor)
            .ok_or_else(|| SourceError::NotFound(descriptor.clone()))?;
        let unreadable = |reason: String| SourceError::Unreadable {
            descriptor: descriptor.clone(),
            reason,
        };
        let stamp = stamp_of(&path)
            .ok_or_else(|| unreadable(format!("no modification time for {}", path.display())))?;
        let contents = fs::read_to_string(&path).map_err(|e| unreadable(e.to_string()))?;
        Ok(Source::new(descriptor.clone(), contents, stamp))
    }

    fn exists(&self, descriptor: &DefDescriptor) -> bool {
        match descriptor.kind {
            ReferenceKind::Native => self.natives.contains(descriptor),
            _ => self.path_of(descriptor).is_some(),
        }
    }

    fn last_modified(&self, descriptor: &DefDescriptor) -> Option<u64> {
        match descriptor.kind {
            ReferenceKind::Native => self.natives.contains(descriptor).then_some(0),
            _ => self.path_of(descriptor).and_then(|p| stamp_of(&p)),
        }
    }
}

/// An opened project: config, file-backed sources and a registry over them.
pub struct Project {
    pub dir: PathBuf,
    pub config: AuraConfig,
    pub sources: Arc<FileSourceProvider>,
    pub registry: Registry,
}

impl Project {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        if !dir.is_dir() {
            bail!("Project directory does not exist: {}", dir.display());
        }
        let config = read_project_config(dir)?;

        let mut natives = Vec::with_capacity(config.native.len());
        for raw in &config.native {
            let desc = DefDescriptor::parse(raw, DefType::Provider)
                .with_context(|| format!("Invalid native class '{raw}' in {CONFIG_FILE}"))?;
            if desc.kind != ReferenceKind::Native {
                bail!("'{raw}' in {CONFIG_FILE} is not a native class");
            }
            natives.push(desc);
        }
        // A native class may serve as provider, controller or model.
        let natives = natives.into_iter().flat_map(|d| {
            [DefType::Provider, DefType::Controller, DefType::Model]
                .map(|t| DefDescriptor::new(d.kind, d.namespace.clone(), d.name.clone(), t))
        });

        let roots = config.components.iter().map(|c| dir.join(c)).collect();
        let sources = Arc::new(FileSourceProvider::new(roots, natives));
        let registry = Registry::with_options(sources.clone(), config.registry);
        debug!(
            project = config.name.as_deref().unwrap_or("<unnamed>"),
            dir = %dir.display(),
            "opened project"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            sources,
            registry,
        })
    }

    /// Resolve a command-line name (`ns:name` or `markup://ns:name`) to a
    /// component or application descriptor.
    pub fn descriptor(&self, raw: &str) -> anyhow::Result<DefDescriptor> {
        let component = DefDescriptor::parse(raw, DefType::Component)
            .with_context(|| format!("Invalid descriptor '{raw}'"))?;
        if component.kind != ReferenceKind::Markup {
            bail!("'{raw}' is not a markup descriptor");
        }
        let application = DefDescriptor::markup(
            component.namespace.clone(),
            component.name.clone(),
            DefType::Application,
        );
        if !self.sources.exists(&component) && self.sources.exists(&application) {
            return Ok(application);
        }
        Ok(component)
    }
}
