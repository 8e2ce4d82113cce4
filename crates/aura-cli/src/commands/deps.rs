use anyhow::Context;

use aura_core::{DefType, Definition};

use crate::reader::Project;
use crate::ReportFormat;

pub fn run_deps(project: &Project, raw: &str, format: ReportFormat) -> anyhow::Result<String> {
    let descriptor = project.descriptor(raw)?;
    let def = project.registry.get_definition(&descriptor)?;
    match format {
        ReportFormat::Json => render_json(&def),
        ReportFormat::Human => Ok(render_human(&def)),
    }
}

fn type_label(def_type: DefType) -> &'static str {
    match def_type {
        DefType::Application => "application",
        DefType::Component => "component",
        DefType::Event => "event",
        DefType::Controller => "controller",
        DefType::Model => "model",
        DefType::Provider => "provider",
        DefType::Style => "style",
        DefType::Flavor => "flavor",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn render_human(def: &Definition) -> String {
    let mut lines = vec![def.descriptor.qualified_name()];
    for dep in def.dependency_set() {
        lines.push(format!(
            "  {} ({})",
            dep.qualified_name(),
            type_label(dep.def_type)
        ));
    }
    let count = def.dependency_set().len();
    let word = if count == 1 {
        "dependency"
    } else {
        "dependencies"
    };
    lines.push(format!(
        "{count} {word}; local dependencies: {}; locally renderable: {}",
        yes_no(def.has_local_dependencies()),
        yes_no(def.is_locally_renderable())
    ));
    lines.join("\n")
}

fn render_json(def: &Definition) -> anyhow::Result<String> {
    // Flavor and style share a qualified name, so each entry carries its type.
    let dependencies: Vec<_> = def
        .dependency_set()
        .iter()
        .map(|d| {
            serde_json::json!({
                "descriptor": d.qualified_name(),
                "type": type_label(d.def_type),
            })
        })
        .collect();
    let output = serde_json::json!({
        "descriptor": def.descriptor.qualified_name(),
        "dependencies": dependencies,
        "has_local_dependencies": def.has_local_dependencies(),
        "locally_renderable": def.is_locally_renderable(),
    });
    serde_json::to_string_pretty(&output).context("JSON serialization error")
}
