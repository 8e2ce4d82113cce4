use anyhow::Context;

use crate::reader::Project;

pub fn run_build(project: &Project, raw: &str) -> anyhow::Result<String> {
    let descriptor = project.descriptor(raw)?;
    let def = project.registry.get_definition(&descriptor)?;
    serde_json::to_string_pretty(def.as_ref()).context("JSON serialization error")
}
