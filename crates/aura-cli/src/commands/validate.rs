use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use aura_core::DefinitionError;

use crate::reader::Project;
use crate::ReportFormat;

#[derive(Debug, Serialize)]
struct Diagnostic {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<usize>,
    descriptor: String,
    code: &'static str,
    message: String,
}

fn position(err: &DefinitionError) -> Option<(usize, usize)> {
    match err {
        DefinitionError::MalformedMarkup { line, col, .. }
        | DefinitionError::InvalidMarkup { line, col, .. } => Some((*line, *col)),
        _ => None,
    }
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Build every discovered component and application. Returns the report and
/// the number of definitions that failed.
pub fn run_validate(project: &Project, format: ReportFormat) -> anyhow::Result<(String, usize)> {
    let components = project.sources.discover()?;
    if components.is_empty() {
        anyhow::bail!(
            "No components (.cmp, .app) found under: {}",
            project.dir.display()
        );
    }

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for component in &components {
        if let Err(err) = project.registry.get_definition(&component.descriptor) {
            let (line, col) = match position(&err) {
                Some((line, col)) => (Some(line), Some(col)),
                None => (None, None),
            };
            diagnostics.push(Diagnostic {
                file: relative(&component.path, &project.dir),
                line,
                col,
                descriptor: component.descriptor.qualified_name(),
                code: err.kind(),
                message: err.to_string(),
            });
        }
    }

    let error_count = diagnostics.len();
    let component_count = components.len();
    info!(components = component_count, errors = error_count, "validated project");

    if format == ReportFormat::Json {
        let output = serde_json::json!({
            "diagnostics": diagnostics,
            "summary": {
                "errors": error_count,
                "components": component_count,
            }
        });
        let json = serde_json::to_string_pretty(&output).context("JSON serialization error")?;
        return Ok((json, error_count));
    }

    let mut lines: Vec<String> = diagnostics
        .iter()
        .map(|d| match (d.line, d.col) {
            (Some(line), Some(col)) => {
                format!("{}:{line}:{col} error[{}]: {}", d.file, d.code, d.message)
            }
            _ => format!("{} error[{}]: {}", d.file, d.code, d.message),
        })
        .collect();

    let error_word = if error_count == 1 { "error" } else { "errors" };
    let component_word = if component_count == 1 {
        "component"
    } else {
        "components"
    };
    lines.push(format!(
        "{error_count} {error_word} in {component_count} {component_word}."
    ));

    Ok((lines.join("\n"), error_count))
}
