use std::collections::BTreeSet;

use tracing::warn;

use aura_core::{builder, parse_string, EdgeKind, SourceProvider};

use crate::reader::Project;
use crate::GraphFormat;

/// (source, target, edge) by `ns:name`.
type Edge = (String, String, EdgeKind);

/// Graph of explicit `extends` and component-reference edges between the
/// project's own components. Sources are parsed, not built, so a broken
/// component still shows up.
pub fn run_analyze(project: &Project, format: GraphFormat) -> anyhow::Result<String> {
    let components = project.sources.discover()?;

    let defined_names: BTreeSet<String> = components
        .iter()
        .map(|c| c.descriptor.descriptor_name())
        .collect();

    let mut edges: Vec<Edge> = Vec::new();
    for component in &components {
        let descriptor = &component.descriptor;
        let source = match project.sources.get_source(descriptor) {
            Ok(source) => source,
            Err(err) => {
                warn!(descriptor = %descriptor, error = %err, "skipping unreadable component");
                continue;
            }
        };
        let tree = match parse_string(&source.contents, &descriptor.qualified_name()) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(descriptor = %descriptor, error = %err, "skipping unparsable component");
                continue;
            }
        };
        for (target, kind) in builder::graph_edges(descriptor, &tree) {
            let target_name = target.descriptor_name();
            if defined_names.contains(&target_name) {
                edges.push((descriptor.descriptor_name(), target_name, kind));
            }
        }
    }

    edges.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    edges.dedup();

    match format {
        GraphFormat::Dot => Ok(render_dot(&defined_names, &edges)),
        GraphFormat::Mermaid => Ok(render_mermaid(&defined_names, &edges)),
    }
}

/// Mermaid node ids cannot contain `:`.
fn node_id(name: &str) -> String {
    name.replace([':', '-', '.'], "_")
}

fn label(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Extends => "extends",
        EdgeKind::Reference => "uses",
    }
}

fn render_mermaid(defined_names: &BTreeSet<String>, edges: &[Edge]) -> String {
    let mut lines = vec!["graph LR".to_string()];

    for name in defined_names {
        lines.push(format!("    {}[\"{name}\"]", node_id(name)));
    }
    for (src, tgt, kind) in edges {
        let arrow = match kind {
            EdgeKind::Extends => "-.->",
            EdgeKind::Reference => "-->",
        };
        lines.push(format!(
            "    {} {arrow}|{}| {}",
            node_id(src),
            label(*kind),
            node_id(tgt)
        ));
    }

    lines.push(format!(
        "%% {} nodes, {} edges",
        defined_names.len(),
        edges.len()
    ));
    lines.join("\n")
}

fn render_dot(defined_names: &BTreeSet<String>, edges: &[Edge]) -> String {
    let mut lines = vec![
        "digraph Aura {".to_string(),
        "    rankdir=LR;".to_string(),
        "    node [shape=box, style=filled, fillcolor=lightyellow];".to_string(),
    ];

    for name in defined_names {
        lines.push(format!("    \"{name}\";"));
    }
    for (src, tgt, kind) in edges {
        let style = match kind {
            EdgeKind::Extends => "style=dashed, color=blue",
            EdgeKind::Reference => "color=black",
        };
        lines.push(format!(
            "    \"{src}\" -> \"{tgt}\" [label=\"{}\", {style}];",
            label(*kind)
        ));
    }

    lines.push("}".to_string());
    lines.join("\n")
}
