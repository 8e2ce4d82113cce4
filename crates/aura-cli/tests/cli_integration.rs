use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Get the workspace root (two levels up from CARGO_MANIFEST_DIR of aura-cli)
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent() // crates/
        .unwrap()
        .parent() // workspace root
        .unwrap()
        .to_path_buf()
}

fn aura_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_aura"));
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_samples(args: &[&str]) -> Output {
    aura_bin()
        .arg("--root")
        .arg("samples")
        .args(args)
        .output()
        .expect("failed to run")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn cli_help() {
    let output = aura_bin().arg("--help").output().expect("failed to run");
    assert_success(&output);
    assert!(stdout_of(&output).contains("Aura definition resolver"));
}

#[test]
fn cli_version() {
    let output = aura_bin().arg("--version").output().expect("failed to run");
    assert_success(&output);
    assert!(stdout_of(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_build_component() {
    let output = run_samples(&["build", "test:button"]);
    assert_success(&output);

    let def: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("invalid JSON output");
    assert_eq!(def["descriptor"]["name"], "button");
    assert_eq!(def["default_flavor_or_implicit"], "primary");
    assert_eq!(def["attribute_defs"]["label"]["required"], true);
    assert_eq!(def["registered_events"]["press"]["name"], "press");

    let controllers = def["controller_descriptors"].as_array().unwrap();
    assert_eq!(controllers.len(), 1);
    assert_eq!(controllers[0]["kind"], "scripted");
}

#[test]
fn cli_build_application() {
    let output = run_samples(&["build", "markup://test:shell"]);
    assert_success(&output);
    let def: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(def["descriptor"]["type"], "application");
    assert_eq!(def["extends_descriptor"]["name"], "application");
    assert_eq!(def["has_local_dependencies"], true);
}

#[test]
fn cli_build_missing_component() {
    let output = run_samples(&["build", "test:missing"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("No COMPONENT named markup://test:missing found"));
}

#[test]
fn cli_deps_json() {
    let output = run_samples(&["deps", "test:panel", "--format", "json"]);
    assert_success(&output);

    let report: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(report["descriptor"], "markup://test:panel");
    assert_eq!(report["has_local_dependencies"], true);
    assert_eq!(report["locally_renderable"], true);

    let deps: Vec<(String, String)> = report["dependencies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| {
            (
                d["descriptor"].as_str().unwrap().to_string(),
                d["type"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    for expected in [
        ("markup://aura:component", "component"),
        ("markup://test:base", "component"),
        ("markup://test:button", "component"),
        ("markup://test:press", "event"),
        ("java://org.example.provider.ConcreteProvider", "provider"),
        ("js://test.button", "controller"),
        ("css://test.button", "flavor"),
    ] {
        assert!(
            deps.contains(&(expected.0.to_string(), expected.1.to_string())),
            "missing {expected:?} in {deps:?}"
        );
    }
    assert!(!deps.iter().any(|(d, _)| d == "markup://test:panel"));
}

#[test]
fn cli_deps_human() {
    let output = run_samples(&["deps", "test:card"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("markup://test:card"));
    assert!(stdout.contains("css://test.card (style)"));
    assert!(stdout.contains("local dependencies: no; locally renderable: no"));
}

#[test]
fn cli_validate_samples() {
    let output = run_samples(&["validate"]);
    assert_success(&output);
    assert!(stdout_of(&output).contains("0 errors in 5 components."));
}

#[test]
fn cli_validate_json_format() {
    let output = run_samples(&["validate", "--format", "json"]);
    assert_success(&output);
    let result: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(result["summary"]["errors"], 0);
    assert_eq!(result["summary"]["components"], 5);
}

#[test]
fn cli_validate_with_errors() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "components/ui/good/good.cmp",
        "<aura:component/>",
    );
    write(
        dir.path(),
        "components/ui/typo/typo.cmp",
        "<aura:component defaultFlavor='primray'><div aura:flavorable='true'/></aura:component>",
    );
    write(dir.path(), "components/ui/typo/typoFlavors.css", ".THIS--primary{}");
    write(
        dir.path(),
        "components/ui/broken/broken.cmp",
        "<aura:component>\n  <div>\n</aura:component>",
    );

    let output = aura_bin()
        .arg("--root")
        .arg(dir.path())
        .args(["validate"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("error[flavor-name-not-found]"), "stdout: {stdout}");
    assert!(stdout.contains("components/ui/broken/broken.cmp:"), "stdout: {stdout}");
    assert!(stdout.contains("error[malformed-markup]"), "stdout: {stdout}");
    assert!(stdout.contains("2 errors in 3 components."), "stdout: {stdout}");
}

#[test]
fn cli_validate_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "components/ui/a/a.cmp",
        "<aura:component extensible='true' extends='ui:b'/>",
    );
    write(
        dir.path(),
        "components/ui/b/b.cmp",
        "<aura:component extensible='true' extends='ui:a'/>",
    );
    let output = aura_bin()
        .arg("--root")
        .arg(dir.path())
        .args(["validate", "--format", "json"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let result: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(result["summary"]["errors"], 2);
    for d in result["diagnostics"].as_array().unwrap() {
        assert_eq!(d["code"], "cyclic-extension");
    }
}

#[test]
fn cli_validate_empty_project() {
    let dir = tempfile::tempdir().unwrap();
    let output = aura_bin()
        .arg("--root")
        .arg(dir.path())
        .arg("validate")
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No components"));
}

#[test]
fn cli_analyze_mermaid() {
    let output = run_samples(&["analyze"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("graph LR"));
    assert!(stdout.contains("test_panel -.->|extends| test_base"));
    assert!(stdout.contains("test_panel -->|uses| test_button"));
    assert!(stdout.contains("test_shell -->|uses| test_panel"));
    assert!(stdout.contains("%% 5 nodes, 5 edges"));
}

#[test]
fn cli_analyze_dot() {
    let output = run_samples(&["analyze", "--format", "dot"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("digraph Aura {"));
    assert!(stdout.contains("\"test:card\" -> \"test:button\" [label=\"uses\", color=black];"));
}

#[test]
fn cli_analyze_skips_unreadable_component() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "components/ui/good/good.cmp",
        "<aura:component><ui:other/></aura:component>",
    );
    write(dir.path(), "components/ui/other/other.cmp", "<aura:component/>");
    let bad = dir.path().join("components/ui/bad/bad.cmp");
    fs::create_dir_all(bad.parent().unwrap()).unwrap();
    fs::write(&bad, [0x3c, 0xff, 0xfe, 0x3e]).unwrap();

    let output = aura_bin()
        .arg("--root")
        .arg(dir.path())
        .arg("analyze")
        .output()
        .expect("failed to run");
    assert_success(&output);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("ui_good -->|uses| ui_other"), "stdout: {stdout}");
    assert!(stdout.contains("%% 3 nodes, 1 edges"), "stdout: {stdout}");
}

#[test]
fn cli_nonexistent_root() {
    let output = aura_bin()
        .args(["--root", "nonexistent/path", "validate"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn cli_verbose_logs_builds() {
    let output = run_samples(&["-vv", "build", "test:card"]);
    assert_success(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("building definition"), "stderr: {stderr}");
}

#[test]
fn cli_quiet_is_silent() {
    let output = run_samples(&["-q", "build", "test:card"]);
    assert_success(&output);
    assert!(output.stderr.is_empty());
}
