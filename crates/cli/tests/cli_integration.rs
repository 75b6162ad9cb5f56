//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `livecode` binary and verify
//! exit codes, stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to conformance fixtures resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `livecode` binary, rooted at workspace.
fn livecode() -> Command {
    let mut cmd = cargo_bin_cmd!("livecode");
    cmd.current_dir(workspace_root());
    cmd.env_remove("LIVECODE_GENERATOR_URL");
    cmd.env_remove("LIVECODE_API_KEY");
    cmd.env_remove("LIVECODE_PORT");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    livecode()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Live preview for generated UI components",
        ));
}

#[test]
fn version_exits_0() {
    livecode()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("livecode"));
}

#[test]
fn unknown_subcommand_fails() {
    livecode().arg("frobnicate").assert().failure();
}

// ──────────────────────────────────────────────
// 2. normalize
// ──────────────────────────────────────────────

#[test]
fn normalize_strips_fences_and_appends_harness() {
    let dir = TempDir::new().unwrap();
    let raw = write(
        &dir,
        "raw.txt",
        "```javascript\nconst CodeComponent = () => <div>Hi</div>;\n```",
    );
    livecode()
        .arg("normalize")
        .arg(&raw)
        .assert()
        .success()
        .stdout(predicate::str::contains("```").not())
        .stdout(predicate::str::contains("<React.StrictMode>"))
        .stdout(predicate::str::contains("<CodeComponent />"));
}

#[test]
fn normalize_json_output() {
    let dir = TempDir::new().unwrap();
    let raw = write(&dir, "raw.txt", "```jsx\nconst CodeComponent = () => null;\n```");
    let output = livecode()
        .args(["--output", "json", "normalize"])
        .arg(&raw)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let source = json["source"].as_str().unwrap();
    assert!(source.trim_start().starts_with("const CodeComponent = () => null;"));
    assert!(!source.contains("```"));
}

#[test]
fn normalize_missing_file_exits_1() {
    livecode()
        .args(["normalize", "does/not/exist.txt"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

// ──────────────────────────────────────────────
// 3. eval
// ──────────────────────────────────────────────

#[test]
fn eval_success_fixture() {
    livecode()
        .args(["eval", "conformance/eval/counter_card.jsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("success"))
        .stdout(predicate::str::contains("Count: 3"));
}

#[test]
fn eval_runtime_error_exits_1_with_excerpt() {
    livecode()
        .args(["eval", "conformance/eval/throw_in_render.jsx"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("runtime error: Error: no data to show"))
        .stderr(predicate::str::contains("4 | "))
        .stderr(predicate::str::contains("^"));
}

#[test]
fn eval_compile_error_json_on_stderr() {
    let output = livecode()
        .args([
            "--output",
            "json",
            "--quiet",
            "eval",
            "conformance/eval/unknown_identifier.jsx",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["outcome"], "compile_error");
    assert_eq!(json["detail"]["line"], 1);
}

#[test]
fn eval_raw_normalizes_first() {
    let dir = TempDir::new().unwrap();
    let raw = write(
        &dir,
        "gen.txt",
        "```jsx\nconst CodeComponent = () => <p>Generated</p>;\n```",
    );
    livecode()
        .args(["eval", "--raw"])
        .arg(&raw)
        .assert()
        .success()
        .stdout(predicate::str::contains("text: Generated"));

    // Without --raw the fences are a syntax error.
    livecode()
        .arg("eval")
        .arg(&raw)
        .assert()
        .failure()
        .stderr(predicate::str::contains("compile error"));
}

#[test]
fn eval_quiet_suppresses_output() {
    livecode()
        .args(["--quiet", "eval", "conformance/eval/throw_in_render.jsx"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

#[test]
fn eval_respects_configured_step_budget() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "livecode.toml", "[sandbox]\nmax_steps = 50\n");
    let source = write(
        &dir,
        "loop.jsx",
        "const CodeComponent = () => {\n  let n = 0;\n  while (true) { n += 1; }\n  return <p>{n}</p>;\n};\n\nrender(<CodeComponent />);\n",
    );
    livecode()
        .arg("--config")
        .arg(&config)
        .arg("eval")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("runtime error"));
}

#[test]
fn bad_config_file_exits_1() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "livecode.toml", "[sandbox]\nmax_steps = \"lots\"\n");
    livecode()
        .arg("--config")
        .arg(&config)
        .arg("scope")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not parse"));
}

// ──────────────────────────────────────────────
// 4. render
// ──────────────────────────────────────────────

#[test]
fn render_writes_preview_document() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("preview.html");
    livecode()
        .args(["render", "conformance/eval/pricing_table.jsx", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));
    let html = fs::read_to_string(&out).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Content-Security-Policy"));
}

#[test]
fn render_to_stdout_mounts_icons_as_svg() {
    livecode()
        .args(["render", "conformance/compile/positive/upload_card.jsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<svg"))
        .stdout(predicate::str::contains("lucide-upload"))
        .stdout(predicate::str::contains("for=\"image-upload\""));
}

#[test]
fn render_of_failing_source_exits_1() {
    livecode()
        .args(["render", "conformance/eval/tdz_access.jsx"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn render_mount_error_exits_1() {
    let dir = TempDir::new().unwrap();
    let source = write(
        &dir,
        "script.jsx",
        "const CodeComponent = () => <script>alert(1)</script>;\n\nrender(<CodeComponent />);\n",
    );
    livecode()
        .arg("render")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mount error"));
}

// ──────────────────────────────────────────────
// 5. scope
// ──────────────────────────────────────────────

#[test]
fn scope_lists_bindings_and_modules() {
    livecode()
        .arg("scope")
        .assert()
        .success()
        .stdout(predicate::str::contains("React"))
        .stdout(predicate::str::contains("Upload"))
        .stdout(predicate::str::contains("lucide-react"));
}

#[test]
fn scope_json() {
    let output = livecode().args(["--output", "json", "scope"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let bindings = json["bindings"].as_array().unwrap();
    assert!(bindings.iter().any(|b| b["name"] == "Card"));
    let modules = json["modules"].as_array().unwrap();
    assert!(modules.iter().any(|m| m == "react"));
}

// ──────────────────────────────────────────────
// 6. generate
// ──────────────────────────────────────────────

#[test]
fn generate_with_unreachable_generator_exits_1() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("design.png");
    fs::write(&image, b"\x89PNG\r\n\x1a\n0000").unwrap();
    livecode()
        .arg("generate")
        .arg(&image)
        .args(["--generator-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("generation failed"));
}

#[test]
fn generate_with_missing_image_exits_1() {
    livecode()
        .args(["generate", "no/such/image.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read image"));
}
