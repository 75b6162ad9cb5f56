//! Evaluation conformance suite.
//!
//! Each case is a fixture pair under `conformance/eval`:
//! - `<name>.jsx`            -- canonical component source
//! - `<name>.expected.json`  -- expected outcome, plus the rendered text for
//!   successes or the diagnostic message (and optionally line) for failures
//!
//! Every fixture is evaluated against the standard scope; mismatches are
//! collected and reported together.

use livecode_eval::{build_scope, evaluate, EvaluationResult};
use std::path::{Path, PathBuf};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../conformance/eval")
}

/// Evaluate one fixture and describe any mismatch.
fn run_fixture(source_path: &Path) -> Option<String> {
    let name = source_path.file_stem()?.to_string_lossy().to_string();
    let source = std::fs::read_to_string(source_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", name, e));
    let expected_path = source_path.with_extension("expected.json");
    let expected: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expectation for {}: {}", name, e)),
    )
    .unwrap_or_else(|e| panic!("Invalid expectation JSON for {}: {}", name, e));

    let result = evaluate(&source, &build_scope());
    if result.outcome() != expected["outcome"] {
        return Some(format!(
            "{}: expected outcome {}, got {:?}",
            name, expected["outcome"], result
        ));
    }
    match &result {
        EvaluationResult::Success(tree) => {
            if let Some(text) = expected["text"].as_str() {
                if tree.text_content() != text {
                    return Some(format!(
                        "{}: expected text {:?}, got {:?}",
                        name,
                        text,
                        tree.text_content()
                    ));
                }
            }
        }
        EvaluationResult::CompileError(d) | EvaluationResult::RuntimeError(d) => {
            if let Some(message) = expected["message"].as_str() {
                if d.message != message {
                    return Some(format!(
                        "{}: expected message {:?}, got {:?}",
                        name, message, d.message
                    ));
                }
            }
            if let Some(line) = expected["line"].as_u64() {
                if d.line != Some(line as u32) {
                    return Some(format!(
                        "{}: expected line {}, got {:?}",
                        name, line, d.line
                    ));
                }
            }
        }
    }
    None
}

#[test]
fn eval_fixtures() {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(fixture_dir())
        .expect("conformance/eval exists")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "jsx"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no eval fixtures found");

    let failures: Vec<String> = paths.iter().filter_map(|p| run_fixture(p)).collect();
    assert!(
        failures.is_empty(),
        "{} of {} eval fixtures failed:\n{}",
        failures.len(),
        paths.len(),
        failures.join("\n")
    );
}

/// Compile-stage positives must also evaluate to a success.
#[test]
fn compile_positive_fixtures_evaluate() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../conformance/compile/positive");
    let scope = build_scope();
    let mut failures = Vec::new();
    for entry in std::fs::read_dir(&dir).expect("compile fixtures exist") {
        let path = entry.expect("dir entry").path();
        if path.extension().is_some_and(|e| e == "jsx") {
            let source = std::fs::read_to_string(&path).unwrap();
            let result = evaluate(&source, &scope);
            if !result.is_success() {
                failures.push(format!("{}: {:?}", path.display(), result));
            }
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}
