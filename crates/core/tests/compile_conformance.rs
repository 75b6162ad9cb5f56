//! Compiles every fixture under conformance/compile. Positive fixtures must
//! compile; each negative fixture must fail with exactly the diagnostic in
//! its sibling `.expected-error.json`.

use livecode_core::{compile, normalize, CompileError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn globals() -> BTreeSet<String> {
    [
        "React", "render", "undefined", "NaN", "Infinity", "Math", "JSON", "Object", "Array",
        "String", "Number", "Error", "console", "Card", "CardHeader", "CardTitle", "CardContent",
        "Upload", "FileText",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn fixtures(dir: &str) -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../conformance/compile")
        .join(dir);
    let mut paths: Vec<_> = std::fs::read_dir(&root)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", root.display(), e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "jsx"))
        .collect();
    paths.sort();
    paths
}

#[test]
fn positive_fixtures_compile() {
    let globals = globals();
    let mut failures = Vec::new();
    let paths = fixtures("positive");
    assert!(!paths.is_empty(), "no positive fixtures found");
    for path in &paths {
        let src = std::fs::read_to_string(path).unwrap();
        if let Err(e) = compile(&src, &globals) {
            failures.push(format!("{}: {}", path.display(), e));
        }
    }
    assert!(
        failures.is_empty(),
        "{} of {} positive fixtures failed:\n{}",
        failures.len(),
        paths.len(),
        failures.join("\n")
    );
}

#[test]
fn negative_fixtures_report_expected_diagnostic() {
    let globals = globals();
    let mut failures = Vec::new();
    let paths = fixtures("negative");
    assert!(!paths.is_empty(), "no negative fixtures found");
    for path in &paths {
        let src = std::fs::read_to_string(path).unwrap();
        let expected_path = path.with_extension("expected-error.json");
        let expected: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&expected_path).unwrap()).unwrap();
        match compile(&src, &globals) {
            Ok(_) => failures.push(format!("{}: compiled but should fail", path.display())),
            Err(e) => {
                if e.to_json_value() != expected {
                    failures.push(format!(
                        "{}: expected {}, got {}",
                        path.display(),
                        expected,
                        e.to_json_value()
                    ));
                }
            }
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn normalized_generator_output_compiles() {
    let raw = "```jsx\nconst CodeComponent = () => <div className=\"p-4\">Hello</div>;\n```";
    let src = normalize(raw);
    compile(src.as_str(), &globals()).unwrap();
}

#[test]
fn missing_root_component_is_a_compile_error() {
    let src = normalize("const Other = () => <div />;");
    let err: CompileError = compile(src.as_str(), &globals()).unwrap_err();
    assert_eq!(err.message, "'CodeComponent' is not defined in the preview scope");
}
