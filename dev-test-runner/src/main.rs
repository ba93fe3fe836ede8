//! Runs the JSON fixture suites in `fixtures/` through the library.
//!
//! Usage: `dev-test-runner [case-name-regex]`
use std::path::{Path, PathBuf};

use json_explain::{ErrorObject, Options, SchemaRegistry, produce_diagnostics};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static FIXTURE_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*\.json$").unwrap());

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Suite {
    description: String,
    #[serde(rename = "schemaId")]
    schema_id: String,
    schema: Value,
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    name: String,
    instance: Value,
    output: Value,
    expected: Vec<ErrorObject>,
}

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
    skipped: usize,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

fn load_suite(path: &Path) -> Result<Suite, String> {
    let source = std::fs::read_to_string(path).map_err(|error| format!("{}: {error}", path.display()))?;
    let deserializer = &mut serde_json::Deserializer::from_str(&source);
    serde_path_to_error::deserialize(deserializer)
        .map_err(|error| format!("{}: at {} → {}", path.display(), error.path(), error.inner()))
}

fn fixture_paths(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = std::fs::read_dir(dir).map_err(|error| format!("{}: {error}", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| FIXTURE_FILE.is_match(name))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn run_suite(suite: &Suite, filter: Option<&Regex>, tally: &mut Tally) -> Result<(), String> {
    let registry = SchemaRegistry::new()
        .with(&suite.schema_id, suite.schema.clone())
        .map_err(|error| format!("{}: {error}", suite.description))?;
    eprintln!("—— {} ——", suite.description);
    for case in &suite.cases {
        if filter.is_some_and(|filter| !filter.is_match(&case.name)) {
            tally.skipped += 1;
            continue;
        }
        let result = produce_diagnostics(
            &case.instance,
            &case.output,
            &suite.schema_id,
            &registry,
            &Options::default(),
        );
        match result {
            Ok(diagnostics) if diagnostics.errors == case.expected => {
                tally.passed += 1;
                eprintln!("✅ {}", case.name);
            }
            Ok(diagnostics) => {
                tally.failed += 1;
                eprintln!("❌ {}", case.name);
                eprintln!("   expected: {}", to_json(&case.expected));
                eprintln!("   actual:   {}", to_json(&diagnostics.errors));
            }
            Err(error) => {
                tally.failed += 1;
                eprintln!("❌ {}: {error}", case.name);
            }
        }
    }
    Ok(())
}

fn to_json(errors: &[ErrorObject]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|error| error.to_string())
}

fn main() {
    let filter = match std::env::args().nth(1).map(|pattern| Regex::new(&pattern)) {
        None => None,
        Some(Ok(regex)) => Some(regex),
        Some(Err(error)) => {
            eprintln!("invalid case filter: {error}");
            std::process::exit(2);
        }
    };
    let fixtures_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let paths = match fixture_paths(&fixtures_dir) {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(2);
        }
    };

    let mut tally = Tally::default();
    for path in paths {
        let outcome = load_suite(&path).and_then(|suite| run_suite(&suite, filter.as_ref(), &mut tally));
        if let Err(error) = outcome {
            tally.failed += 1;
            eprintln!("❌ {error}");
        }
    }
    eprintln!("passed: {}, failed: {}, skipped: {}", tally.passed, tally.failed, tally.skipped);
    if tally.failed > 0 {
        std::process::exit(1);
    }
}
