//! CLI: validator output + instance → diagnostics
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use json_explain::{Diagnostics, Localization, Options, OutputUnit, SchemaRegistry};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// explain JSON Schema validation failures in plain language
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// explain one validation result
    Explain(ExplainCmd),
    /// explain many `{ "instance", "output" }` case files in parallel
    Batch(BatchCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// Schema documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    schema: Vec<String>,

    /// URI of the schema the instance was validated against
    #[arg(long)]
    schema_id: String,

    /// message locale
    #[arg(long, default_value = json_explain::localization::DEFAULT_LOCALE)]
    locale: String,

    /// flat `id -> template` JSON object overriding built-in messages
    #[arg(long)]
    messages: Option<PathBuf>,

    /// recursion-depth guard for schema evaluation
    #[arg(long, default_value_t = json_explain::evaluate::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(clap::Parser, Debug)]
struct ExplainCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// instance .json file
    #[arg(long)]
    instance: PathBuf,

    /// validator output .json file
    #[arg(long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// print the normalized output instead of messages
    #[arg(long)]
    normalized: bool,

    /// write here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct BatchCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// case files. May be literal paths or quoted glob patterns
    #[arg(long, num_args = 1.., required = true)]
    case: Vec<String>,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(Debug, Deserialize)]
struct Case {
    instance: Value,
    output: OutputUnit,
}

/// Everything one run needs, loaded once.
struct Session {
    registry: SchemaRegistry,
    schema_id: String,
    options: Options,
    l10n: Localization,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<Session> {
        let mut registry = SchemaRegistry::new();
        let source_paths = resolve_file_path_patterns(&self.schema)?;
        for source_path in source_paths {
            let schema: Value = read_json(&source_path)?;
            let uri = schema
                .get("$id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| file_uri(&source_path));
            registry
                .register(&uri, schema)
                .with_context(|| format!("failed to register schema {}", source_path.display()))?;
        }

        let mut l10n = Localization::for_locale(&self.locale)?;
        if let Some(path) = self.messages.as_ref() {
            let messages: IndexMap<String, String> = read_json(path)?;
            l10n = l10n.with_messages(messages);
        }
        let options = Options { locale: self.locale.clone(), max_depth: self.max_depth };
        Ok(Session { registry, schema_id: self.schema_id.clone(), options, l10n })
    }
}

impl Session {
    fn explain(&self, instance: &Value, output: &OutputUnit) -> Result<Diagnostics> {
        let diagnostics = json_explain::explain(
            instance,
            output,
            &self.schema_id,
            &self.registry,
            &self.options,
            &self.l10n,
        )?;
        Ok(diagnostics)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Explain(target) => {
                let session = target.schema_settings.load()?;
                let instance: Value = read_json(&target.instance)?;
                let output_src = std::fs::read_to_string(&target.output)
                    .with_context(|| format!("failed to read {}", target.output.display()))?;
                let output = OutputUnit::from_json_str(&output_src)
                    .with_context(|| format!("failed to parse {}", target.output.display()))?;

                let rendered = if target.normalized {
                    let normalized = json_explain::normalized_output(
                        &instance,
                        &output,
                        &session.schema_id,
                        &session.registry,
                        &session.options,
                    )?;
                    serde_json::to_string_pretty(&normalized)?
                } else {
                    let diagnostics = session.explain(&instance, &output)?;
                    render(&diagnostics, target.format, None)?
                };
                write_output(target.out.as_deref(), &rendered)
            }
            Command::Batch(target) => {
                let session = target.schema_settings.load()?;
                let case_paths = resolve_file_path_patterns(&target.case)?;
                let results: Vec<(PathBuf, Result<Diagnostics>)> = case_paths
                    .into_par_iter()
                    .map(|path| {
                        let result = read_json::<Case>(&path)
                            .and_then(|case| session.explain(&case.instance, &case.output));
                        (path, result)
                    })
                    .collect();

                let mut failed = 0usize;
                for (path, result) in results {
                    match result {
                        Ok(diagnostics) => {
                            let label = path.display().to_string();
                            println!("{}", render(&diagnostics, target.format, Some(label.as_str()))?);
                        }
                        Err(error) => {
                            failed += 1;
                            eprintln!("{} {}: {error:#}", "error".red().bold(), path.display());
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} case(s) could not be explained");
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render(diagnostics: &Diagnostics, format: Format, label: Option<&str>) -> Result<String> {
    match format {
        Format::Json => match label {
            Some(label) => Ok(serde_json::to_string(&serde_json::json!({
                "case": label,
                "errors": diagnostics.errors,
            }))?),
            None => Ok(serde_json::to_string_pretty(diagnostics)?),
        },
        Format::Text => {
            let mut lines = Vec::new();
            if let Some(label) = label {
                lines.push(label.bold().to_string());
            }
            if diagnostics.errors.is_empty() {
                lines.push(format!("{}", "no diagnostics".dimmed()));
            }
            for error in &diagnostics.errors {
                lines.push(format!("{} {}", error.instance_location.cyan().bold(), error.message));
                for location in error.schema_location.locations() {
                    lines.push(format!("    {} {}", "at".dimmed(), location.dimmed()));
                }
            }
            Ok(lines.join("\n"))
        }
    }
}

fn write_output(out: Option<&Path>, rendered: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, rendered).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = json_explain::path_de::from_str_with_path(&source)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(value)
}

fn file_uri(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    url::Url::from_file_path(&absolute)
        .map(String::from)
        .unwrap_or_else(|()| absolute.display().to_string())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
