//! Output formatting for reflection results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::config::InvocationFilter;
use crate::reflection::{Argument, ArgumentKind, Invocation, ReflectionError, ReflectionFile};
use crate::reflector::BatchResult;
use crate::tokenizer::{Token, TokenKind};

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub passed: bool,
    pub files_reflected: usize,
    pub files_failed: usize,
    pub files: Vec<JsonFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonError>,
}

/// One reflected file.
#[derive(Serialize, Deserialize)]
pub struct JsonFile {
    pub file: String,
    pub tokens: usize,
    pub has_includes: bool,
    pub declarations: Vec<JsonDeclaration>,
    pub invocations: Vec<JsonInvocation>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonDeclaration {
    pub kind: String,
    pub name: String,
    pub line: usize,
}

#[derive(Serialize, Deserialize)]
pub struct JsonInvocation {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub line: usize,
    pub level: usize,
    pub arguments: Vec<JsonArgument>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonArgument {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

/// A file that could not be reflected.
#[derive(Serialize, Deserialize)]
pub struct JsonError {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

/// Build the JSON report for a batch.
pub fn json_report(
    path: &str,
    config_path: Option<&str>,
    batch: &BatchResult,
    filter: &InvocationFilter,
) -> JsonReport {
    let files: Vec<JsonFile> = batch.reflected().map(|r| file_to_json(r, filter)).collect();
    let errors: Vec<JsonError> = batch
        .failures()
        .map(|(path, e)| JsonError {
            file: path.display().to_string(),
            line: match e {
                ReflectionError::MalformedSource { line, .. } => Some(*line),
                _ => None,
            },
            message: e.to_string(),
        })
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        config: config_path.map(str::to_string),
        passed: errors.is_empty(),
        files_reflected: files.len(),
        files_failed: errors.len(),
        files,
        errors,
    }
}

/// Write results in JSON format.
pub fn write_json(
    path: &str,
    config_path: Option<&str>,
    batch: &BatchResult,
    filter: &InvocationFilter,
) -> anyhow::Result<()> {
    let report = json_report(path, config_path, batch, filter);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn file_to_json(reflection: &ReflectionFile, filter: &InvocationFilter) -> JsonFile {
    JsonFile {
        file: reflection.filename().to_string(),
        tokens: reflection.count_tokens(),
        has_includes: reflection.has_includes(),
        declarations: reflection
            .declarations()
            .iter()
            .map(|d| JsonDeclaration {
                kind: d.kind.to_string(),
                name: d.name.clone(),
                line: d.line,
            })
            .collect(),
        invocations: reflection
            .invocations()
            .iter()
            .filter(|i| filter.matches(i.name()))
            .map(invocation_to_json)
            .collect(),
    }
}

fn invocation_to_json(i: &Invocation) -> JsonInvocation {
    JsonInvocation {
        name: i.name().to_string(),
        kind: i.kind().to_string(),
        receiver: i.receiver().map(str::to_string),
        line: i.line(),
        level: i.level(),
        arguments: i.arguments().iter().map(argument_to_json).collect(),
    }
}

fn argument_to_json(a: &Argument) -> JsonArgument {
    JsonArgument {
        kind: a.kind().to_string(),
        name: a.name().map(str::to_string),
        value: a.value().to_string(),
        string_value: a.string_value(),
    }
}

/// Write a token stream as a JSON array.
pub fn write_tokens_json(tokens: &[Token]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(tokens)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in human-readable colored format.
pub fn write_pretty(
    path: &str,
    config_path: Option<&str>,
    batch: &BatchResult,
    filter: &InvocationFilter,
) {
    // Header
    println!();
    print!("  ");
    print!("{}", "phpreflect".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Reflecting: ".dimmed());
    println!("{}", path);
    if let Some(config) = config_path {
        print!("  {}", "Config:     ".dimmed());
        println!("{}", config);
    }
    println!();

    for reflection in batch.reflected() {
        write_file(reflection, filter);
    }

    let failures: Vec<_> = batch.failures().collect();
    if !failures.is_empty() {
        println!("  {} ({}):", "Errors".bold(), failures.len());
        println!();
        for (_, e) in &failures {
            println!("    {} {}", "ERROR".red(), e);
        }
        println!();
    }

    // Final status line
    let reflected = batch.len() - failures.len();
    if failures.is_empty() {
        println!("  {} {} files reflected", "✓".green(), reflected);
    } else {
        println!(
            "  {} {} files reflected, {} failed",
            "✗".red(),
            reflected,
            failures.len()
        );
    }
    println!();
}

fn write_file(reflection: &ReflectionFile, filter: &InvocationFilter) {
    print!("  {}", reflection.filename().blue().bold());
    print!("{}", format!("  {} tokens", reflection.count_tokens()).dimmed());
    if reflection.has_includes() {
        print!("{}", "  includes".yellow());
    }
    println!();

    for d in reflection.declarations() {
        print!("    {:<10}", d.kind.as_str().dimmed());
        print!("{}", d.name.bold());
        println!("{}", format!(":{}", d.line).dimmed());
    }

    let invocations: Vec<&Invocation> = reflection
        .invocations()
        .iter()
        .filter(|i| filter.matches(i.name()))
        .collect();
    if !invocations.is_empty() {
        println!("    {} ({}):", "Invocations".bold(), invocations.len());
        for i in invocations {
            print!("    {}{}", "  ".repeat(i.level() + 1), call_label(i).cyan());
            print!("{}", format!(":{}", i.line()).dimmed());
            println!();
            for a in i.arguments() {
                println!("    {}{}", "  ".repeat(i.level() + 3), argument_label(a));
            }
        }
    }
    println!();
}

fn call_label(i: &Invocation) -> String {
    let target = match (i.receiver(), i.kind().operator()) {
        (Some(receiver), Some(op)) => format!("{}{}{}", receiver, op, i.name()),
        (None, Some(op)) => format!("{}{}", op, i.name()),
        _ => i.name().to_string(),
    };
    format!("{}({})", target, i.argument_count())
}

fn argument_label(a: &Argument) -> String {
    let kind = match a.kind() {
        ArgumentKind::Variable => "variable".magenta(),
        ArgumentKind::String => "string".green(),
        ArgumentKind::Constant => "constant".yellow(),
        ArgumentKind::Array => "array".blue(),
        ArgumentKind::Expression => "expression".normal(),
    };
    match a.name() {
        Some(name) => format!("{:<12} {}: {}", kind, name, a.value()),
        None => format!("{:<12} {}", kind, a.value()),
    }
}

/// Write a token stream, one token per line.
pub fn write_tokens_pretty(tokens: &[Token]) {
    for t in tokens {
        let kind = match t.kind {
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment => {
                t.kind.as_str().dimmed()
            }
            TokenKind::Keyword => t.kind.as_str().magenta(),
            TokenKind::Identifier => t.kind.as_str().cyan(),
            TokenKind::Variable => t.kind.as_str().blue(),
            TokenKind::String => t.kind.as_str().green(),
            TokenKind::Unknown | TokenKind::Unterminated(_) => t.kind.as_str().red(),
            _ => t.kind.as_str().normal(),
        };
        println!(
            "{:>5}:{:<6} {:<14} {:?}",
            t.line,
            t.offset,
            kind,
            t.text
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflector::FileResult;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn batch() -> BatchResult {
        let good = ReflectionFile::reflect(
            "good.php",
            "<?php namespace App; class A { function run() { $this->log('x', level: 2); } } trans('k');",
        )
        .unwrap();
        let bad = ReflectionFile::reflect("bad.php", "<?php\n\nfoo(").unwrap_err();
        BatchResult {
            files: vec![
                FileResult {
                    path: PathBuf::from("bad.php"),
                    result: Err(bad),
                },
                FileResult {
                    path: PathBuf::from("good.php"),
                    result: Ok(Arc::new(good)),
                },
            ],
        }
    }

    #[test]
    fn test_json_report() {
        let report = json_report(".", None, &batch(), &InvocationFilter::default());
        assert!(!report.passed);
        assert_eq!(report.files_reflected, 1);
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.errors[0].file, "bad.php");
        assert_eq!(report.errors[0].line, Some(3));

        let file = &report.files[0];
        assert_eq!(file.declarations[0].kind, "class");
        assert_eq!(file.declarations[0].name, "App\\A");
        assert_eq!(file.invocations.len(), 2);

        let log = &file.invocations[0];
        assert_eq!(log.kind, "method");
        assert_eq!(log.receiver.as_deref(), Some("$this"));
        assert_eq!(log.arguments[0].string_value.as_deref(), Some("x"));
        assert_eq!(log.arguments[1].name.as_deref(), Some("level"));
        assert_eq!(log.arguments[1].kind, "constant");
    }

    #[test]
    fn test_json_report_filters_invocations() {
        let config = crate::config::Config::default();
        let filter = config.invocation_filter(&["^trans$".to_string()]).unwrap();
        let report = json_report(".", Some("phpreflect.yaml"), &batch(), &filter);
        let names: Vec<&str> = report.files[0]
            .invocations
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["trans"]);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"config\":\"phpreflect.yaml\""));
    }

    #[test]
    fn test_call_label() {
        let file = ReflectionFile::reflect("a.php", "<?php Foo::bar(1, 2); baz(); x()->y();").unwrap();
        let labels: Vec<String> = file.invocations().iter().map(call_label).collect();
        assert_eq!(labels, vec!["Foo::bar(2)", "baz(0)", "x(0)", "->y(0)"]);
    }
}
