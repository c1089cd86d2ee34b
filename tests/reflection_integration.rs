//! Integration tests for file reflection.
//!
//! These tests reflect the PHP fixtures in testdata/ through the public API
//! and check declarations, invocations and argument classification.

use std::path::PathBuf;

use phpreflect::reflection::{
    ArgumentKind, InvocationKind, MalformedReason, ReflectionError, ReflectionFile,
};
use phpreflect::tokenizer::{self, TokenKind};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn open(name: &str) -> ReflectionFile {
    ReflectionFile::open(testdata_path().join(name)).expect("fixture should reflect")
}

// =============================================================================
// reflection_file.php
// =============================================================================

#[test]
fn test_declarations_by_kind() {
    let file = open("reflection_file.php");

    assert!(file
        .classes()
        .contains(&"Spiral\\Tests\\Tokenizer\\ReflectionFileTest"));
    assert!(file.traits().contains(&"Spiral\\Tests\\Tokenizer\\TestTrait"));
    assert!(file
        .interfaces()
        .contains(&"Spiral\\Tests\\Tokenizer\\TestInterface"));
    assert_eq!(file.functions(), vec!["Spiral\\Tests\\Tokenizer\\hello"]);

    // a trait never shows up as a class
    assert_eq!(file.classes().len(), 1);
    assert_eq!(file.interfaces().len(), 1);
    assert_eq!(file.traits().len(), 1);
}

#[test]
fn test_qualified_names_use_enclosing_namespace() {
    let file = open("reflection_file.php");
    for d in file.declarations() {
        assert_eq!(d.name, format!("Spiral\\Tests\\Tokenizer\\{}", d.short_name));
    }
}

#[test]
fn test_invocation_arguments() {
    let file = open("reflection_file.php");

    let a = file.invocations_of("test_function_a");
    assert_eq!(a.len(), 1);
    let a = a[0];
    assert_eq!(a.argument_count(), 2);
    assert_eq!(a.argument(0).unwrap().kind(), ArgumentKind::Variable);
    assert_eq!(a.argument(0).unwrap().value(), "$this");
    assert_eq!(a.argument(1).unwrap().kind(), ArgumentKind::Expression);
    assert_eq!(a.argument(1).unwrap().value(), "$a+$b");

    let b = file.invocations_of("test_function_b")[0];
    assert_eq!(b.argument_count(), 2);
    assert_eq!(b.argument(0).unwrap().kind(), ArgumentKind::String);
    assert_eq!(b.argument(0).unwrap().value(), "\"string\"");
    assert_eq!(b.argument(0).unwrap().string_value().as_deref(), Some("string"));
    assert_eq!(b.argument(1).unwrap().kind(), ArgumentKind::Constant);
    assert_eq!(b.argument(1).unwrap().value(), "123");

    assert!(matches!(
        b.argument(2),
        Err(ReflectionError::ArgumentIndex { index: 2, count: 2 })
    ));
}

#[test]
fn test_zero_argument_calls() {
    let file = open("reflection_file.php");
    let get_classes = file.invocations_of("getClasses");
    assert_eq!(get_classes.len(), 1);
    assert_eq!(get_classes[0].argument_count(), 0);
    assert_eq!(get_classes[0].kind(), InvocationKind::Method);
}

#[test]
fn test_reflection_is_idempotent() {
    let source = std::fs::read_to_string(testdata_path().join("reflection_file.php")).unwrap();
    let first = ReflectionFile::reflect("reflection_file.php", &source).unwrap();
    let second = ReflectionFile::reflect("reflection_file.php", &source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fixture_tokens_round_trip() {
    for name in ["reflection_file.php", "mixed.php", "malformed.php"] {
        let source = std::fs::read_to_string(testdata_path().join(name)).unwrap();
        let tokens = tokenizer::tokenize(&source);
        assert_eq!(tokenizer::reconstruct(&tokens), source, "{}", name);
    }
}

// =============================================================================
// mixed.php
// =============================================================================

#[test]
fn test_mixed_html_and_braced_namespaces() {
    let file = open("mixed.php");

    assert_eq!(file.enums(), vec!["App\\Http\\Status"]);
    assert_eq!(file.classes(), vec!["App\\Http\\Controller"]);
    // methods, the anonymous class method and the closure are not free functions
    assert_eq!(file.functions(), vec!["helper"]);
    assert!(file.has_includes());

    let status = &file.declarations()[0];
    assert_eq!(status.line, 8);

    let first = &file.tokens()[0];
    assert_eq!(first.kind, TokenKind::InlineHtml);
}

#[test]
fn test_mixed_invocations() {
    let file = open("mixed.php");
    let names: Vec<&str> = file.invocations().iter().map(|i| i.name()).collect();
    assert_eq!(
        names,
        vec!["ucfirst", "format_id", "view", "__", "sprintf", "helper", "htmlspecialchars"]
    );
    assert_eq!(file.invocations()[0].line(), 14);

    let view = file.invocations_of("view")[0];
    assert_eq!(view.argument_count(), 3);
    assert_eq!(view.level(), 0);
    assert_eq!(view.argument(0).unwrap().string_value().as_deref(), Some("pages.show"));
    assert_eq!(view.argument(1).unwrap().kind(), ArgumentKind::Array);
    let status = view.argument(2).unwrap();
    assert_eq!(status.name(), Some("status"));
    assert_eq!(status.kind(), ArgumentKind::Expression);

    let translate = file.invocations_of("__")[0];
    assert_eq!(translate.level(), 1);
    assert!(translate.argument(0).unwrap().is_interpolated());

    let sprintf = file.invocations_of("sprintf")[0];
    assert_eq!(
        sprintf.argument(0).unwrap().string_value().as_deref(),
        Some("%s\n")
    );
}

// =============================================================================
// malformed.php
// =============================================================================

#[test]
fn test_malformed_file_is_rejected() {
    let path = testdata_path().join("malformed.php");
    let err = ReflectionFile::open(&path).unwrap_err();
    match err {
        ReflectionError::MalformedSource { file, line, reason } => {
            assert!(file.ends_with("malformed.php"));
            assert_eq!(line, 8);
            assert_eq!(
                reason,
                MalformedReason::Mismatched {
                    expected: ")".to_string(),
                    found: "}".to_string()
                }
            );
        }
        other => panic!("expected malformed source, got {:?}", other),
    }
}

#[test]
fn test_tokenizer_never_fails_on_malformed_input() {
    let source = std::fs::read_to_string(testdata_path().join("malformed.php")).unwrap();
    let tokens = tokenizer::tokenize(&source);
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
}
