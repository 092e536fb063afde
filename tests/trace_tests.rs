use std::sync::Arc;

use form_panel::error::ScriptError;
use form_panel::hooks::hook_model::HookKind;
use form_panel::trace::diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSource};
use form_panel::trace::logger::JsonlSink;
use form_panel::trace::sink::{CollectingSink, DiagnosticSink, FanoutSink};
use pretty_assertions::assert_eq;

#[test]
fn diagnostic_display_includes_location() {
    let err = ScriptError::Compile {
        message: "expecting ')'".into(),
        line: Some(1),
        column: Some(9),
    };
    let d = Diagnostic::compile_error("port", HookKind::DisableIf, &err);

    assert_eq!(d.kind, DiagnosticKind::CompileError);
    assert_eq!(d.source, DiagnosticSource::Hook(HookKind::DisableIf));
    assert_eq!(
        d.to_string(),
        "[CompileError] port (disable_if): compile error at line 1, column 9: expecting ')'"
    );

    let loop_d = Diagnostic::convergence_exceeded(10);
    assert!(loop_d.element_id.is_none());
    assert!(loop_d.to_string().starts_with("[ConvergenceExceeded] evaluator:"));
}

#[test]
fn collecting_sink_counts_and_drains() {
    let sink = CollectingSink::new();
    sink.report(&Diagnostic::hook_fault("a", HookKind::ShowIf, "x"));
    sink.report(&Diagnostic::hook_fault("b", HookKind::ShowIf, "y"));
    sink.report(&Diagnostic::action_fault(None, "z"));

    assert_eq!(sink.count(DiagnosticKind::HookRuntimeFault), 2);
    assert_eq!(sink.drain().len(), 3);
    assert!(sink.is_empty());
}

#[test]
fn fanout_reaches_every_sink() {
    let first = Arc::new(CollectingSink::new());
    let second = Arc::new(CollectingSink::new());
    let fanout = FanoutSink::new().with(first.clone()).with(second.clone());

    fanout.report(&Diagnostic::action_fault(Some("save"), "boom"));

    assert_eq!(first.len(), 1);
    assert_eq!(second.entries()[0].element_id.as_deref(), Some("save"));
}

#[test]
fn jsonl_sink_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diagnostics.jsonl");

    let sink = JsonlSink::new(&path);
    assert!(sink.is_enabled());
    sink.report(&Diagnostic::hook_fault("a", HookKind::GetOptions, "bad options"));
    sink.report(&Diagnostic::convergence_exceeded(3));

    let content = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["kind"], "hook_runtime_fault");
    assert_eq!(entries[0]["source"]["hook"], "get_options");
    assert_eq!(entries[1]["source"], "evaluator");
}

#[test]
fn jsonl_sink_disabled_on_bad_path() {
    let sink = JsonlSink::new(std::path::Path::new("/nonexistent/dir/diag.jsonl"));
    assert!(!sink.is_enabled());
    sink.report(&Diagnostic::convergence_exceeded(1));
}
