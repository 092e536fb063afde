use form_panel::evaluator::evaluator::EvaluatorConfig;
use form_panel::form::element_model::{Element, ElementType, SelectOption};
use form_panel::hooks::hook_model::HookKind;
use form_panel::panel::panel::PanelSettings;
use form_panel::trace::diagnostic::{DiagnosticKind, DiagnosticSource};
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;
use common::utils::{number, panel, panel_with, text, tight_settings};

// =========================================================================
// Defaults
// =========================================================================

#[test]
fn elements_without_hooks_use_defaults() {
    let (panel, sink) = panel(vec![
        text("name", "db01"),
        Element::new("mode", ElementType::Select)
            .with_value("ro")
            .with_options(vec![SelectOption::new("Read only", "ro")]),
    ]);

    for el in panel.elements() {
        assert!(el.visible, "{} should be visible", el.id);
        assert!(!el.disabled, "{} should be enabled", el.id);
    }
    assert_eq!(panel.element("mode").unwrap().effective_options().len(), 1);
    assert_eq!(panel.element("name").unwrap().value, json!("db01"));
    assert_eq!(panel.stats().passes, 1);
    assert!(panel.stats().converged);
    assert!(sink.is_empty());
}

#[test]
fn blank_hook_source_counts_as_absent() {
    let (panel, sink) = panel(vec![
        text("a", "x").with_hook(HookKind::ShowIf, "   "),
    ]);

    assert!(panel.element("a").unwrap().visible);
    assert_eq!(panel.registry().compilations(), 0);
    assert!(sink.is_empty());
}

#[test]
fn read_only_types_are_always_disabled() {
    let (panel, _) = panel(vec![
        Element::new("info", ElementType::Disabled)
            .with_value("fixed")
            .with_hook(HookKind::DisableIf, "false"),
        Element::new("save", ElementType::Button),
    ]);

    assert!(panel.element("info").unwrap().disabled);
    assert!(!panel.element("save").unwrap().disabled, "buttons are not read-only");
}

// =========================================================================
// Visibility and enablement
// =========================================================================

#[test]
fn disable_if_follows_other_element_value() {
    let (mut panel, sink) = panel(vec![
        number("a", 3),
        text("b", "").with_hook(HookKind::DisableIf, r#"return value_of(elements, "a") < 10;"#),
    ]);

    assert!(panel.element("b").unwrap().disabled);

    let diff = panel.set_value("a", json!(12)).unwrap();
    assert!(!panel.element("b").unwrap().disabled);
    assert_eq!(diff.enabled, vec!["b".to_string()]);
    assert!(sink.is_empty());
}

#[test]
fn show_if_hides_and_shows() {
    let (mut panel, _) = panel(vec![
        number("a", 3),
        text("b", "").with_hook(HookKind::ShowIf, r#"value_of(elements, "a") > 5"#),
    ]);

    assert!(!panel.element("b").unwrap().visible);

    let diff = panel.set_value("a", json!(7)).unwrap();
    assert!(panel.element("b").unwrap().visible);
    assert_eq!(diff.shown, vec!["b".to_string()]);
    assert!(diff.hidden.is_empty());
}

#[test]
fn show_if_sees_values_written_in_an_earlier_pass() {
    let (panel, _) = panel(vec![
        number("a", 1).with_hook(HookKind::OnValueChanged, "if element.value < 10 { return 10; }"),
        text("b", "").with_hook(HookKind::ShowIf, r#"value_of(elements, "a") >= 10"#),
    ]);

    assert_eq!(panel.element("a").unwrap().value, json!(10));
    assert!(panel.element("b").unwrap().visible);
    assert_eq!(panel.stats().passes, 2);
}

#[test]
fn truthiness_of_hook_results() {
    let (panel, _) = panel(vec![
        text("zero", "").with_hook(HookKind::ShowIf, "0"),
        text("empty", "").with_hook(HookKind::ShowIf, r#""""#),
        text("unit", "").with_hook(HookKind::ShowIf, "()"),
        text("list", "").with_hook(HookKind::ShowIf, "[1]"),
        text("word", "").with_hook(HookKind::ShowIf, r#""yes""#),
    ]);

    let visible: Vec<bool> = panel.elements().iter().map(|e| e.visible).collect();
    assert_eq!(visible, vec![false, false, false, true, true]);
}

// =========================================================================
// Options
// =========================================================================

#[test]
fn get_options_replaces_static_options() {
    let (panel, _) = panel(vec![
        Element::new("mode", ElementType::Select)
            .with_options(vec![SelectOption::new("Static", "s")])
            .with_hook(HookKind::GetOptions, r#"[#{ label: "Read only", value: "ro" }, "rw"]"#),
    ]);

    let el = panel.element("mode").unwrap();
    assert_eq!(
        el.effective_options().to_vec(),
        vec![SelectOption::new("Read only", "ro"), SelectOption::new("rw", "rw")]
    );
    assert_eq!(el.options.len(), 1, "static options are kept");
}

#[test]
fn get_options_ignored_for_types_without_options() {
    let (panel, sink) = panel(vec![
        text("name", "").with_hook(HookKind::GetOptions, r#"["a", "b"]"#),
    ]);

    assert!(panel.element("name").unwrap().dynamic_options.is_none());
    assert!(sink.is_empty());
}

#[test]
fn malformed_options_fall_back_to_static() {
    let (panel, sink) = panel(vec![
        Element::new("mode", ElementType::Radio)
            .with_options(vec![SelectOption::new("One", 1)])
            .with_hook(HookKind::GetOptions, "42"),
    ]);

    assert_eq!(panel.element("mode").unwrap().effective_options().len(), 1);
    assert_eq!(sink.count(DiagnosticKind::HookRuntimeFault), 1);
    assert_eq!(panel.stats().faults, 1);
}

// =========================================================================
// Value cascades
// =========================================================================

#[test]
fn chained_values_converge() {
    let (mut panel, sink) = panel(vec![
        number("a", 1),
        number("b", 0).with_hook(HookKind::OnValueChanged, r#"return value_of(elements, "a") + 1;"#),
        number("c", 0).with_hook(HookKind::OnValueChanged, r#"return value_of(elements, "b") + 1;"#),
    ]);

    assert_eq!(panel.element("b").unwrap().value, json!(2));
    assert_eq!(panel.element("c").unwrap().value, json!(3));
    assert!(panel.stats().converged);
    assert!(panel.stats().passes <= 3);

    let diff = panel.set_value("a", json!(5)).unwrap();
    assert_eq!(panel.element("b").unwrap().value, json!(6));
    assert_eq!(panel.element("c").unwrap().value, json!(7));
    assert_eq!(panel.stats().changed, vec!["b".to_string(), "c".to_string()]);

    let ids: Vec<&str> = diff.values.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(sink.is_empty());
}

#[test]
fn chain_declared_in_reverse_still_converges() {
    let (panel, _) = panel(vec![
        number("c", 0).with_hook(HookKind::OnValueChanged, r#"return value_of(elements, "b") + 1;"#),
        number("b", 0).with_hook(HookKind::OnValueChanged, r#"return value_of(elements, "a") + 1;"#),
        number("a", 1),
    ]);

    assert_eq!(panel.element("c").unwrap().value, json!(3));
    assert!(panel.stats().converged);
    assert_eq!(panel.stats().passes, 3);
}

#[test]
fn re_evaluating_a_stable_form_changes_nothing() {
    let (mut panel, _) = panel(vec![
        number("a", 1),
        number("b", 0).with_hook(HookKind::OnValueChanged, r#"return value_of(elements, "a") * 2;"#),
    ]);
    let before = panel.snapshot().clone();

    let diff = panel.refresh(&Default::default());

    assert!(diff.is_empty());
    assert_eq!(panel.stats().passes, 1);
    assert!(panel.stats().changed.is_empty());
    assert_eq!(panel.snapshot(), &before);
}

#[test]
fn hook_may_write_other_elements() {
    let (panel, _) = panel(vec![
        number("a", 3).with_hook(HookKind::OnValueChanged, "elements[1].value = element.value * 2;"),
        number("b", 0),
    ]);

    assert_eq!(panel.element("b").unwrap().value, json!(6));
    assert_eq!(panel.element("a").unwrap().value, json!(3));
}

#[test]
fn hook_may_assign_own_value() {
    let (panel, _) = panel(vec![
        text("name", "  padded ").with_hook(
            HookKind::OnValueChanged,
            "let v = element.value; v.trim(); element.value = v;",
        ),
    ]);

    assert_eq!(panel.element("name").unwrap().value, json!("padded"));
}

#[test]
fn hook_writes_are_clamped_to_range() {
    let (panel, _) = panel(vec![
        number("pct", 0)
            .with_range(Some(0.0), Some(100.0))
            .with_hook(HookKind::OnValueChanged, "return 250;"),
    ]);

    assert_eq!(panel.element("pct").unwrap().value, json!(100));
    assert!(panel.stats().converged);
}

#[test]
fn non_converging_hook_stops_at_max_iterations() {
    let settings = PanelSettings {
        evaluator: EvaluatorConfig { max_iterations: 5 },
        ..PanelSettings::default()
    };
    let (panel, sink) = panel_with(
        vec![number("counter", 0).with_hook(HookKind::OnValueChanged, "return element.value + 1;")],
        settings,
    );

    assert!(!panel.stats().converged);
    assert_eq!(panel.stats().passes, 5);
    assert_eq!(panel.element("counter").unwrap().value, json!(5));

    let loops = sink.entries();
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].kind, DiagnosticKind::ConvergenceExceeded);
    assert_eq!(loops[0].source, DiagnosticSource::Evaluator);
}

#[test]
fn capped_evaluation_publishes_flags_matching_final_values() {
    let settings = PanelSettings {
        evaluator: EvaluatorConfig { max_iterations: 5 },
        ..PanelSettings::default()
    };
    let (panel, _) = panel_with(
        vec![
            number("a", 0).with_hook(HookKind::OnValueChanged, "return element.value + 1;"),
            text("b", "").with_hook(HookKind::DisableIf, r#"value_of(elements, "a") >= 5"#),
            text("c", "").with_hook(HookKind::ShowIf, r#"value_of(elements, "a") < 5"#),
        ],
        settings,
    );

    assert!(!panel.stats().converged);
    assert_eq!(panel.element("a").unwrap().value, json!(5));
    assert!(panel.element("b").unwrap().disabled);
    assert!(!panel.element("c").unwrap().visible);
}

// =========================================================================
// Fault containment
// =========================================================================

#[test]
fn import_is_rejected_and_hook_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("secret");
    std::fs::write(module.with_extension("rhai"), r#"export const secret = "from-disk";"#).unwrap();

    let path = module.display().to_string();
    let (panel, sink) = panel(vec![
        text("a", "untouched").with_hook(
            HookKind::OnValueChanged,
            &format!(r#"import "{}" as m; return m::secret;"#, path),
        ),
        text("b", "").with_hook(HookKind::ShowIf, &format!(r#"import "{}" as m; false"#, path)),
    ]);

    assert_eq!(panel.element("a").unwrap().value, json!("untouched"));
    assert!(panel.element("b").unwrap().visible, "show_if default applies");
    assert_eq!(sink.count(DiagnosticKind::CompileError), 2);
}

#[test]
fn runtime_fault_falls_back_and_other_hooks_still_run() {
    let (panel, sink) = panel(vec![
        text("a", "").with_hook(HookKind::ShowIf, "return elements[99].value;"),
        text("b", "").with_hook(HookKind::DisableIf, "true"),
    ]);

    assert!(panel.element("a").unwrap().visible, "faulted show_if defaults to visible");
    assert!(panel.element("b").unwrap().disabled);

    let faults = sink.entries();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, DiagnosticKind::HookRuntimeFault);
    assert_eq!(faults[0].element_id.as_deref(), Some("a"));
    assert_eq!(faults[0].source, DiagnosticSource::Hook(HookKind::ShowIf));
    assert_eq!(panel.stats().faults, 1);
}

#[test]
fn runaway_hook_is_stopped_by_operation_limit() {
    let (panel, sink) = panel_with(
        vec![
            text("spin", "").with_hook(HookKind::DisableIf, "loop { }"),
            text("ok", "").with_hook(HookKind::DisableIf, "true"),
        ],
        tight_settings(1_000),
    );

    assert!(!panel.element("spin").unwrap().disabled);
    assert!(panel.element("ok").unwrap().disabled);
    assert_eq!(sink.count(DiagnosticKind::HookRuntimeFault), 1);
}

#[test]
fn faulting_value_hook_leaves_value_unchanged() {
    let (panel, sink) = panel(vec![
        number("a", 4).with_hook(HookKind::OnValueChanged, r#"throw "nope";"#),
    ]);

    assert_eq!(panel.element("a").unwrap().value, json!(4));
    assert!(panel.stats().converged);
    assert_eq!(sink.count(DiagnosticKind::HookRuntimeFault), 1);
}
