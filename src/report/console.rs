use crate::form::element_model::Element;
use crate::form::values::display_value;
use crate::report::report_model::FormReport;
use crate::trace::diagnostic::DiagnosticKind;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a form report for terminal output.
///
/// Produces output like:
/// ```text
/// === Form: Connection ===
///
///   host       text       db01
///   port       number     5432         [disabled]
///   mode       select     ro           [hidden] {ro, rw}
///
/// === Evaluation: converged in 2 passes, 0 faults ===
///     [COMPILE] port (disable_if): compile error at line 1: ...
/// ```
pub fn format_console_report(report: &FormReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Form: {} ===\n\n",
        report.title.as_deref().unwrap_or("(untitled)")
    ));

    let id_width = report
        .elements
        .iter()
        .map(|e| e.id.len())
        .max()
        .unwrap_or(0)
        .max(4);

    for el in &report.elements {
        out.push_str(&format_element(el, id_width));
        out.push('\n');
    }

    let eval = &report.evaluation;
    let state = if eval.converged {
        format!("converged in {} passes", eval.passes)
    } else {
        format!("did not converge after {} passes", eval.passes)
    };
    out.push_str(&format!("\n=== Evaluation: {}, {} faults ===\n", state, eval.faults));

    if !eval.changed.is_empty() {
        out.push_str(&format!("    changed by hooks: {}\n", eval.changed.join(", ")));
    }

    for d in &report.diagnostics {
        let marker = match d.kind {
            DiagnosticKind::CompileError => "COMPILE",
            DiagnosticKind::HookRuntimeFault => "FAULT",
            DiagnosticKind::ConvergenceExceeded => "LOOP",
            DiagnosticKind::ActionRuntimeFault => "ACTION",
        };
        let element = d.element_id.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "    [{}] {} ({}): {}\n",
            marker, element, d.source, d.detail
        ));
    }

    if let Some(action) = &report.action {
        out.push_str(&format!(
            "\n=== Action: {} ===\n",
            action.element_id.as_deref().unwrap_or("-")
        ));
        if !action.value.is_null() {
            out.push_str(&format!("    returned: {}\n", action.value));
        }
        for change in &action.changes {
            out.push_str(&format!("    set {} = {}\n", change.id, change.value));
        }
        for note in &action.notifications {
            out.push_str(&format!("    notice: {}\n", note));
        }
    }

    if let Some(error) = &report.action_error {
        out.push_str(&format!("\n=== Action failed: {} ===\n", error));
    }

    out
}

fn format_element(el: &Element, id_width: usize) -> String {
    let mut flags = Vec::new();
    if !el.visible {
        flags.push("[hidden]".to_string());
    }
    if el.disabled {
        flags.push("[disabled]".to_string());
    }
    if el.capabilities().options {
        let labels: Vec<&str> = el.effective_options().iter().map(|o| o.label.as_str()).collect();
        flags.push(format!("{{{}}}", labels.join(", ")));
    }

    let line = format!(
        "  {:<id_width$}  {:<17}  {:<12}",
        el.id,
        el.element_type.as_str(),
        display_value(&el.value),
        id_width = id_width,
    );

    if flags.is_empty() {
        line.trim_end().to_string()
    } else {
        format!("{} {}", line, flags.join(" "))
    }
}
