use serde::Serialize;

use crate::action::runner::ActionOutcome;
use crate::form::element_model::Element;
use crate::panel::panel::{EvaluationStats, FormPanel};
use crate::trace::diagnostic::{Diagnostic, DiagnosticKind};

// ============================================================================
// Form report: evaluated elements plus what went wrong on the way
// ============================================================================

/// Everything a reporter needs to render one evaluated form.
///
/// Built from a `FormPanel` via `from_panel()`. Consumed by the console
/// reporter and serialized as-is for `--format json`.
#[derive(Debug, Clone, Serialize)]
pub struct FormReport {
    /// Form title, if the definition has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Stats of the evaluation behind `elements`
    pub evaluation: EvaluationStats,

    /// Elements with derived visibility, enablement and options applied
    pub elements: Vec<Element>,

    /// Diagnostics collected while loading and evaluating
    pub diagnostics: Vec<Diagnostic>,

    /// Outcome of a button action, when one was run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionOutcome>,

    /// Fault message of a failed action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_error: Option<String>,
}

impl FormReport {
    pub fn from_panel(panel: &FormPanel, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            title: panel.title().map(str::to_string),
            evaluation: panel.stats().clone(),
            elements: panel.elements().to_vec(),
            diagnostics,
            action: None,
            action_error: None,
        }
    }

    pub fn with_action(mut self, outcome: ActionOutcome) -> Self {
        self.action = Some(outcome);
        self
    }

    pub fn with_action_error(mut self, error: impl ToString) -> Self {
        self.action_error = Some(error.to_string());
        self
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// No compile errors and no failed action.
    pub fn is_clean(&self) -> bool {
        self.count(DiagnosticKind::CompileError) == 0 && self.action_error.is_none()
    }
}
