use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::hooks::hook_model::HookKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    CompileError,
    HookRuntimeFault,
    ConvergenceExceeded,
    ActionRuntimeFault,
}

/// Where a diagnostic came from: a behavior hook or a button action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSource {
    Hook(HookKind),
    Action,
    Evaluator,
}

impl fmt::Display for DiagnosticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSource::Hook(kind) => write!(f, "{}", kind),
            DiagnosticSource::Action => write!(f, "action"),
            DiagnosticSource::Evaluator => write!(f, "evaluator"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub timestamp_ms: u128,
    pub kind: DiagnosticKind,
    pub element_id: Option<String>,
    pub source: DiagnosticSource,
    pub detail: String,
}

impl Diagnostic {
    pub fn now(kind: DiagnosticKind, source: DiagnosticSource) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            kind,
            element_id: None,
            source,
            detail: String::new(),
        }
    }

    pub fn compile_error(element_id: &str, hook: HookKind, detail: impl ToString) -> Self {
        Self::now(DiagnosticKind::CompileError, DiagnosticSource::Hook(hook))
            .with_element(element_id)
            .with_detail(detail)
    }

    pub fn action_compile_error(element_id: &str, detail: impl ToString) -> Self {
        Self::now(DiagnosticKind::CompileError, DiagnosticSource::Action)
            .with_element(element_id)
            .with_detail(detail)
    }

    pub fn hook_fault(element_id: &str, hook: HookKind, detail: impl ToString) -> Self {
        Self::now(DiagnosticKind::HookRuntimeFault, DiagnosticSource::Hook(hook))
            .with_element(element_id)
            .with_detail(detail)
    }

    pub fn convergence_exceeded(max_iterations: usize) -> Self {
        Self::now(DiagnosticKind::ConvergenceExceeded, DiagnosticSource::Evaluator).with_detail(
            format!("no fixed point after {} passes, keeping last state", max_iterations),
        )
    }

    pub fn action_fault(element_id: Option<&str>, detail: impl ToString) -> Self {
        let mut d = Self::now(DiagnosticKind::ActionRuntimeFault, DiagnosticSource::Action)
            .with_detail(detail);
        d.element_id = element_id.map(str::to_string);
        d
    }

    pub fn with_element(mut self, element_id: &str) -> Self {
        self.element_id = Some(element_id.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = detail.to_string();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element_id {
            Some(id) => write!(f, "[{:?}] {} ({}): {}", self.kind, id, self.source, self.detail),
            None => write!(f, "[{:?}] {}: {}", self.kind, self.source, self.detail),
        }
    }
}
