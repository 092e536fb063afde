use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::capabilities::VariableInterpolator;
use crate::action::runner::{ActionOutcome, ActionRequest};
use crate::error::PanelError;
use crate::evaluator::evaluator::{BehaviorEvaluator, EvaluationOutcome, EvaluatorConfig};
use crate::form::diff::{SnapshotDiff, ValueChange, changed_from_initial, diff};
use crate::form::element_model::{Element, FormDefinition};
use crate::form::snapshot::FormSnapshot;
use crate::hooks::hook_model::ACTION_PARAMS;
use crate::hooks::registry::HookRegistry;
use crate::script::compiler::compile;
use crate::script::sandbox::SandboxLimits;
use crate::trace::diagnostic::Diagnostic;
use crate::trace::sink::DiagnosticSink;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PanelSettings {
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    #[serde(default)]
    pub sandbox: SandboxLimits,
}

/// Summary of the evaluation behind the currently published snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationStats {
    pub passes: usize,
    pub converged: bool,
    pub changed: Vec<String>,
    pub faults: usize,
}

impl From<&EvaluationOutcome> for EvaluationStats {
    fn from(outcome: &EvaluationOutcome) -> Self {
        Self {
            passes: outcome.passes,
            converged: outcome.converged,
            changed: outcome.changed.clone(),
            faults: outcome.faults,
        }
    }
}

/// Host-facing form state.
///
/// Every mutation builds a new snapshot, evaluates it to a fixed point and
/// only then replaces the published one, so readers never see a half
/// evaluated form. Methods take `&mut self`, which keeps evaluation passes
/// strictly sequential.
pub struct FormPanel {
    title: Option<String>,
    registry: HookRegistry,
    evaluator: BehaviorEvaluator,
    sink: Arc<dyn DiagnosticSink>,
    published: FormSnapshot,
    stats: EvaluationStats,
}

impl FormPanel {
    pub fn new(
        definition: FormDefinition,
        settings: &PanelSettings,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, PanelError> {
        let title = definition.title.clone();
        let snapshot = FormSnapshot::from_definition(definition)?;
        let mut panel = Self::from_snapshot(snapshot, settings, sink);
        panel.title = title;
        Ok(panel)
    }

    pub fn from_snapshot(
        snapshot: FormSnapshot,
        settings: &PanelSettings,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let mut panel = Self {
            title: None,
            registry: HookRegistry::new(&settings.sandbox),
            evaluator: BehaviorEvaluator::new(settings.evaluator.clone()),
            sink,
            published: snapshot.clone(),
            stats: EvaluationStats::default(),
        };
        panel.publish(snapshot);
        panel
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn snapshot(&self) -> &FormSnapshot {
        &self.published
    }

    pub fn elements(&self) -> &[Element] {
        self.published.elements()
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.published.get(id)
    }

    pub fn stats(&self) -> &EvaluationStats {
        &self.stats
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// A user edit on one element.
    pub fn set_value(&mut self, id: &str, value: Value) -> Result<SnapshotDiff, PanelError> {
        let next = self.published.with_value(id, value)?;
        Ok(self.publish(next))
    }

    /// The render boundary's `onChange(newElement)`: a widget hands back a
    /// whole element, which may also carry edited hook sources.
    pub fn replace_element(&mut self, element: Element) -> Result<SnapshotDiff, PanelError> {
        let next = self.published.with_element(element)?;
        Ok(self.publish(next))
    }

    /// External data update. Unknown ids are ignored.
    pub fn refresh(&mut self, values: &BTreeMap<String, Value>) -> SnapshotDiff {
        let (next, unknown) = self.published.with_values(values);
        if !unknown.is_empty() {
            tracing::debug!(?unknown, "refresh ignored unknown elements");
        }
        self.publish(next)
    }

    /// Replace the initial values (e.g. after an initial data request) and
    /// reset element values to them.
    pub fn load_initial(&mut self, initial: BTreeMap<String, Value>) -> SnapshotDiff {
        let (next, unknown) = self.published.with_initial(initial);
        if !unknown.is_empty() {
            tracing::debug!(?unknown, "initial values for unknown elements");
        }
        self.publish(next)
    }

    /// Restore every element to its initial value.
    pub fn reset(&mut self) -> SnapshotDiff {
        let initial = self.published.initial().clone();
        let (next, _) = self.published.with_values(&initial);
        self.publish(next)
    }

    /// Elements whose value differs from the initial value.
    pub fn changed_values(&self) -> Vec<ValueChange> {
        changed_from_initial(&self.published)
    }

    /// Build the one-shot request for activating a button.
    pub fn action_request(&self, button_id: &str) -> Result<ActionRequest, PanelError> {
        let el = self
            .published
            .get(button_id)
            .ok_or_else(|| PanelError::ElementNotFound(button_id.to_string()))?;

        if !el.capabilities().action {
            return Err(PanelError::NotAButton(button_id.to_string()));
        }

        Ok(ActionRequest {
            element_id: Some(button_id.to_string()),
            code: el.action.clone().unwrap_or_default(),
            elements: self.published.elements().to_vec(),
            initial: self.published.initial().clone(),
        })
    }

    /// Feed an action's value edits back in as ordinary value changes.
    ///
    /// Edits for elements that no longer exist are dropped. Outcomes are
    /// applied in the order they are handed in, so when two actions touch
    /// the same element the one applied last wins.
    pub fn apply_action_outcome(&mut self, outcome: &ActionOutcome) -> SnapshotDiff {
        let mut values = BTreeMap::new();
        for change in &outcome.changes {
            if self.published.get(&change.id).is_some() {
                values.insert(change.id.clone(), change.value.clone());
            } else {
                tracing::debug!(element = %change.id, "dropping action change for removed element");
            }
        }

        if values.is_empty() {
            return SnapshotDiff::default();
        }
        self.refresh(&values)
    }

    /// Compile every button's action without running it. Compile errors go
    /// to the sink; returns how many actions failed to compile.
    pub fn check_actions(&self) -> usize {
        let mut failed = 0;
        for el in self.published.elements() {
            let Some(code) = el.action.as_deref().filter(|c| !c.trim().is_empty()) else {
                continue;
            };
            if let Err(e) = compile(self.registry.engine(), ACTION_PARAMS, code) {
                self.sink.report(&Diagnostic::action_compile_error(&el.id, &e));
                failed += 1;
            }
        }
        failed
    }

    /// Button label with variables interpolated; falls back to the title.
    pub fn button_label(&self, id: &str, variables: &dyn VariableInterpolator) -> Option<String> {
        let el = self.published.get(id)?;
        let template = el.label.as_deref().unwrap_or(&el.title);
        Some(variables.replace(template))
    }

    fn publish(&mut self, next: FormSnapshot) -> SnapshotDiff {
        self.registry.retain_elements(next.elements());
        let outcome = self
            .evaluator
            .evaluate(&next, &mut self.registry, self.sink.as_ref());

        let changes = diff(&self.published, &outcome.snapshot);
        tracing::debug!(
            passes = outcome.passes,
            converged = outcome.converged,
            values = changes.values.len(),
            shown = changes.shown.len(),
            hidden = changes.hidden.len(),
            "published snapshot"
        );

        self.stats = EvaluationStats::from(&outcome);
        self.published = outcome.snapshot;
        changes
    }
}
