use std::cell::Cell;

use rhai::{Array, Dynamic, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScriptError;
use crate::form::element_model::{Element, SelectOption};
use crate::form::snapshot::FormSnapshot;
use crate::form::values::{clamp_to_range, is_truthy, parse_options, values_equal};
use crate::hooks::hook_model::HookKind;
use crate::hooks::registry::{HookRegistry, ResolvedHooks};
use crate::script::compiler::{Callable, Invocation};
use crate::script::sandbox::{element_view, elements_view, from_dynamic, view_id, view_value};
use crate::trace::diagnostic::Diagnostic;
use crate::trace::sink::DiagnosticSink;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorConfig {
    /// Upper bound on fixed-point passes per evaluation
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

/// Result of evaluating one snapshot to a fixed point.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub snapshot: FormSnapshot,
    /// Passes run, including the final stable one
    pub passes: usize,
    pub converged: bool,
    /// Ids whose value was changed by `on_value_changed`, first change first
    pub changed: Vec<String>,
    /// Hook invocations that faulted and fell back to their default
    pub faults: usize,
}

pub struct BehaviorEvaluator {
    config: EvaluatorConfig,
}

impl BehaviorEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Evaluate every hook against `snapshot` until values stop changing.
    ///
    /// Each pass derives visibility, enablement and options from the state at
    /// the start of the pass, then runs `on_value_changed` in declared order
    /// against a working copy that already holds earlier writes from the same
    /// pass. A pass with no value change ends the loop. The input snapshot is
    /// never touched; the returned one is built from the working copy.
    pub fn evaluate(
        &self,
        snapshot: &FormSnapshot,
        registry: &mut HookRegistry,
        sink: &dyn DiagnosticSink,
    ) -> EvaluationOutcome {
        let hooks: Vec<ResolvedHooks> = snapshot
            .elements()
            .iter()
            .map(|el| registry.resolve(el, sink))
            .collect();

        let mut pass = PassState {
            engine: registry.engine(),
            sink,
            working: snapshot.elements().to_vec(),
            changed: Vec::new(),
            faults: Cell::new(0),
        };

        let max = self.config.max_iterations.max(1);
        let mut passes = 0;
        let mut converged = false;

        while passes < max {
            passes += 1;
            pass.derive(&hooks);
            if !pass.react(&hooks) {
                converged = true;
                break;
            }
            tracing::trace!(pass = passes, "values changed, re-evaluating");
        }

        if !converged {
            // The last pass wrote values after deriving; flags must match them.
            pass.derive(&hooks);
            sink.report(&Diagnostic::convergence_exceeded(max));
        }

        let PassState {
            working,
            changed,
            faults,
            ..
        } = pass;

        let evaluated = FormSnapshot::build(working, snapshot.initial().clone())
            .unwrap_or_else(|_| snapshot.clone());

        EvaluationOutcome {
            snapshot: evaluated,
            passes,
            converged,
            changed,
            faults: faults.get(),
        }
    }
}

struct PassState<'a> {
    engine: &'a Engine,
    sink: &'a dyn DiagnosticSink,
    working: Vec<Element>,
    changed: Vec<String>,
    faults: Cell<usize>,
}

impl PassState<'_> {
    /// Steps 1 and 2: visibility, enablement and options, all read from the
    /// state at the start of the pass.
    fn derive(&mut self, hooks: &[ResolvedHooks]) {
        let view = elements_view(&self.working);
        let mut derived = Vec::with_capacity(self.working.len());

        for (i, el) in self.working.iter().enumerate() {
            let caps = el.capabilities();

            let visible = match &hooks[i].show_if {
                Some(hook) => self
                    .run_hook(hook, &view, i, el, HookKind::ShowIf)
                    .map(|v| is_truthy(&v))
                    .unwrap_or(true),
                None => true,
            };

            let disabled = caps.read_only
                || match &hooks[i].disable_if {
                    Some(hook) => self
                        .run_hook(hook, &view, i, el, HookKind::DisableIf)
                        .map(|v| is_truthy(&v))
                        .unwrap_or(false),
                    None => false,
                };

            let options: Option<Vec<SelectOption>> = match &hooks[i].get_options {
                Some(hook) if caps.options => self
                    .run_hook(hook, &view, i, el, HookKind::GetOptions)
                    .and_then(|v| match parse_options(&v) {
                        Ok(options) => Some(options),
                        Err(e) => {
                            self.report_fault(&el.id, HookKind::GetOptions, &ScriptError::Result(e));
                            None
                        }
                    }),
                _ => None,
            };

            derived.push((visible, disabled, options));
        }

        for (el, (visible, disabled, options)) in self.working.iter_mut().zip(derived) {
            el.visible = visible;
            el.disabled = disabled;
            el.dynamic_options = options;
        }
    }

    /// Step 3: `on_value_changed` in declared order. Returns whether any
    /// value changed.
    fn react(&mut self, hooks: &[ResolvedHooks]) -> bool {
        let mut view = elements_view(&self.working);
        let mut dirty = false;

        for i in 0..self.working.len() {
            let Some(hook) = &hooks[i].on_value_changed else {
                continue;
            };

            let args = vec![Dynamic::from_array(view.clone()), view[i].clone()];
            let id = self.working[i].id.clone();

            let invocation = match hook.call(self.engine, args) {
                Ok(Some(inv)) => inv,
                Ok(None) => continue,
                Err(e) => {
                    self.report_fault(&id, HookKind::OnValueChanged, &e);
                    continue;
                }
            };

            let writes = match self.collect_writes(i, &view, invocation) {
                Ok(w) => w,
                Err(e) => {
                    self.report_fault(&id, HookKind::OnValueChanged, &e);
                    continue;
                }
            };

            for (idx, value) in writes {
                let value = clamp_to_range(&self.working[idx], value);
                if values_equal(&self.working[idx].value, &value) {
                    continue;
                }

                tracing::debug!(hook_owner = %id, element = %self.working[idx].id, %value, "hook changed value");
                self.working[idx].value = value;
                view[idx] = element_view(&self.working[idx]);
                if !self.changed.contains(&self.working[idx].id) {
                    self.changed.push(self.working[idx].id.clone());
                }
                dirty = true;
            }
        }

        dirty
    }

    /// Value writes made by one `on_value_changed` call, in apply order:
    /// `elements[..].value` edits, then `element.value`, then the result.
    fn collect_writes(
        &self,
        own: usize,
        view: &Array,
        inv: Invocation,
    ) -> Result<Vec<(usize, Value)>, ScriptError> {
        let mut writes = Vec::new();

        if let Some(after) = inv.scope.get_value::<Array>("elements") {
            for item in &after {
                let (Some(id), Some(value)) = (view_id(item), view_value(item)) else {
                    continue;
                };
                let Some(idx) = self.working.iter().position(|e| e.id == id) else {
                    continue;
                };
                let before = view_value(&view[idx]).unwrap_or(Value::Null);
                if !values_equal(&before, &value) {
                    writes.push((idx, value));
                }
            }
        }

        if let Some(after) = inv.scope.get_value::<Dynamic>("element") {
            if let Some(value) = view_value(&after) {
                if !values_equal(&self.working[own].value, &value) {
                    writes.push((own, value));
                }
            }
        }

        let result = from_dynamic(&inv.result).map_err(ScriptError::Result)?;
        if !result.is_null() {
            writes.push((own, result));
        }

        Ok(writes)
    }

    /// Run a pure hook; `None` means "use the default" (no-op or fault).
    fn run_hook(
        &self,
        hook: &Callable,
        view: &Array,
        idx: usize,
        el: &Element,
        kind: HookKind,
    ) -> Option<Value> {
        let args = vec![Dynamic::from_array(view.clone()), view[idx].clone()];
        match hook.call(self.engine, args) {
            Ok(Some(inv)) => match from_dynamic(&inv.result) {
                Ok(v) => Some(v),
                Err(e) => {
                    self.report_fault(&el.id, kind, &ScriptError::Result(e));
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.report_fault(&el.id, kind, &e);
                None
            }
        }
    }

    fn report_fault(&self, id: &str, kind: HookKind, err: &ScriptError) {
        self.faults.set(self.faults.get() + 1);
        self.sink.report(&Diagnostic::hook_fault(id, kind, err));
    }
}
