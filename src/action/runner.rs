use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::action::capabilities::{Capabilities, HttpRequest};
use crate::error::ScriptError;
use crate::form::element_model::Element;
use crate::form::values::values_equal;
use crate::hooks::hook_model::ACTION_PARAMS;
use crate::script::compiler::compile;
use crate::script::sandbox::{
    SandboxLimits, build_engine, elements_view, from_dynamic, to_dynamic, view_id, view_value,
};
use crate::trace::diagnostic::Diagnostic;
use crate::trace::sink::DiagnosticSink;

/// One button activation. Built by the panel, consumed by a single run.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// Button that triggered the action, if any
    pub element_id: Option<String>,
    pub code: String,
    pub elements: Vec<Element>,
    pub initial: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAssignment {
    pub id: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub element_id: Option<String>,
    /// Whatever the action code returned (`null` for nothing)
    pub value: Value,
    /// `elements[..].value` edits made by the action
    pub changes: Vec<ValueAssignment>,
    /// Messages passed to `notify`
    pub notifications: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionFault {
    #[error("action code does not compile: {0}")]
    Compile(ScriptError),

    #[error("action failed: {0}")]
    Runtime(ScriptError),

    #[error("action task failed: {0}")]
    Task(String),
}

/// Runs button actions.
///
/// Every run gets its own engine with the capabilities registered, so two
/// runs share nothing and may proceed concurrently.
#[derive(Clone)]
pub struct ActionRunner {
    limits: SandboxLimits,
    sink: Arc<dyn DiagnosticSink>,
}

impl ActionRunner {
    pub fn new(limits: SandboxLimits, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { limits, sink }
    }

    /// Run the action on the blocking pool and await it.
    ///
    /// Faults are reported to the sink and returned; they never panic or
    /// abort the caller.
    pub async fn run(
        &self,
        request: ActionRequest,
        capabilities: Capabilities,
    ) -> Result<ActionOutcome, ActionFault> {
        let limits = self.limits.clone();
        let element_id = request.element_id.clone();

        let joined =
            tokio::task::spawn_blocking(move || execute(&limits, request, capabilities)).await;

        let result = match joined {
            Ok(r) => r,
            Err(e) => Err(ActionFault::Task(e.to_string())),
        };
        self.report(element_id.as_deref(), &result);
        result
    }

    /// Same as [`ActionRunner::run`] but on the calling thread.
    pub fn run_blocking(
        &self,
        request: ActionRequest,
        capabilities: Capabilities,
    ) -> Result<ActionOutcome, ActionFault> {
        let element_id = request.element_id.clone();
        let result = execute(&self.limits, request, capabilities);
        self.report(element_id.as_deref(), &result);
        result
    }

    fn report(&self, element_id: Option<&str>, result: &Result<ActionOutcome, ActionFault>) {
        match result {
            Ok(outcome) => tracing::info!(
                element = element_id.unwrap_or("-"),
                changes = outcome.changes.len(),
                "action completed"
            ),
            Err(fault) => self.sink.report(&Diagnostic::action_fault(element_id, fault)),
        }
    }
}

fn execute(
    limits: &SandboxLimits,
    request: ActionRequest,
    capabilities: Capabilities,
) -> Result<ActionOutcome, ActionFault> {
    let notifications = Arc::new(Mutex::new(Vec::new()));

    let mut engine = build_engine(limits);
    register_capabilities(&mut engine, &capabilities, notifications.clone());

    let script = compile(&engine, ACTION_PARAMS, &request.code).map_err(ActionFault::Compile)?;

    let view = elements_view(&request.elements);
    let initial = request
        .initial
        .iter()
        .map(|(k, v)| (k.as_str().into(), to_dynamic(v)))
        .collect::<Map>();

    let args = vec![
        Dynamic::from(request.code.clone()),
        Dynamic::from_array(view),
        Dynamic::from_map(initial),
    ];

    let inv = script.invoke(&engine, args).map_err(ActionFault::Runtime)?;

    let value = from_dynamic(&inv.result)
        .map_err(|e| ActionFault::Runtime(ScriptError::Result(e)))?;

    let changes = inv
        .scope
        .get_value::<Array>("elements")
        .map(|after| value_changes(&request.elements, &after))
        .unwrap_or_default();

    let notifications = match notifications.lock() {
        Ok(n) => n.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };

    Ok(ActionOutcome {
        element_id: request.element_id,
        value,
        changes,
        notifications,
    })
}

fn value_changes(before: &[Element], after: &Array) -> Vec<ValueAssignment> {
    after
        .iter()
        .filter_map(|item| {
            let id = view_id(item)?;
            let value = view_value(item)?;
            let prev = before.iter().find(|e| e.id == id)?;
            (!values_equal(&prev.value, &value)).then_some(ValueAssignment { id, value })
        })
        .collect()
}

fn register_capabilities(
    engine: &mut Engine,
    capabilities: &Capabilities,
    notifications: Arc<Mutex<Vec<String>>>,
) {
    let requester = capabilities.requester.clone();
    engine.register_fn(
        "perform_request",
        move |request: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let request: HttpRequest = rhai::serde::from_dynamic(&Dynamic::from_map(request))?;
            let response = requester.perform(&request).map_err(|e| e.to_string())?;
            rhai::serde::to_dynamic(&response)
        },
    );

    let requester = capabilities.requester.clone();
    engine.register_fn(
        "perform_request",
        move |url: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let response = requester
                .perform(&HttpRequest::get(url.as_str()))
                .map_err(|e| e.to_string())?;
            rhai::serde::to_dynamic(&response)
        },
    );

    let variables = capabilities.variables.clone();
    engine.register_fn("replace_variables", move |template: ImmutableString| {
        variables.replace(template.as_str())
    });

    engine.register_fn("notify", move |message: ImmutableString| {
        match notifications.lock() {
            Ok(mut n) => n.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    });
}
