use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::action::capabilities::{Capabilities, HttpRequester, VariableMap};
use crate::action::runner::ActionRunner;
use crate::cli::config::AppConfig;
use crate::error::PanelError;
use crate::form::loader::load_definition;
use crate::form::values::parse_assignment;
use crate::panel::panel::FormPanel;
use crate::report::console::format_console_report;
use crate::report::report_model::FormReport;
use crate::trace::diagnostic::DiagnosticKind;
use crate::trace::logger::JsonlSink;
use crate::trace::sink::{CollectingSink, DiagnosticSink, FanoutSink, TracingSink};

// ============================================================================
// evaluate subcommand
// ============================================================================

pub fn cmd_evaluate(
    form: &str,
    sets: &[String],
    format: &str,
    config: &AppConfig,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let (collected, sink) = build_sinks(config, verbose);
    let mut panel = open_panel(form, config, sink)?;
    apply_sets(&mut panel, sets)?;

    let report = FormReport::from_panel(&panel, collected.drain());
    print!("{}", render(&report, format)?);
    Ok(())
}

// ============================================================================
// check subcommand
// ============================================================================

/// Compile every hook and action. Returns whether everything compiled.
pub fn cmd_check(
    form: &str,
    config: &AppConfig,
    verbose: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (collected, sink) = build_sinks(config, verbose);
    let panel = open_panel(form, config, sink)?;
    panel.check_actions();

    let diagnostics = collected.drain();
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::CompileError)
        .collect();

    if errors.is_empty() {
        println!(
            "{}: {} elements, {} hooks compiled, no errors",
            form,
            panel.elements().len(),
            panel.registry().compilations()
        );
        return Ok(true);
    }

    println!("{}: {} compile errors", form, errors.len());
    for d in errors {
        println!("  {}", d);
    }
    Ok(false)
}

// ============================================================================
// action subcommand
// ============================================================================

/// Run a button action and return whether it completed.
pub fn cmd_action(
    form: &str,
    button: &str,
    sets: &[String],
    vars: &[String],
    format: &str,
    config: &AppConfig,
    verbose: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (collected, sink) = build_sinks(config, verbose);
    let mut panel = open_panel(form, config, sink.clone())?;
    apply_sets(&mut panel, sets)?;

    let mut variables = config.variables.clone();
    variables.extend(parse_pairs(vars)?);
    let variables = Arc::new(VariableMap::new(variables));

    let request = panel.action_request(button)?;
    if verbose > 0 {
        let label = panel
            .button_label(button, variables.as_ref())
            .unwrap_or_else(|| button.to_string());
        eprintln!("Running action '{}'...", label);
    }

    let requester = HttpRequester::new(Duration::from_millis(config.requests.timeout_ms))?;
    let capabilities = Capabilities::new(Arc::new(requester), variables);
    let runner = ActionRunner::new(config.sandbox.clone(), sink);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(runner.run(request, capabilities));

    let (report, ok) = match result {
        Ok(outcome) => {
            panel.apply_action_outcome(&outcome);
            let report = FormReport::from_panel(&panel, collected.drain()).with_action(outcome);
            (report, true)
        }
        Err(fault) => {
            let report = FormReport::from_panel(&panel, collected.drain()).with_action_error(fault);
            (report, false)
        }
    };

    print!("{}", render(&report, format)?);
    Ok(ok)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Diagnostics are always collected for the report; they are also logged
/// when verbose and appended to the JSONL file when one is configured.
fn build_sinks(config: &AppConfig, verbose: u8) -> (Arc<CollectingSink>, Arc<dyn DiagnosticSink>) {
    let collected = Arc::new(CollectingSink::new());
    let mut fanout = FanoutSink::new().with(collected.clone());

    if verbose > 0 {
        fanout = fanout.with(Arc::new(TracingSink));
    }
    if let Some(path) = &config.diagnostics.log_file {
        fanout = fanout.with(Arc::new(JsonlSink::new(Path::new(path))));
    }

    (collected, Arc::new(fanout))
}

fn open_panel(
    form: &str,
    config: &AppConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<FormPanel, PanelError> {
    let definition = load_definition(Path::new(form))?;
    FormPanel::new(definition, &config.panel_settings(), sink)
}

/// Apply `id=value` edits one at a time, each followed by evaluation.
fn apply_sets(panel: &mut FormPanel, sets: &[String]) -> Result<(), PanelError> {
    for raw in sets {
        let (id, value) =
            parse_assignment(raw).ok_or_else(|| PanelError::InvalidArgument(raw.clone()))?;
        panel.set_value(&id, value)?;
    }
    Ok(())
}

fn render(report: &FormReport, format: &str) -> Result<String, Box<dyn std::error::Error>> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(report)? + "\n"),
        _ => Ok(format_console_report(report)),
    }
}

/// Parse `name=value` pairs into a map, e.g. for `--var`.
pub fn parse_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>, PanelError> {
    pairs
        .iter()
        .map(|raw| {
            raw.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| PanelError::InvalidArgument(raw.clone()))
        })
        .collect()
}
