use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::evaluator::evaluator::EvaluatorConfig;
use crate::panel::panel::PanelSettings;
use crate::script::sandbox::SandboxLimits;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-panel",
    version,
    about = "Evaluate dynamic form definitions and run their button actions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-panel.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Override evaluator.max_iterations
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Append diagnostics as JSON lines to this file
    #[arg(long, global = true)]
    pub diagnostics_log: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a form definition and print the resulting element states
    Evaluate {
        /// Form definition (YAML or JSON)
        #[arg(long)]
        form: String,

        /// Value edits applied in order, as id=value (value parsed as JSON when possible)
        #[arg(long = "set")]
        sets: Vec<String>,

        /// Output format: console, json
        #[arg(long, default_value = "console")]
        format: String,
    },

    /// Compile every hook and action and report compile errors
    Check {
        /// Form definition (YAML or JSON)
        #[arg(long)]
        form: String,
    },

    /// Run a button's action, then print the re-evaluated form
    Action {
        /// Form definition (YAML or JSON)
        #[arg(long)]
        form: String,

        /// Button element id
        #[arg(long)]
        button: String,

        /// Value edits applied before the action, as id=value
        #[arg(long = "set")]
        sets: Vec<String>,

        /// Extra template variables, as name=value
        #[arg(long = "var")]
        vars: Vec<String>,

        /// Output format: console, json
        #[arg(long, default_value = "console")]
        format: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-panel.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub sandbox: SandboxLimits,
    #[serde(default)]
    pub requests: RequestConfig,
    /// Template variables for button labels and `replace_variables`
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiagnosticsConfig {
    pub log_file: Option<String>,
}

// Serde default helpers
fn default_timeout_ms() -> u64 { 10_000 }

impl AppConfig {
    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            evaluator: self.evaluator.clone(),
            sandbox: self.sandbox.clone(),
        }
    }

    /// Apply CLI overrides on top of the file values.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(n) = cli.max_iterations {
            self.evaluator.max_iterations = n;
        }
        if let Some(path) = &cli.diagnostics_log {
            self.diagnostics.log_file = Some(path.clone());
        }
        self
    }
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-panel.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("ignoring malformed config {}: {}", config_path, e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Log filter for a `-v` count, used when `RUST_LOG` is not set.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
