use thiserror::Error;

/// Errors surfaced by fallible panel operations (loading, lookups, I/O).
///
/// Script failures never show up here: compile errors and hook faults are
/// contained by the evaluator and reported through a `DiagnosticSink`.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Form definition file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Form definition was not valid YAML
    #[error("YAML parse error ({context}): {source}")]
    Yaml {
        context: String,
        source: serde_yaml::Error,
    },

    /// JSON parsing or serialization failed
    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// Two elements share the same id
    #[error("duplicate element id '{0}'")]
    DuplicateElement(String),

    /// Element id not present in the current form
    #[error("element '{0}' not found")]
    ElementNotFound(String),

    /// Element exists but is not a button
    #[error("element '{0}' is not a button")]
    NotAButton(String),

    /// Request capability failed
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Malformed `id=value` style argument
    #[error("invalid argument '{0}', expected name=value")]
    InvalidArgument(String),
}

/// Failure produced by the script layer for a single fragment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScriptError {
    #[error("compile error{}: {message}", format_position(*line, *column))]
    Compile {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    #[error("runtime error{}: {message}", format_position(*line, *column))]
    Runtime {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// Fragment ran but produced a value of the wrong shape for its hook
    #[error("unexpected result: {0}")]
    Result(String),
}

fn format_position(line: Option<usize>, column: Option<usize>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!(" at line {}, column {}", l, c),
        (Some(l), None) => format!(" at line {}", l),
        _ => String::new(),
    }
}
