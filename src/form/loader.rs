use std::path::Path;

use crate::error::PanelError;
use crate::form::element_model::FormDefinition;

/// Load a form definition from a `.json`, `.yaml` or `.yml` file.
///
/// Anything that is not `.json` is parsed as YAML (YAML is a superset).
pub fn load_definition(path: &Path) -> Result<FormDefinition, PanelError> {
    let content = std::fs::read_to_string(path).map_err(|source| PanelError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        parse_definition_json(&content)
    } else {
        parse_definition_yaml(&content)
    }
}

pub fn parse_definition_yaml(content: &str) -> Result<FormDefinition, PanelError> {
    serde_yaml::from_str(content).map_err(|source| PanelError::Yaml {
        context: "form definition".into(),
        source,
    })
}

pub fn parse_definition_json(content: &str) -> Result<FormDefinition, PanelError> {
    serde_json::from_str(content).map_err(|source| PanelError::Json {
        context: "form definition".into(),
        source,
    })
}
