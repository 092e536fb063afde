use std::sync::Arc;

use form_panel::form::element_model::{Element, ElementType, FormDefinition};
use form_panel::panel::panel::{FormPanel, PanelSettings};
use form_panel::script::sandbox::SandboxLimits;
use form_panel::trace::sink::CollectingSink;

/// Panel over `elements` with default settings and a collecting sink.
pub fn panel(elements: Vec<Element>) -> (FormPanel, Arc<CollectingSink>) {
    panel_with(elements, PanelSettings::default())
}

pub fn panel_with(elements: Vec<Element>, settings: PanelSettings) -> (FormPanel, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let definition = FormDefinition {
        title: Some("Test form".into()),
        elements,
    };
    let panel = FormPanel::new(definition, &settings, sink.clone()).expect("valid form");
    (panel, sink)
}

/// Settings with a small operation budget so runaway scripts fail fast.
pub fn tight_settings(max_operations: u64) -> PanelSettings {
    PanelSettings {
        sandbox: SandboxLimits {
            max_operations,
            ..SandboxLimits::default()
        },
        ..PanelSettings::default()
    }
}

pub fn number(id: &str, value: i64) -> Element {
    Element::new(id, ElementType::Number).with_value(value)
}

pub fn text(id: &str, value: &str) -> Element {
    Element::new(id, ElementType::Text).with_value(value)
}
