use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::hook_model::HookKind;

/// One configured form control.
///
/// `visible` and `disabled` are derived state: the evaluator recomputes them
/// on every pass, so whatever a definition file carries for them is only the
/// value shown before the first evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Element {
    pub id: String,

    #[serde(rename = "type")]
    pub element_type: ElementType,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub value: Value,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default = "default_true")]
    pub visible: bool,

    /// Statically configured options (select, multiselect, radio)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,

    /// Options produced by the last `get_options` evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_options: Option<Vec<SelectOption>>,

    #[serde(default, skip_serializing_if = "CodeHooks::is_empty")]
    pub hooks: CodeHooks,

    /// Button action code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Button label template (interpolated with variables)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    /// Highlighting language for code elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Element {
    pub fn new(id: &str, element_type: ElementType) -> Self {
        Element {
            id: id.to_string(),
            element_type,
            title: String::new(),
            value: Value::Null,
            disabled: false,
            visible: true,
            options: Vec::new(),
            dynamic_options: None,
            hooks: CodeHooks::default(),
            action: None,
            label: None,
            min: None,
            max: None,
            step: None,
            language: None,
            tooltip: None,
            section: None,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_hook(mut self, kind: HookKind, source: &str) -> Self {
        self.hooks.set(kind, source);
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_action(mut self, code: &str) -> Self {
        self.action = Some(code.to_string());
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn capabilities(&self) -> TypeCapabilities {
        self.element_type.capabilities()
    }

    /// Options currently offered: the dynamic list when a hook produced one,
    /// otherwise the static configuration.
    pub fn effective_options(&self) -> &[SelectOption] {
        self.dynamic_options.as_deref().unwrap_or(&self.options)
    }
}

/// Closed set of element variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ElementType {
    Text,
    Number,
    Textarea,
    Code,
    Password,
    Color,
    Date,
    Datetime,
    Time,
    Slider,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Boolean,
    File,
    Button,
    Disabled,
    DisabledTextarea,
}

/// What a variant supports. Consumers branch on these flags rather than on
/// the variant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeCapabilities {
    /// Consumes an option list (`get_options` is evaluated)
    pub options: bool,
    /// Accepts user edits
    pub editable: bool,
    /// Display only; always reported disabled whatever `disable_if` says
    pub read_only: bool,
    /// Runs action code when activated
    pub action: bool,
    /// Honours min/max/step
    pub range: bool,
    /// Holds source code with a highlighting language
    pub code: bool,
}

impl ElementType {
    pub fn capabilities(self) -> TypeCapabilities {
        let editable = TypeCapabilities {
            editable: true,
            ..TypeCapabilities::default()
        };

        match self {
            ElementType::Select | ElementType::Multiselect | ElementType::Radio => {
                TypeCapabilities {
                    options: true,
                    ..editable
                }
            }
            ElementType::Number | ElementType::Slider => TypeCapabilities {
                range: true,
                ..editable
            },
            ElementType::Code => TypeCapabilities {
                code: true,
                ..editable
            },
            ElementType::Button => TypeCapabilities {
                action: true,
                ..TypeCapabilities::default()
            },
            ElementType::Disabled | ElementType::DisabledTextarea => TypeCapabilities {
                read_only: true,
                ..TypeCapabilities::default()
            },
            ElementType::Text
            | ElementType::Textarea
            | ElementType::Password
            | ElementType::Color
            | ElementType::Date
            | ElementType::Datetime
            | ElementType::Time
            | ElementType::Checkbox
            | ElementType::Boolean
            | ElementType::File => editable,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Text => "text",
            ElementType::Number => "number",
            ElementType::Textarea => "textarea",
            ElementType::Code => "code",
            ElementType::Password => "password",
            ElementType::Color => "color",
            ElementType::Date => "date",
            ElementType::Datetime => "datetime",
            ElementType::Time => "time",
            ElementType::Slider => "slider",
            ElementType::Select => "select",
            ElementType::Multiselect => "multiselect",
            ElementType::Radio => "radio",
            ElementType::Checkbox => "checkbox",
            ElementType::Boolean => "boolean",
            ElementType::File => "file",
            ElementType::Button => "button",
            ElementType::Disabled => "disabled",
            ElementType::DisabledTextarea => "disabled-textarea",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(label: &str, value: impl Into<Value>) -> Self {
        SelectOption {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

/// Source fragments attached to an element, one per hook kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeHooks {
    #[serde(default, alias = "showIf", skip_serializing_if = "Option::is_none")]
    pub show_if: Option<String>,

    #[serde(default, alias = "disableIf", skip_serializing_if = "Option::is_none")]
    pub disable_if: Option<String>,

    #[serde(default, alias = "getOptions", skip_serializing_if = "Option::is_none")]
    pub get_options: Option<String>,

    #[serde(
        default,
        alias = "onValueChanged",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_value_changed: Option<String>,
}

impl CodeHooks {
    /// Fragment for `kind`, or `None` when absent or blank.
    pub fn source(&self, kind: HookKind) -> Option<&str> {
        let raw = match kind {
            HookKind::ShowIf => &self.show_if,
            HookKind::DisableIf => &self.disable_if,
            HookKind::GetOptions => &self.get_options,
            HookKind::OnValueChanged => &self.on_value_changed,
        };
        raw.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn set(&mut self, kind: HookKind, source: &str) {
        let slot = match kind {
            HookKind::ShowIf => &mut self.show_if,
            HookKind::DisableIf => &mut self.disable_if,
            HookKind::GetOptions => &mut self.get_options,
            HookKind::OnValueChanged => &mut self.on_value_changed,
        };
        *slot = Some(source.to_string());
    }

    pub fn is_empty(&self) -> bool {
        HookKind::ALL.iter().all(|k| self.source(*k).is_none())
    }
}

/// Top-level form definition as loaded from YAML or JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormDefinition {
    #[serde(default)]
    pub title: Option<String>,

    pub elements: Vec<Element>,
}
