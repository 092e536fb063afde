use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters every behavior hook receives, in call order.
pub const HOOK_PARAMS: &[&str] = &["elements", "element"];

/// Parameters a button action receives, in call order.
pub const ACTION_PARAMS: &[&str] = &["code", "elements", "initial"];

/// The fixed set of behavior hooks an element can carry.
///
/// | Hook             | Returns                   | Default when absent/invalid |
/// |------------------|---------------------------|-----------------------------|
/// | `show_if`        | truthy value              | `true`                      |
/// | `disable_if`     | truthy value              | `false`                     |
/// | `get_options`    | array of options          | static options              |
/// | `on_value_changed` | new value or `()`       | no change                   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    ShowIf,
    DisableIf,
    GetOptions,
    OnValueChanged,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::ShowIf,
        HookKind::DisableIf,
        HookKind::GetOptions,
        HookKind::OnValueChanged,
    ];

    pub fn params(self) -> &'static [&'static str] {
        HOOK_PARAMS
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::ShowIf => "show_if",
            HookKind::DisableIf => "disable_if",
            HookKind::GetOptions => "get_options",
            HookKind::OnValueChanged => "on_value_changed",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
