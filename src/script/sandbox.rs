use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Array, Dynamic, Engine, ImmutableString, Map};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::form::element_model::Element;

/// Resource limits applied to every script engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SandboxLimits {
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,

    #[serde(default = "default_max_function_expr_depth")]
    pub max_function_expr_depth: usize,

    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,

    #[serde(default = "default_max_collection_size")]
    pub max_array_size: usize,

    #[serde(default = "default_max_collection_size")]
    pub max_map_size: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_call_levels: default_max_call_levels(),
            max_expr_depth: default_max_expr_depth(),
            max_function_expr_depth: default_max_function_expr_depth(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_collection_size(),
            max_map_size: default_max_collection_size(),
        }
    }
}

fn default_max_operations() -> u64 { 100_000 }
fn default_max_call_levels() -> usize { 32 }
fn default_max_expr_depth() -> usize { 64 }
fn default_max_function_expr_depth() -> usize { 32 }
fn default_max_string_size() -> usize { 1024 * 1024 }
fn default_max_collection_size() -> usize { 10_000 }

/// Build a sandboxed engine.
///
/// Strict variables are on, so fragments can only name their declared
/// parameters, their own locals and the registered helpers. Modules are
/// unavailable (`import` disabled, dummy resolver) and `eval` is disabled.
pub fn build_engine(limits: &SandboxLimits) -> Engine {
    let mut engine = Engine::new();

    engine
        .set_strict_variables(true)
        .set_max_operations(limits.max_operations)
        .set_max_call_levels(limits.max_call_levels)
        .set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth)
        .set_max_string_size(limits.max_string_size)
        .set_max_array_size(limits.max_array_size)
        .set_max_map_size(limits.max_map_size);

    // No file access: `import` is rejected at compile time and the
    // resolver finds nothing even if a module path reaches it.
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("import");
    engine.disable_symbol("eval");

    engine.on_print(|text| tracing::debug!(target: "form_panel::script", "{}", text));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(target: "form_panel::script", source = source.unwrap_or("-"), %pos, "{}", text)
    });

    register_helpers(&mut engine);
    engine
}

fn register_helpers(engine: &mut Engine) {
    engine.register_fn("find_element", |elements: &mut Array, id: ImmutableString| {
        find_by_id(elements, id.as_str()).unwrap_or(Dynamic::UNIT)
    });

    engine.register_fn("value_of", |elements: &mut Array, id: ImmutableString| {
        find_by_id(elements, id.as_str())
            .and_then(|el| el.read_lock::<Map>().and_then(|m| m.get("value").cloned()))
            .unwrap_or(Dynamic::UNIT)
    });
}

fn find_by_id(elements: &Array, id: &str) -> Option<Dynamic> {
    elements
        .iter()
        .find(|el| view_id(el).as_deref() == Some(id))
        .cloned()
}

/// `id` field of an element view, if the item is an element map.
pub fn view_id(item: &Dynamic) -> Option<String> {
    let map = item.read_lock::<Map>()?;
    map.get("id")?.clone().into_string().ok()
}

/// `value` field of an element view, converted back to JSON.
pub fn view_value(item: &Dynamic) -> Option<Value> {
    let value = item.read_lock::<Map>()?.get("value")?.clone();
    from_dynamic(&value).ok()
}

/// The script-facing shape of an element.
pub fn element_view(el: &Element) -> Dynamic {
    let options: Vec<Value> = el
        .effective_options()
        .iter()
        .map(|o| json!({ "label": o.label, "value": o.value }))
        .collect();

    to_dynamic(&json!({
        "id": el.id,
        "type": el.element_type.as_str(),
        "title": el.title,
        "value": el.value,
        "disabled": el.disabled,
        "visible": el.visible,
        "options": options,
    }))
}

pub fn elements_view(elements: &[Element]) -> Array {
    elements.iter().map(element_view).collect()
}

pub fn to_dynamic(value: &Value) -> Dynamic {
    match rhai::serde::to_dynamic(value) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("could not convert value for script: {}", e);
            Dynamic::UNIT
        }
    }
}

pub fn from_dynamic(value: &Dynamic) -> Result<Value, String> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    rhai::serde::from_dynamic::<Value>(value)
        .map_err(|e| format!("cannot convert {} result: {}", value.type_name(), e))
}
