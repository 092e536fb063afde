use std::collections::{HashMap, HashSet};

use rhai::Engine;

use crate::form::element_model::Element;
use crate::hooks::hook_model::HookKind;
use crate::script::compiler::{Callable, compile_or_noop};
use crate::script::sandbox::{SandboxLimits, build_engine};
use crate::trace::diagnostic::Diagnostic;
use crate::trace::sink::DiagnosticSink;

/// Compiled hooks for one element. `None` means the hook is not configured.
#[derive(Debug, Clone, Default)]
pub struct ResolvedHooks {
    pub show_if: Option<Callable>,
    pub disable_if: Option<Callable>,
    pub get_options: Option<Callable>,
    pub on_value_changed: Option<Callable>,
}

impl ResolvedHooks {
    pub fn get(&self, kind: HookKind) -> Option<&Callable> {
        match kind {
            HookKind::ShowIf => self.show_if.as_ref(),
            HookKind::DisableIf => self.disable_if.as_ref(),
            HookKind::GetOptions => self.get_options.as_ref(),
            HookKind::OnValueChanged => self.on_value_changed.as_ref(),
        }
    }

    fn slot(&mut self, kind: HookKind) -> &mut Option<Callable> {
        match kind {
            HookKind::ShowIf => &mut self.show_if,
            HookKind::DisableIf => &mut self.disable_if,
            HookKind::GetOptions => &mut self.get_options,
            HookKind::OnValueChanged => &mut self.on_value_changed,
        }
    }
}

struct CacheEntry {
    source: String,
    callable: Callable,
}

/// Owns the hook engine and a compile cache keyed by (element id, hook kind).
///
/// An entry is recompiled only when its source text changes, so repeated
/// evaluation of an unchanged form never recompiles. Failed compilations are
/// cached as no-ops, which keeps their error from being reported twice.
pub struct HookRegistry {
    engine: Engine,
    cache: HashMap<(String, HookKind), CacheEntry>,
    compilations: usize,
}

impl HookRegistry {
    pub fn new(limits: &SandboxLimits) -> Self {
        Self {
            engine: build_engine(limits),
            cache: HashMap::new(),
            compilations: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Number of compilations performed since creation.
    pub fn compilations(&self) -> usize {
        self.compilations
    }

    pub fn resolve(&mut self, element: &Element, sink: &dyn DiagnosticSink) -> ResolvedHooks {
        let mut resolved = ResolvedHooks::default();

        for kind in HookKind::ALL {
            let key = (element.id.clone(), kind);

            let Some(source) = element.hooks.source(kind) else {
                self.cache.remove(&key);
                continue;
            };

            let fresh = self.cache.get(&key).is_some_and(|e| e.source == source);
            if !fresh {
                let id = element.id.as_str();
                let callable = compile_or_noop(
                    &self.engine,
                    kind.params(),
                    source,
                    |e| Diagnostic::compile_error(id, kind, e),
                    sink,
                );
                self.compilations += 1;
                tracing::debug!(element = id, hook = %kind, ok = !callable.is_noop(), "compiled hook");

                self.cache.insert(
                    key.clone(),
                    CacheEntry {
                        source: source.to_string(),
                        callable,
                    },
                );
            }

            if let Some(entry) = self.cache.get(&key) {
                *resolved.slot(kind) = Some(entry.callable.clone());
            }
        }

        resolved
    }

    /// Drop cache entries for elements that no longer exist.
    pub fn retain_elements(&mut self, elements: &[Element]) {
        let live: HashSet<&str> = elements.iter().map(|e| e.id.as_str()).collect();
        self.cache.retain(|(id, _), _| live.contains(id.as_str()));
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
