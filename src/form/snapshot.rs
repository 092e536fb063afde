use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::PanelError;
use crate::form::element_model::{Element, FormDefinition};
use crate::form::values::clamp_to_range;

/// Immutable view of every element plus the initial values.
///
/// Snapshots are never edited in place; the `with_*` methods return a new
/// snapshot and leave the receiver untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSnapshot {
    elements: Vec<Element>,
    initial: BTreeMap<String, Value>,
}

impl FormSnapshot {
    /// Build a snapshot, rejecting duplicate ids.
    pub fn build(
        elements: Vec<Element>,
        initial: BTreeMap<String, Value>,
    ) -> Result<Self, PanelError> {
        let mut seen = HashSet::new();
        for el in &elements {
            if !seen.insert(el.id.as_str()) {
                return Err(PanelError::DuplicateElement(el.id.clone()));
            }
        }

        Ok(FormSnapshot { elements, initial })
    }

    /// Snapshot of a freshly loaded definition; its values become the
    /// initial values.
    pub fn from_definition(definition: FormDefinition) -> Result<Self, PanelError> {
        let initial = initial_values(&definition.elements);
        Self::build(definition.elements, initial)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn initial(&self) -> &BTreeMap<String, Value> {
        &self.initial
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    pub fn value_of(&self, id: &str) -> Option<&Value> {
        self.get(id).map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// New snapshot with one element's value replaced (clamped to its range).
    pub fn with_value(&self, id: &str, value: Value) -> Result<Self, PanelError> {
        let idx = self
            .position(id)
            .ok_or_else(|| PanelError::ElementNotFound(id.to_string()))?;

        let mut elements = self.elements.clone();
        let clamped = clamp_to_range(&elements[idx], value);
        elements[idx].value = clamped;

        Ok(FormSnapshot {
            elements,
            initial: self.initial.clone(),
        })
    }

    /// New snapshot with a whole element replaced, matched by id.
    pub fn with_element(&self, element: Element) -> Result<Self, PanelError> {
        let idx = self
            .position(&element.id)
            .ok_or_else(|| PanelError::ElementNotFound(element.id.clone()))?;

        let mut elements = self.elements.clone();
        elements[idx] = element;

        Ok(FormSnapshot {
            elements,
            initial: self.initial.clone(),
        })
    }

    /// New snapshot with several values applied in order. Unknown ids are
    /// skipped and returned so the caller can log them.
    pub fn with_values(&self, values: &BTreeMap<String, Value>) -> (Self, Vec<String>) {
        let mut elements = self.elements.clone();
        let mut unknown = Vec::new();

        for (id, value) in values {
            match elements.iter_mut().find(|e| &e.id == id) {
                Some(el) => el.value = clamp_to_range(el, value.clone()),
                None => unknown.push(id.clone()),
            }
        }

        (
            FormSnapshot {
                elements,
                initial: self.initial.clone(),
            },
            unknown,
        )
    }

    /// New snapshot whose initial values are replaced; element values are
    /// reset to them where present.
    pub fn with_initial(&self, initial: BTreeMap<String, Value>) -> (Self, Vec<String>) {
        let (mut snapshot, unknown) = self.with_values(&initial);
        snapshot.initial = initial;
        (snapshot, unknown)
    }
}

pub fn initial_values(elements: &[Element]) -> BTreeMap<String, Value> {
    elements
        .iter()
        .map(|e| (e.id.clone(), e.value.clone()))
        .collect()
}
