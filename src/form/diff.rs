use serde::Serialize;
use serde_json::Value;

use crate::form::snapshot::FormSnapshot;
use crate::form::values::values_equal;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub id: String,
    pub before: Value,
    pub after: Value,
}

/// What changed between two published snapshots.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SnapshotDiff {
    pub values: Vec<ValueChange>,
    pub shown: Vec<String>,
    pub hidden: Vec<String>,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub options: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.shown.is_empty()
            && self.hidden.is_empty()
            && self.enabled.is_empty()
            && self.disabled.is_empty()
            && self.options.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}

pub fn diff(before: &FormSnapshot, after: &FormSnapshot) -> SnapshotDiff {
    let mut out = SnapshotDiff::default();

    for el in after.elements() {
        let Some(prev) = before.get(&el.id) else {
            out.added.push(el.id.clone());
            continue;
        };

        if !values_equal(&prev.value, &el.value) {
            out.values.push(ValueChange {
                id: el.id.clone(),
                before: prev.value.clone(),
                after: el.value.clone(),
            });
        }

        match (prev.visible, el.visible) {
            (false, true) => out.shown.push(el.id.clone()),
            (true, false) => out.hidden.push(el.id.clone()),
            _ => {}
        }

        match (prev.disabled, el.disabled) {
            (true, false) => out.enabled.push(el.id.clone()),
            (false, true) => out.disabled.push(el.id.clone()),
            _ => {}
        }

        if prev.effective_options() != el.effective_options() {
            out.options.push(el.id.clone());
        }
    }

    out.removed = before
        .elements()
        .iter()
        .filter(|e| after.get(&e.id).is_none())
        .map(|e| e.id.clone())
        .collect();

    out
}

/// Elements whose current value differs from their initial value.
pub fn changed_from_initial(snapshot: &FormSnapshot) -> Vec<ValueChange> {
    snapshot
        .elements()
        .iter()
        .filter_map(|el| {
            let initial = snapshot.initial().get(&el.id).cloned().unwrap_or(Value::Null);
            if values_equal(&initial, &el.value) {
                None
            } else {
                Some(ValueChange {
                    id: el.id.clone(),
                    before: initial,
                    after: el.value.clone(),
                })
            }
        })
        .collect()
}
