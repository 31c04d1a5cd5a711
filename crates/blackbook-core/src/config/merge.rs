//! Deep merge of configuration layers
//!
//! Layers are merged as generic JSON values so that YAML and TOML layers can
//! be mixed freely. Rules, applied recursively:
//!
//! 1. An explicit `null` in the override deletes the key.
//! 2. Two mappings merge key by key.
//! 3. Two non-empty sequences whose elements are all mappings carrying a
//!    reconciliation key (`id`, else `name`) merge element-wise by that key:
//!    base order first, then override-only elements in override order.
//! 4. Any other pair of sequences: the override replaces the base.
//! 5. Otherwise the override wins.

use serde_json::{Map, Value};

/// Merge `overlay` on top of `base`, returning the merged value.
///
/// Neither input is modified. `{}` is the identity on either side.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_val) in overlay_map {
                if overlay_val.is_null() {
                    merged.remove(key);
                    continue;
                }
                let value = match base_map.get(key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => without_nulls(overlay_val),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            match merge_keyed(base_items, overlay_items) {
                Some(merged) => Value::Array(merged),
                None => without_nulls(overlay),
            }
        }
        (_, overlay) => without_nulls(overlay),
    }
}

/// Fold any number of layers, in order, onto an empty mapping.
pub fn merge_layers<I>(layers: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    layers
        .into_iter()
        .fold(Value::Object(Map::new()), |acc, layer| deep_merge(&acc, &layer))
}

/// The reconciliation key of a sequence element: `id` if present, else `name`.
fn reconciliation_key(item: &Value) -> Option<&Value> {
    let map = item.as_object()?;
    map.get("id")
        .or_else(|| map.get("name"))
        .filter(|key| !key.is_null())
}

fn merge_keyed(base: &[Value], overlay: &[Value]) -> Option<Vec<Value>> {
    if base.is_empty() || overlay.is_empty() {
        return None;
    }
    if !base
        .iter()
        .chain(overlay)
        .all(|item| reconciliation_key(item).is_some())
    {
        return None;
    }

    let mut merged: Vec<Value> = Vec::with_capacity(base.len() + overlay.len());
    for item in base.iter().chain(overlay) {
        let key = reconciliation_key(item);
        match merged.iter_mut().find(|existing| reconciliation_key(existing) == key) {
            Some(existing) => *existing = deep_merge(existing, item),
            None => merged.push(without_nulls(item)),
        }
    }
    Some(merged)
}

/// Mapping entries whose value is `null` are dropped, at any depth,
/// including inside sequence elements.
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}
