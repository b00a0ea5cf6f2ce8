//! Layer merging
//!
//! Objects merge by key, recursively. Arrays and scalars from the overlay
//! replace the base value outright.

use serde_json::Value;

/// Apply `layer` on top of `base` in place.
pub fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

/// Merge layers in precedence order (first lowest).
pub fn overlay_all(layers: impl IntoIterator<Item = Value>) -> Value {
    let mut merged = Value::Null;
    for layer in layers {
        overlay(&mut merged, layer);
    }
    merged
}
