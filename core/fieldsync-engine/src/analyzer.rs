//! Live/desired field comparison.
//!
//! Pure and synchronous: no I/O, no failure mode.

use fieldsync_types::{
    ConfigurationDifference, FieldConfiguration, FieldDescriptor, MatchAnalysis,
};
use serde_json::Value;

/// Property keys that change what a field can hold rather than how it looks.
const STRUCTURAL_PROPERTIES: &[&str] = &[
    "options",
    "min",
    "max",
    "rating",
    "range_customize",
    "table_id",
    "multiple",
    "back_field_name",
    "formula_expression",
    "auto_serial",
    "location",
];

/// Whether a differing property key is type-defining.
pub fn is_structural_property(key: &str) -> bool {
    STRUCTURAL_PROPERTIES.contains(&key)
}

/// Compares a live field against a desired configuration.
///
/// The UI type is compared only when the desired configuration sets one.
/// Properties are compared only for keys the desired configuration names;
/// keys the service adds on its own (option ids, colours, defaults) never
/// count as differences.
pub fn analyze(live: &FieldDescriptor, desired: &FieldConfiguration) -> MatchAnalysis {
    let mut differences = Vec::new();

    if live.type_code != desired.type_code {
        differences.push(
            ConfigurationDifference::critical(
                "type",
                Some(Value::from(live.type_code)),
                Some(Value::from(desired.type_code)),
            )
            .with_description(format!(
                "field type changes from {} to {}",
                live.field_type(),
                desired.field_type()
            )),
        );
    }

    // An empty desired UI type accepts whatever the service assigned.
    if !desired.ui_type.is_empty() && live.ui_type != desired.ui_type {
        differences.push(
            ConfigurationDifference::critical(
                "ui_type",
                Some(Value::from(live.ui_type.as_str())),
                Some(Value::from(desired.ui_type.as_str())),
            )
            .with_description(format!(
                "UI type changes from '{}' to '{}'",
                live.ui_type, desired.ui_type
            )),
        );
    }

    for (key, wanted) in &desired.properties {
        let current = live.properties.get(key);
        let matches = current.is_some_and(|current| value_matches(current, wanted));
        if matches || (current.is_none() && wanted.is_null()) {
            continue;
        }

        let path = format!("property.{key}");
        let diff = if is_structural_property(key) {
            ConfigurationDifference::critical(path, current.cloned(), Some(wanted.clone()))
        } else {
            ConfigurationDifference::minor(path, current.cloned(), Some(wanted.clone()))
        };
        differences.push(diff);
    }

    if let Some(wanted) = &desired.description {
        let current = live.description.as_deref().unwrap_or("").trim();
        if current != wanted.trim() {
            differences.push(ConfigurationDifference::minor(
                "description",
                live.description.clone().map(Value::from),
                Some(Value::from(wanted.as_str())),
            ));
        }
    }

    MatchAnalysis::from_differences(differences)
}

/// Recursive comparison where `wanted` may be a subset of `current`.
///
/// Objects match when every key of `wanted` matches in `current`; arrays
/// match element-wise and must have the same length. Integers compare
/// exactly; a float on either side compares by `f64` value, so `5` matches
/// `5.0`.
pub fn value_matches(current: &Value, wanted: &Value) -> bool {
    match (current, wanted) {
        (Value::Object(cur), Value::Object(want)) => want.iter().all(|(k, w)| match cur.get(k) {
            Some(c) => value_matches(c, w),
            None => w.is_null(),
        }),
        (Value::Array(cur), Value::Array(want)) => {
            cur.len() == want.len() && cur.iter().zip(want).all(|(c, w)| value_matches(c, w))
        }
        (Value::Number(cur), Value::Number(want)) => {
            if let (Some(c), Some(w)) = (cur.as_i64(), want.as_i64()) {
                return c == w;
            }
            if let (Some(c), Some(w)) = (cur.as_u64(), want.as_u64()) {
                return c == w;
            }
            if cur.is_f64() || want.is_f64() {
                return match (cur.as_f64(), want.as_f64()) {
                    (Some(c), Some(w)) => c == w,
                    _ => false,
                };
            }
            // One side above i64::MAX, the other negative.
            false
        }
        _ => current == wanted,
    }
}
