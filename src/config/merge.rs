//! Config layer merge.
//!
//! Tables merge key by key; arrays and scalars from the later layer replace
//! the earlier value. A `null` in a later layer is treated as "not set" and
//! keeps the earlier value.

use serde_json::Value;

/// Overlay `layer` onto `base` in place.
pub fn merge_into(base: &mut Value, layer: Value) {
    match (base, layer) {
        (_, Value::Null) => {}
        (Value::Object(table), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match table.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None if value.is_null() => {}
                    None => {
                        table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Merge two values; `overlay` wins on conflicts.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

/// Merge layers lowest precedence first.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    let mut merged = Value::Null;
    for layer in layers {
        merge_into(&mut merged, layer);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_overrides_builtin_scalar() {
        let result = deep_merge(
            json!({"max_concurrent_processes": 4}),
            json!({"max_concurrent_processes": 8}),
        );
        assert_eq!(result["max_concurrent_processes"], 8);
    }

    #[test]
    fn test_timeouts_merge_per_key() {
        let result = deep_merge(
            json!({"timeouts": {"lint_seconds": 60, "test_seconds": 300}}),
            json!({"timeouts": {"test_seconds": 900}}),
        );
        assert_eq!(result["timeouts"], json!({"lint_seconds": 60, "test_seconds": 900}));
    }

    #[test]
    fn test_excludes_replaced_not_appended() {
        let result = deep_merge(
            json!({"locate": {"max_depth": 3, "extra_excludes": ["docs", "scripts"]}}),
            json!({"locate": {"extra_excludes": ["vendor"]}}),
        );
        assert_eq!(result["locate"]["extra_excludes"], json!(["vendor"]));
        assert_eq!(result["locate"]["max_depth"], 3);
    }

    #[test]
    fn test_null_keeps_earlier_value() {
        let result = deep_merge(
            json!({"preferred": {"lint": "pylint"}}),
            json!({"preferred": {"lint": null, "test": null}}),
        );
        assert_eq!(result, json!({"preferred": {"lint": "pylint"}}));
    }

    #[test]
    fn test_cli_layer_wins() {
        let builtin = json!({"termination_grace_ms": 2000, "output_format": "standard"});
        let file = json!({"termination_grace_ms": 500, "output_format": "compact"});
        let cli = json!({"output_format": "standard"});

        let result = merge_layers(vec![builtin, file, cli]);
        assert_eq!(result["termination_grace_ms"], 500);
        assert_eq!(result["output_format"], "standard");
    }

    #[test]
    fn test_no_layers() {
        assert!(merge_layers(Vec::new()).is_null());
    }
}
