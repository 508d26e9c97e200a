//! Corrections for known defects in published API descriptions.
//!
//! Fixups run on the untyped document, before it is deserialized into `openapiv3` types, so a
//! defect that would make typing fail can still be repaired.

use serde_json::Value;

/// Apply every fixup to `doc` and return how many values were changed.
pub fn normalize_document(doc: &mut Value) -> usize {
    let mut fixed = 0;
    fix_bool_types(doc, &mut fixed);
    fixed
}

/// The community Twitch description spells some schema types `Bool`.
fn fix_bool_types(value: &mut Value, fixed: &mut usize) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == "type"
                    && let Value::String(t) = child
                    && matches!(t.as_str(), "Bool" | "bool")
                {
                    *child = Value::String("boolean".to_string());
                    *fixed += 1;
                } else {
                    fix_bool_types(child, fixed);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                fix_bool_types(item, fixed);
            }
        }
        _ => {}
    }
}
