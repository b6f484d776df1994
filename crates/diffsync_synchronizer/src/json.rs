//! JSON merge-patch synchronizer (RFC 7386).

use crate::checksum::sha256_hex;
use diffsync_protocol::{ProtocolResult, Synchronizer};
use serde_json::{Map, Value};

/// Synchronizer for JSON content using merge patches.
///
/// A diff is `None` when nothing changed, otherwise the merge patch that
/// turns the source into the target. Merge patches cannot express "set
/// this member to `null`": a `null` member in the target document is
/// treated as a removal.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMergeSynchronizer;

impl JsonMergeSynchronizer {
    /// Creates a new JSON merge synchronizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn merge_patch(from: &Value, to: &Value) -> Option<Value> {
    if from == to {
        return None;
    }
    let (Value::Object(from), Value::Object(to)) = (from, to) else {
        return Some(to.clone());
    };

    let mut patch = Map::new();
    for key in from.keys() {
        if !to.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    for (key, target) in to {
        let member = match from.get(key) {
            Some(source) => merge_patch(source, target),
            None => Some(target.clone()),
        };
        if let Some(member) = member {
            patch.insert(key.clone(), member);
        }
    }
    Some(Value::Object(patch))
}

fn apply_merge(target: &Value, patch: &Value) -> Value {
    let Value::Object(patch) = patch else {
        return patch.clone();
    };
    let mut merged = match target {
        Value::Object(target) => target.clone(),
        _ => Map::new(),
    };
    for (key, member) in patch {
        if member.is_null() {
            merged.remove(key);
        } else {
            let current = merged.get(key).cloned().unwrap_or(Value::Null);
            merged.insert(key.clone(), apply_merge(&current, member));
        }
    }
    Value::Object(merged)
}

impl Synchronizer for JsonMergeSynchronizer {
    type Content = Value;
    type Diff = Option<Value>;

    fn diff_content(&self, from: &Value, to: &Value) -> Option<Value> {
        merge_patch(from, to)
    }

    fn patch_content(&self, diff: &Option<Value>, content: &Value) -> ProtocolResult<Value> {
        Ok(match diff {
            Some(patch) => apply_merge(content, patch),
            None => content.clone(),
        })
    }

    fn checksum(&self, content: &Value) -> String {
        sha256_hex(content.to_string().as_bytes())
    }

    fn is_unchanged(&self, diff: &Option<Value>) -> bool {
        diff.is_none()
    }
}
