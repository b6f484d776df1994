//! Property-based test generators using proptest.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for short document texts.
pub fn text_strategy() -> impl Strategy<Value = String> {
    "[a-z ]{0,24}"
}

/// Strategy for a sequence of successive document contents, each a small
/// change of its predecessor.
pub fn edit_script_strategy(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    (text_strategy(), prop::collection::vec(text_change_strategy(), 1..=max_len)).prop_map(
        |(start, changes)| {
            let mut current = start;
            changes
                .into_iter()
                .map(|change| {
                    current = change.apply(&current);
                    current.clone()
                })
                .collect()
        },
    )
}

/// A local change to a text.
#[derive(Debug, Clone)]
pub enum TextChange {
    /// Insert text at a position, taken modulo the text length.
    Insert(usize, String),
    /// Remove up to `len` characters at a position, taken modulo the text
    /// length.
    Remove(usize, usize),
    /// Replace the whole text.
    Replace(String),
}

impl TextChange {
    /// Applies the change to `text`.
    pub fn apply(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        match self {
            TextChange::Insert(at, inserted) => {
                let at = at % (chars.len() + 1);
                let mut out: String = chars[..at].iter().collect();
                out.push_str(inserted);
                out.extend(&chars[at..]);
                out
            }
            TextChange::Remove(_, _) if chars.is_empty() => String::new(),
            TextChange::Remove(at, len) => {
                let at = at % chars.len();
                let end = (at + len).min(chars.len());
                chars[..at].iter().chain(&chars[end..]).collect()
            }
            TextChange::Replace(text) => text.clone(),
        }
    }
}

/// Strategy for text changes, mostly small inserts and removals.
pub fn text_change_strategy() -> impl Strategy<Value = TextChange> {
    prop_oneof![
        4 => (any::<u16>(), "[a-z ]{1,6}")
            .prop_map(|(at, text)| TextChange::Insert(usize::from(at), text)),
        3 => (any::<u16>(), 1usize..5)
            .prop_map(|(at, len)| TextChange::Remove(usize::from(at), len)),
        1 => text_strategy().prop_map(TextChange::Replace),
    ]
}

/// Strategy for a delivery pattern: `true` delivers a message, `false`
/// loses it.
pub fn delivery_strategy(len: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::weighted(0.7), len)
}

/// Strategy for small flat JSON objects.
pub fn json_object_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-e]", json_leaf_strategy(), 0..5).prop_map(|members| {
        Value::Object(members.into_iter().collect::<Map<String, Value>>())
    })
}

fn json_leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let text = "abc";
        let insert = TextChange::Insert(4, "x".into());
        assert_eq!(insert.apply(text), "xabc");

        let remove = TextChange::Remove(3, 2);
        assert_eq!(remove.apply(text), "c");
        assert_eq!(remove.apply(""), "");
    }

    proptest! {
        #[test]
        fn scripts_have_requested_length(script in edit_script_strategy(6)) {
            prop_assert!(!script.is_empty() && script.len() <= 6);
        }

        #[test]
        fn json_objects_have_no_nulls(value in json_object_strategy()) {
            let members = value.as_object().unwrap();
            prop_assert!(members.values().all(|member| !member.is_null()));
        }
    }
}
