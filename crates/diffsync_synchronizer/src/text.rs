//! Character-level text synchronizer.

use crate::checksum::sha256_hex;
use diffsync_protocol::{ProtocolError, ProtocolResult, Synchronizer};
use serde::{Deserialize, Serialize};
use similar::ChangeTag;

/// What a [`TextChange`] does to its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Text present on both sides.
    Unchanged,
    /// Text inserted.
    Add,
    /// Text removed.
    Delete,
}

impl From<ChangeTag> for Operation {
    fn from(tag: ChangeTag) -> Self {
        match tag {
            ChangeTag::Equal => Operation::Unchanged,
            ChangeTag::Insert => Operation::Add,
            ChangeTag::Delete => Operation::Delete,
        }
    }
}

/// A run of characters sharing one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    /// Operation applied to `text`.
    pub operation: Operation,
    /// The affected characters.
    pub text: String,
}

impl TextChange {
    /// Creates a new change.
    pub fn new(operation: Operation, text: impl Into<String>) -> Self {
        Self {
            operation,
            text: text.into(),
        }
    }
}

/// An ordered list of changes covering the whole source text.
///
/// Adjacent changes never share an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDiff {
    /// The changes, in source order.
    #[serde(rename = "diffs")]
    pub changes: Vec<TextChange>,
}

/// Synchronizer for plain text content.
///
/// Patching is exact: every unchanged and deleted run must be found at its
/// position in the target text, otherwise the patch is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSynchronizer;

impl TextSynchronizer {
    /// Creates a new text synchronizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Synchronizer for TextSynchronizer {
    type Content = String;
    type Diff = TextDiff;

    fn diff_content(&self, from: &String, to: &String) -> TextDiff {
        let mut changes: Vec<TextChange> = Vec::new();
        for change in similar::TextDiff::from_chars(from.as_str(), to.as_str()).iter_all_changes() {
            let operation = Operation::from(change.tag());
            match changes.last_mut() {
                Some(last) if last.operation == operation => last.text.push_str(change.value()),
                _ => changes.push(TextChange::new(operation, change.value())),
            }
        }
        TextDiff { changes }
    }

    fn patch_content(&self, diff: &TextDiff, content: &String) -> ProtocolResult<String> {
        let mut patched = String::with_capacity(content.len());
        let mut cursor = 0;

        for change in &diff.changes {
            if change.operation == Operation::Add {
                patched.push_str(&change.text);
                continue;
            }
            if !content[cursor..].starts_with(change.text.as_str()) {
                return Err(ProtocolError::patch_rejected(format!(
                    "expected {:?} at byte {}",
                    change.text, cursor
                )));
            }
            if change.operation == Operation::Unchanged {
                patched.push_str(&change.text);
            }
            cursor += change.text.len();
        }

        if cursor != content.len() {
            return Err(ProtocolError::patch_rejected(format!(
                "diff covers {} of {} bytes",
                cursor,
                content.len()
            )));
        }
        Ok(patched)
    }

    fn checksum(&self, content: &String) -> String {
        sha256_hex(content.as_bytes())
    }

    fn is_unchanged(&self, diff: &TextDiff) -> bool {
        diff.changes
            .iter()
            .all(|change| change.operation == Operation::Unchanged)
    }
}
