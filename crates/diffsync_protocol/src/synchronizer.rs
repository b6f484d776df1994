//! The content-specific diff/patch contract.

use crate::document::{Document, ShadowDocument};
use crate::edit::Edit;
use crate::error::ProtocolResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A pluggable diff/patch algorithm for one content type.
///
/// Implementors supply the four content-level operations; the edit-level
/// operations used by the engines are derived from them.
///
/// # Invariants
///
/// - `diff_content` and `patch_content` are deterministic
/// - `patch_content(diff_content(a, b), a)` yields `b`
/// - `diff_content(a, a)` is unchanged according to `is_unchanged`
pub trait Synchronizer: Send + Sync {
    /// Document content type.
    type Content: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;
    /// Diff representation.
    type Diff: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Computes the diff that turns `from` into `to`.
    fn diff_content(&self, from: &Self::Content, to: &Self::Content) -> Self::Diff;

    /// Applies `diff` to `content`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProtocolError::PatchRejected`] if the diff does not
    /// apply to `content`.
    fn patch_content(&self, diff: &Self::Diff, content: &Self::Content)
        -> ProtocolResult<Self::Content>;

    /// Checksum of `content`.
    fn checksum(&self, content: &Self::Content) -> String;

    /// Returns true if applying `diff` never changes content.
    fn is_unchanged(&self, diff: &Self::Diff) -> bool;

    /// Computes the edit that moves `shadow` to `content`, tagged with the
    /// shadow's versions.
    fn diff(
        &self,
        content: &Self::Content,
        shadow: &ShadowDocument<Self::Content>,
    ) -> Edit<Self::Diff> {
        Edit::new(
            shadow.client_version,
            shadow.server_version,
            self.checksum(shadow.content()),
            self.diff_content(shadow.content(), content),
        )
    }

    /// Computes the edit that moves `content` to the shadow's content.
    ///
    /// This is the catch-up direction: the working copy is brought in line
    /// with a shadow that has just absorbed the peer's edits.
    fn document_edit(
        &self,
        content: &Self::Content,
        shadow: &ShadowDocument<Self::Content>,
    ) -> Edit<Self::Diff> {
        Edit::new(
            shadow.client_version,
            shadow.server_version,
            self.checksum(content),
            self.diff_content(content, shadow.content()),
        )
    }

    /// Applies `edit` to the shadow's content, keeping its versions.
    fn patch_shadow(
        &self,
        edit: &Edit<Self::Diff>,
        shadow: &ShadowDocument<Self::Content>,
    ) -> ProtocolResult<ShadowDocument<Self::Content>> {
        let content = self.patch_content(&edit.diff, shadow.content())?;
        Ok(shadow.with_content(content))
    }

    /// Applies `edit` to a server document.
    fn patch_document(
        &self,
        edit: &Edit<Self::Diff>,
        document: &Document<Self::Content>,
    ) -> ProtocolResult<Document<Self::Content>> {
        let content = self.patch_content(&edit.diff, &document.content)?;
        Ok(Document::new(document.id.clone(), content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ClientDocument;
    use crate::error::ProtocolError;

    /// Whole-value replacement: the diff is the target, `None` when equal.
    struct Replace;

    impl Synchronizer for Replace {
        type Content = String;
        type Diff = Option<String>;

        fn diff_content(&self, from: &String, to: &String) -> Option<String> {
            (from != to).then(|| to.clone())
        }

        fn patch_content(&self, diff: &Option<String>, content: &String) -> ProtocolResult<String> {
            match diff {
                Some(target) if target.is_empty() => Err(ProtocolError::patch_rejected("empty")),
                Some(target) => Ok(target.clone()),
                None => Ok(content.clone()),
            }
        }

        fn checksum(&self, content: &String) -> String {
            content.len().to_string()
        }

        fn is_unchanged(&self, diff: &Option<String>) -> bool {
            diff.is_none()
        }
    }

    fn shadow(content: &str) -> ShadowDocument<String> {
        ShadowDocument::new(2, 5, ClientDocument::new("d1", "c1", content.to_string()))
    }

    #[test]
    fn diff_is_tagged_with_shadow_versions() {
        let edit = Replace.diff(&"testing".to_string(), &shadow("test"));

        assert_eq!(edit.server_version, 2);
        assert_eq!(edit.client_version, 5);
        assert_eq!(edit.checksum, "4");
        assert_eq!(edit.diff.as_deref(), Some("testing"));
    }

    #[test]
    fn document_edit_moves_content_to_shadow() {
        let edit = Replace.document_edit(&"local".to_string(), &shadow("remote"));
        let document = Replace
            .patch_document(&edit, &Document::new("d1", "local".to_string()))
            .unwrap();

        assert_eq!(document.content, "remote");
        assert_eq!(document.id, "d1");
    }

    #[test]
    fn patch_shadow_keeps_versions() {
        let edit = Replace.diff(&"b".to_string(), &shadow("a"));
        let patched = Replace.patch_shadow(&edit, &shadow("a")).unwrap();

        assert_eq!(patched.content(), "b");
        assert_eq!(patched.server_version, 2);
        assert_eq!(patched.client_version, 5);
    }

    #[test]
    fn rejected_patch_propagates() {
        let edit = Replace.diff(&String::new(), &shadow("a"));
        assert!(Replace.patch_shadow(&edit, &shadow("a")).is_err());
    }
}
