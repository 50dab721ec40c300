use std::collections::BTreeMap;

use super::ArchiveSession;
use crate::error::Result;

/// A pending change to one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edit {
    pub text: Option<String>,
    pub language: Option<String>,
}

/// Edits made in the authoring form that have not been written back to the
/// session's tree yet.
#[derive(Debug, Default)]
pub struct EditOverlay {
    edits: BTreeMap<String, Edit>,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, path: &str, text: impl Into<String>) {
        self.edits.entry(path.to_string()).or_default().text = Some(text.into());
    }

    /// Manual language override for a file.
    pub fn set_language(&mut self, path: &str, language: impl Into<String>) {
        self.edits.entry(path.to_string()).or_default().language = Some(language.into());
    }

    pub fn get(&self, path: &str) -> Option<&Edit> {
        self.edits.get(path)
    }

    /// Drop the pending edit for `path`. Returns whether there was one.
    pub fn discard(&mut self, path: &str) -> bool {
        self.edits.remove(path).is_some()
    }

    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Write every pending edit into the session's tree.
    ///
    /// Edits are applied in path order and removed as they succeed; on the
    /// first failure the remaining edits stay pending. Returns how many were
    /// applied.
    pub fn commit(&mut self, session: &mut ArchiveSession) -> Result<usize> {
        let mut applied = 0;
        while let Some((path, edit)) = self.edits.pop_first() {
            let result = match &edit.text {
                Some(text) => session.update_content(&path, text.clone(), edit.language.as_deref()),
                None => match &edit.language {
                    Some(language) => session.set_language(&path, language),
                    None => Ok(()),
                },
            };

            if let Err(e) = result {
                tracing::warn!(path = %path, error = %e, "could not apply edit");
                self.edits.insert(path, edit);
                return Err(e);
            }
            applied += 1;
        }

        tracing::debug!(applied, "committed edits");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::tree::BuildOptions;
    use crate::zip::test_support::create_zip;

    async fn loaded() -> ArchiveSession {
        let mut session = ArchiveSession::new();
        session
            .load(
                create_zip(&[("a.js", b"let a = 1"), ("b.js", b"let b = 2")]),
                BuildOptions::eager(),
            )
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn commit_writes_text_and_language() {
        let mut session = loaded().await;
        let mut overlay = EditOverlay::new();
        overlay.set_text("a.js", "const a: number = 1");
        overlay.set_language("a.js", "typescript");
        overlay.set_language("b.js", "plaintext");
        assert!(overlay.is_dirty());

        assert_eq!(overlay.commit(&mut session).unwrap(), 2);
        assert!(!overlay.is_dirty());

        session.select("a.js").unwrap();
        let a = session.selected_node().unwrap();
        assert_eq!(a.content.as_deref(), Some("const a: number = 1"));
        assert_eq!(a.language.as_deref(), Some("typescript"));

        session.select("b.js").unwrap();
        let b = session.selected_node().unwrap();
        assert_eq!(b.content.as_deref(), Some("let b = 2"));
        assert_eq!(b.language.as_deref(), Some("plaintext"));
    }

    #[tokio::test]
    async fn failed_edit_stays_pending() {
        let mut session = loaded().await;
        let mut overlay = EditOverlay::new();
        overlay.set_text("a.js", "1");
        overlay.set_text("zzz.js", "2");

        let err = overlay.commit(&mut session).unwrap_err();
        assert!(matches!(err, Error::MemberNotFound(_)));
        assert_eq!(overlay.len(), 1);
        assert!(overlay.get("zzz.js").is_some());
        assert!(overlay.discard("zzz.js"));
        assert!(overlay.is_empty());
    }
}
