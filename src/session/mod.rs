//! Per-view archive state: the loaded tree, the original bytes, the lazy
//! archive index and the current selection.
//!
//! A session is owned by exactly one view (a page, a form, a CLI run) and is
//! never shared. Loading replaces everything at once; a failed load leaves
//! the previous archive in place.

mod download;
mod overlay;

pub use download::{DEFAULT_ARCHIVE_NAME, DEFAULT_SNIPPET_NAME, file_stem_from_title, save_download};
pub use overlay::{Edit, EditOverlay};

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::tree::{
    BuildOptions, ContentMode, FileNode, FileSystemNode, build_tree, find_file_mut,
    find_first_file, find_node_by_path,
};
use crate::zip::{ArchiveIndex, ArchiveWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loading,
    Ready,
}

/// Outcome of [`ArchiveSession::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A file was selected and its content is attached.
    Loaded,
    /// A file was selected; its content still has to be fetched with
    /// [`ArchiveSession::get_content`]. [`ArchiveSession::select_and_load`]
    /// does both steps at once.
    NeedsContent,
    /// The path is a directory. Selection is unchanged.
    Directory,
}

/// A content read that no longer borrows the session.
///
/// Resolve it, then hand the text back through
/// [`ArchiveSession::attach_content`]. Anything written to the node in the
/// meantime takes precedence over the fetched text.
pub struct PendingContent {
    path: String,
    index: Arc<ArchiveIndex>,
}

impl PendingContent {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn resolve(&self) -> Result<String> {
        self.index.read_text(&self.path).await
    }
}

pub struct ArchiveSession {
    state: SessionState,
    tree: Option<FileSystemNode>,
    original: Option<Arc<[u8]>>,
    index: Option<Arc<ArchiveIndex>>,
    selected: Option<String>,
}

impl Default for ArchiveSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the previous state back if a load is abandoned or fails.
struct LoadingGuard<'a> {
    state: &'a mut SessionState,
    previous: Option<SessionState>,
}

impl LoadingGuard<'_> {
    fn finish(mut self, next: SessionState) {
        self.previous = None;
        *self.state = next;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.state = previous;
        }
    }
}

/// Files of the tree in pre-order, with the directories that lead to them.
enum Item<'a> {
    Directory(&'a str),
    File(&'a FileNode),
}

fn walk<'a>(node: &'a FileSystemNode, out: &mut Vec<Item<'a>>) {
    match node {
        FileSystemNode::File(file) => out.push(Item::File(file)),
        FileSystemNode::Directory(dir) => {
            // The synthetic root has no entry of its own.
            if !dir.path.is_empty() {
                out.push(Item::Directory(&dir.path));
            }
            for child in &dir.children {
                walk(child, out);
            }
        }
    }
}

impl ArchiveSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Empty,
            tree: None,
            original: None,
            index: None,
            selected: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tree(&self) -> Option<&FileSystemNode> {
        self.tree.as_ref()
    }

    /// The archive exactly as it was loaded.
    pub fn original_archive(&self) -> Option<&[u8]> {
        self.original.as_deref()
    }

    /// Path of the selected file.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_node(&self) -> Option<&FileNode> {
        let path = self.selected.as_deref()?;
        find_node_by_path(self.tree.as_ref()?, path)?.as_file()
    }

    /// Whether contents are read from the archive on demand.
    pub fn is_lazy(&self) -> bool {
        self.index.is_some()
    }

    fn loaded_tree(&self) -> Result<&FileSystemNode> {
        self.tree.as_ref().ok_or(Error::NotLoaded)
    }

    fn loaded_file(&self, path: &str) -> Result<&FileNode> {
        find_node_by_path(self.loaded_tree()?, path)
            .and_then(FileSystemNode::as_file)
            .ok_or_else(|| Error::MemberNotFound(path.to_string()))
    }

    fn loaded_file_mut(&mut self, path: &str) -> Result<&mut FileNode> {
        let tree = self.tree.as_mut().ok_or(Error::NotLoaded)?;
        find_file_mut(tree, path).ok_or_else(|| Error::MemberNotFound(path.to_string()))
    }

    /// Load an archive, replacing whatever was loaded before.
    ///
    /// The first file in pre-order is selected. In lazy mode the archive
    /// index is kept for [`get_content`](Self::get_content); in eager mode
    /// every accepted member is decoded up front and the index is dropped.
    pub async fn load(&mut self, bytes: impl Into<Arc<[u8]>>, options: BuildOptions) -> Result<()> {
        let bytes: Arc<[u8]> = bytes.into();
        let previous = std::mem::replace(&mut self.state, SessionState::Loading);
        let guard = LoadingGuard {
            state: &mut self.state,
            previous: Some(previous),
        };

        let opened = async {
            let index = ArchiveIndex::from_bytes(bytes.clone()).await?;
            let tree = build_tree(&index, options).await?;
            Ok::<_, Error>((index, tree))
        }
        .await;

        let (index, tree) = match opened {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(error = %e, "failed to load archive");
                return Err(e);
            }
        };

        self.selected = find_first_file(&tree).map(|file| file.path.clone());
        self.tree = Some(tree);
        self.original = Some(bytes);
        self.index = match options.mode {
            ContentMode::Lazy => Some(Arc::new(index)),
            ContentMode::Eager => None,
        };
        guard.finish(SessionState::Ready);

        tracing::info!(
            members = self.index.as_ref().map(|i| i.len()),
            selected = ?self.selected,
            lazy = self.is_lazy(),
            "archive loaded"
        );
        Ok(())
    }

    /// Select the file at `path`. Selecting a directory is a no-op.
    pub fn select(&mut self, path: &str) -> Result<Selection> {
        let node = find_node_by_path(self.loaded_tree()?, path)
            .ok_or_else(|| Error::MemberNotFound(path.to_string()))?;

        let (selection, file_path) = match node {
            FileSystemNode::Directory(_) => return Ok(Selection::Directory),
            FileSystemNode::File(file) if file.content.is_some() => {
                (Selection::Loaded, file.path.clone())
            }
            FileSystemNode::File(file) => (Selection::NeedsContent, file.path.clone()),
        };
        self.selected = Some(file_path);
        Ok(selection)
    }

    /// Select a file and make sure its content is attached.
    pub async fn select_and_load(&mut self, path: &str) -> Result<Option<String>> {
        match self.select(path)? {
            Selection::Directory => Ok(None),
            Selection::Loaded | Selection::NeedsContent => self.get_content(path).await.map(Some),
        }
    }

    /// Start reading a file's content from the archive index.
    ///
    /// Returns `Ok(None)` if the content is already attached.
    pub fn fetch_content(&self, path: &str) -> Result<Option<PendingContent>> {
        let file = self.loaded_file(path)?;
        if file.content.is_some() {
            return Ok(None);
        }

        let index = self
            .index
            .clone()
            .ok_or_else(|| Error::ContentUnavailable(path.to_string()))?;
        Ok(Some(PendingContent {
            path: file.path.clone(),
            index,
        }))
    }

    /// Attach fetched text to a file unless it already has content.
    ///
    /// Returns the content the node ends up with.
    pub fn attach_content(&mut self, path: &str, text: String) -> Result<String> {
        let file = self.loaded_file_mut(path)?;
        if let Some(current) = &file.content {
            tracing::debug!(path, "content already present, discarding fetched text");
            return Ok(current.clone());
        }
        file.content = Some(text.clone());
        Ok(text)
    }

    /// Content of the file at `path`, read from the archive and cached on
    /// the node if it was not attached yet.
    pub async fn get_content(&mut self, path: &str) -> Result<String> {
        let Some(pending) = self.fetch_content(path)? else {
            let file = self.loaded_file(path)?;
            return Ok(file.content.clone().unwrap_or_default());
        };

        let text = pending.resolve().await?;
        self.attach_content(path, text)
    }

    /// Replace a file's content, and its language when one is given.
    ///
    /// The original archive bytes are never touched.
    pub fn update_content(&mut self, path: &str, text: String, language: Option<&str>) -> Result<()> {
        let file = self.loaded_file_mut(path)?;
        file.content = Some(text);
        if let Some(language) = language {
            file.language = Some(language.to_string());
        }
        Ok(())
    }

    pub fn set_language(&mut self, path: &str, language: &str) -> Result<()> {
        self.loaded_file_mut(path)?.language = Some(language.to_string());
        Ok(())
    }

    /// Encode the current tree, edits included, as a new archive.
    ///
    /// Files whose content was never fetched are read from the archive
    /// index as raw bytes, all at once. Without an index they are written
    /// empty.
    pub async fn serialize(&self) -> Result<Vec<u8>> {
        let mut items = Vec::new();
        walk(self.loaded_tree()?, &mut items);

        let index = self.index.as_deref();
        let missing = items.iter().filter_map(|item| match item {
            Item::File(file) if file.content.is_none() => Some(file.path.as_str()),
            _ => None,
        });
        let fetched = join_all(missing.map(|path| async move {
            let data = match index {
                Some(index) => index.read_member(path).await.map_err(|e| {
                    Error::Serialization(format!("could not read {}: {}", path, e))
                })?,
                None => {
                    tracing::warn!(path, "no content available, writing an empty file");
                    Vec::new()
                }
            };
            Ok::<_, Error>((path, data))
        }))
        .await;

        let mut raw = std::collections::HashMap::with_capacity(fetched.len());
        for result in fetched {
            let (path, data) = result?;
            raw.insert(path, data);
        }

        let mut writer = ArchiveWriter::new();
        for item in &items {
            let written = match item {
                Item::Directory(path) => writer.add_directory(path),
                Item::File(file) => match &file.content {
                    Some(text) => writer.add_file(&file.path, text.as_bytes()),
                    None => {
                        let data = raw.get(file.path.as_str()).map(Vec::as_slice);
                        writer.add_file(&file.path, data.unwrap_or_default())
                    }
                },
            };
            written.map_err(|e| match e {
                Error::Serialization(_) => e,
                other => Error::Serialization(other.to_string()),
            })?;
        }

        writer.finish()
    }

    /// Save the archive exactly as it was loaded, ignoring any edits.
    pub fn download_original(&self, dir: &Path, suggested_name: &str) -> Result<PathBuf> {
        let original = self.original.as_deref().ok_or(Error::NotLoaded)?;
        download::save_download(dir, suggested_name, DEFAULT_ARCHIVE_NAME, original)
    }

    /// Save one file's current content. The content must already be
    /// attached; use [`get_content`](Self::get_content) or
    /// [`select_and_load`](Self::select_and_load) first in lazy mode.
    pub fn download_member(&self, path: &str, dir: &Path, suggested_name: &str) -> Result<PathBuf> {
        let file = self.loaded_file(path)?;
        let content = file
            .content
            .as_deref()
            .ok_or_else(|| Error::ContentUnavailable(path.to_string()))?;
        download::save_download(dir, suggested_name, &file.name, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TextFilter;
    use crate::zip::test_support::{create_deflated_zip, create_zip};
    use std::collections::BTreeMap;
    use std::io::{Cursor, Read};

    fn extract(bytes: &[u8]) -> BTreeMap<String, String> {
        let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            if file.is_dir() {
                continue;
            }
            let mut text = String::new();
            file.read_to_string(&mut text).unwrap();
            out.insert(file.name().to_string(), text);
        }
        out
    }

    fn sample_zip() -> Vec<u8> {
        create_zip(&[
            ("src/a.py", b"print(1)"),
            ("src/b.py", b"print(2)"),
            ("README.md", b"# hi"),
        ])
    }

    #[tokio::test]
    async fn load_selects_first_file() {
        let mut session = ArchiveSession::new();
        assert_eq!(session.state(), SessionState::Empty);

        session.load(sample_zip(), BuildOptions::eager()).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.selected(), Some("src/a.py"));
        assert_eq!(
            session.selected_node().unwrap().content.as_deref(),
            Some("print(1)")
        );
        assert!(!session.is_lazy());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_archive() {
        let mut session = ArchiveSession::new();
        session.load(sample_zip(), BuildOptions::eager()).await.unwrap();

        let err = session
            .load(b"garbage".to_vec(), BuildOptions::eager())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat(_)));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.original_archive(), Some(sample_zip().as_slice()));
        assert!(session.tree().is_some());

        let mut fresh = ArchiveSession::new();
        assert!(fresh.load(b"garbage".to_vec(), BuildOptions::lazy()).await.is_err());
        assert_eq!(fresh.state(), SessionState::Empty);
        assert!(fresh.tree().is_none());
    }

    #[tokio::test]
    async fn lazy_selection_fetches_and_caches_content() {
        let mut session = ArchiveSession::new();
        session.load(sample_zip(), BuildOptions::lazy()).await.unwrap();
        assert!(session.is_lazy());

        assert_eq!(session.select("README.md").unwrap(), Selection::NeedsContent);
        assert_eq!(session.selected(), Some("README.md"));
        assert_eq!(session.get_content("README.md").await.unwrap(), "# hi");
        assert_eq!(session.select("README.md").unwrap(), Selection::Loaded);

        assert_eq!(session.select("src").unwrap(), Selection::Directory);
        assert_eq!(session.selected(), Some("README.md"));
    }

    #[tokio::test]
    async fn select_and_load_fetches_in_one_step() {
        let mut session = ArchiveSession::new();
        session.load(sample_zip(), BuildOptions::lazy()).await.unwrap();

        let text = session.select_and_load("src/b.py").await.unwrap();
        assert_eq!(text.as_deref(), Some("print(2)"));
        assert_eq!(session.selected(), Some("src/b.py"));
        assert_eq!(session.select("src/b.py").unwrap(), Selection::Loaded);

        assert_eq!(session.select_and_load("src").await.unwrap(), None);
        assert_eq!(session.selected(), Some("src/b.py"));
    }

    #[tokio::test]
    async fn missing_paths_are_reported() {
        let mut session = ArchiveSession::new();
        assert!(matches!(session.select("a"), Err(Error::NotLoaded)));

        session.load(sample_zip(), BuildOptions::lazy()).await.unwrap();
        assert!(matches!(
            session.get_content("src/c.py").await,
            Err(Error::MemberNotFound(_))
        ));
        assert!(matches!(session.select("nope"), Err(Error::MemberNotFound(_))));
    }

    #[tokio::test]
    async fn binary_member_is_not_decoded_on_demand() {
        let zip = create_zip(&[("img/logo.png", b"\x89PNG\r\n"), ("a.txt", b"a")]);
        let mut session = ArchiveSession::new();
        session.load(zip, BuildOptions::lazy()).await.unwrap();

        assert!(matches!(
            session.get_content("img/logo.png").await,
            Err(Error::BinaryMember(_))
        ));
    }

    #[tokio::test]
    async fn edit_made_during_fetch_wins() {
        let mut session = ArchiveSession::new();
        session.load(sample_zip(), BuildOptions::lazy()).await.unwrap();

        let pending = session.fetch_content("src/b.py").unwrap().unwrap();
        session
            .update_content("src/b.py", "print('edited')".to_string(), None)
            .unwrap();
        let fetched = pending.resolve().await.unwrap();
        assert_eq!(fetched, "print(2)");

        let kept = session.attach_content(pending.path(), fetched).unwrap();
        assert_eq!(kept, "print('edited')");
        assert!(session.fetch_content("src/b.py").unwrap().is_none());
    }

    #[tokio::test]
    async fn round_trip_preserves_every_text_member() {
        let zip = create_deflated_zip(&[
            ("proj/", b""),
            ("proj/src/main.rs", b"fn main() {}\n"),
            ("proj/src/lib.rs", b"pub mod a;\n"),
            ("proj/README.md", b"# proj\n"),
            ("proj/notes.txt", b"todo"),
        ]);

        for options in [BuildOptions::eager(), BuildOptions::lazy()] {
            let mut session = ArchiveSession::new();
            session.load(zip.clone(), options).await.unwrap();
            let repacked = session.serialize().await.unwrap();
            assert_eq!(extract(&repacked), extract(&zip));
        }
    }

    #[tokio::test]
    async fn serialize_includes_edits_but_original_is_untouched() {
        let zip = sample_zip();
        let mut session = ArchiveSession::new();
        session.load(zip.clone(), BuildOptions::lazy()).await.unwrap();
        session
            .update_content("src/a.py", "print(100)".to_string(), Some("python"))
            .unwrap();

        let repacked = extract(&session.serialize().await.unwrap());
        assert_eq!(repacked["src/a.py"], "print(100)");
        assert_eq!(repacked["src/b.py"], "print(2)");
        assert_eq!(session.original_archive(), Some(zip.as_slice()));

        let dir = tempfile::tempdir().unwrap();
        let saved = session.download_original(dir.path(), "project.zip").unwrap();
        assert_eq!(std::fs::read(saved).unwrap(), zip);
    }

    #[tokio::test]
    async fn lazy_serialize_copies_binary_members_verbatim() {
        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
        let zip = create_zip(&[("a.txt", b"a"), ("logo.png", png)]);
        let mut session = ArchiveSession::new();
        session.load(zip, BuildOptions::lazy()).await.unwrap();

        let repacked = session.serialize().await.unwrap();
        let mut archive = ::zip::ZipArchive::new(Cursor::new(repacked)).unwrap();
        let mut data = Vec::new();
        archive.by_name("logo.png").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, png);
    }

    #[tokio::test]
    async fn eager_serialize_writes_undecodable_members_empty() {
        let zip = create_zip(&[("bad.txt", b"\xff\xfe"), ("ok.txt", b"ok")]);
        let mut session = ArchiveSession::new();
        session
            .load(zip, BuildOptions::eager().with_text_filter(TextFilter::NonBinary))
            .await
            .unwrap();

        let repacked = session.serialize().await.unwrap();
        let mut archive = ::zip::ZipArchive::new(Cursor::new(repacked)).unwrap();
        assert_eq!(archive.by_name("bad.txt").unwrap().size(), 0);
        assert_eq!(archive.by_name("ok.txt").unwrap().size(), 2);
    }

    #[tokio::test]
    async fn download_member_needs_attached_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ArchiveSession::new();
        session.load(sample_zip(), BuildOptions::lazy()).await.unwrap();

        assert!(matches!(
            session.download_member("src/b.py", dir.path(), "b.py"),
            Err(Error::ContentUnavailable(_))
        ));

        session.get_content("src/b.py").await.unwrap();
        let saved = session.download_member("src/b.py", dir.path(), "").unwrap();
        assert_eq!(saved.file_name().unwrap(), "b.py");
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "print(2)");
    }

    #[tokio::test]
    async fn empty_archive_loads_with_nothing_selected() {
        let mut session = ArchiveSession::new();
        session.load(create_zip(&[]), BuildOptions::eager()).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.selected(), None);
        assert!(session.tree().unwrap().children().is_empty());
    }
}
