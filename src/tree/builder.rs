//! Turns an opened archive into a [`FileSystemNode`] tree.
//!
//! Entries are walked once in central directory order. Directory nodes are
//! created on demand, file nodes are placed as soon as their entry is seen,
//! and text decoding for eager mode runs afterwards, fanned out over every
//! member at once. Decoded text is attached to the existing placeholder, so
//! child order never depends on which decode finishes first.

use futures::future::join_all;
use std::sync::Arc;

use crate::error::Result;
use crate::io::ReadAt;
use crate::language::{classify_by_extension, is_binary_by_extension, is_supported_text};
use crate::zip::{ArchiveIndex, ZipFileEntry, decode_text};

use super::navigate::find_file_mut;
use super::node::{DirectoryNode, FileSystemNode};

/// When file contents are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    /// Decode every accepted member while building (upload flow).
    #[default]
    Eager,
    /// Leave contents empty; they are read from the archive on demand.
    Lazy,
}

/// Which members an eager build keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFilter {
    /// Only the known source and markup extensions.
    #[default]
    Supported,
    /// Anything not on the binary denylist.
    NonBinary,
}

impl TextFilter {
    pub fn accepts(self, path: &str) -> bool {
        match self {
            TextFilter::Supported => is_supported_text(path),
            TextFilter::NonBinary => !is_binary_by_extension(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    pub mode: ContentMode,
    pub text_filter: TextFilter,
}

impl BuildOptions {
    pub fn eager() -> Self {
        Self::default()
    }

    pub fn lazy() -> Self {
        Self {
            mode: ContentMode::Lazy,
            ..Self::default()
        }
    }

    pub fn with_text_filter(mut self, text_filter: TextFilter) -> Self {
        self.text_filter = text_filter;
        self
    }
}

/// macOS resource forks and dot-prefixed files or folders.
pub fn is_hidden_entry(path: &str) -> bool {
    path.split('/')
        .any(|part| part == "__MACOSX" || part.starts_with('.'))
}

/// Build the tree for an opened archive.
pub async fn build_tree<R: ReadAt>(
    index: &ArchiveIndex<R>,
    options: BuildOptions,
) -> Result<FileSystemNode> {
    let mut root = DirectoryNode::root();
    let mut pending: Vec<(String, &ZipFileEntry)> = Vec::new();

    for entry in index.entries() {
        let name = &entry.file_name;
        if is_hidden_entry(name) {
            tracing::trace!(entry = %name, "skipping hidden entry");
            continue;
        }

        let parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
        let Some((file_name, dirs)) = parts.split_last() else {
            continue;
        };

        if entry.is_directory {
            if root.ensure_directories(&parts).is_none() {
                tracing::warn!(entry = %name, "directory entry collides with a file, skipping");
            }
            continue;
        }

        if options.mode == ContentMode::Eager && !options.text_filter.accepts(name) {
            tracing::debug!(entry = %name, "not a text member, leaving it out");
            continue;
        }

        let Some(file) = root
            .ensure_directories(dirs)
            .and_then(|dir| dir.ensure_file(file_name))
        else {
            tracing::warn!(entry = %name, "file entry collides with a directory, skipping");
            continue;
        };
        file.language = Some(classify_by_extension(file_name).to_string());

        if options.mode == ContentMode::Eager {
            pending.push((file.path.clone(), entry));
        }
    }

    let mut tree = FileSystemNode::Directory(root);

    let decodes = pending.into_iter().map(|(path, entry)| async move {
        let result = match index.read_entry(entry).await {
            Ok(data) => decode_text(&path, data),
            Err(e) => Err(e),
        };
        (path, result)
    });

    for (path, result) in join_all(decodes).await {
        match result {
            Ok(text) => {
                if let Some(file) = find_file_mut(&mut tree, &path) {
                    file.content = Some(text);
                }
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "skipping undecodable archive member");
            }
        }
    }

    Ok(collapse_root(tree))
}

/// Open `bytes` as an archive and build its tree.
pub async fn build_tree_from_bytes(
    bytes: impl Into<Arc<[u8]>>,
    options: BuildOptions,
) -> Result<FileSystemNode> {
    let index = ArchiveIndex::from_bytes(bytes).await?;
    build_tree(&index, options).await
}

/// A root whose only child is a directory is replaced by that directory.
fn collapse_root(tree: FileSystemNode) -> FileSystemNode {
    match tree {
        FileSystemNode::Directory(mut root)
            if root.children.len() == 1 && root.children[0].is_directory() =>
        {
            root.children.remove(0)
        }
        other => other,
    }
}
