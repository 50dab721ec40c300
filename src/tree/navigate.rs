use std::fmt::Write;

use super::node::{FileNode, FileSystemNode};
use crate::zip::normalize_path;

/// First file in pre-order: a directory's subtree is searched before its
/// later siblings, and the first sibling before the rest.
pub fn find_first_file(root: &FileSystemNode) -> Option<&FileNode> {
    match root {
        FileSystemNode::File(file) => Some(file),
        FileSystemNode::Directory(dir) => dir.children.iter().find_map(find_first_file),
    }
}

/// Whether `target` is `path` itself or lies beneath it.
fn leads_to(path: &str, target: &str) -> bool {
    path.is_empty()
        || target == path
        || (target.starts_with(path) && target.as_bytes().get(path.len()) == Some(&b'/'))
}

/// Exact path lookup. Leading, trailing and doubled slashes are ignored.
pub fn find_node_by_path<'a>(root: &'a FileSystemNode, path: &str) -> Option<&'a FileSystemNode> {
    let target = normalize_path(path);
    let mut current = root;
    loop {
        if current.path() == target {
            return Some(current);
        }
        current = current
            .children()
            .iter()
            .find(|child| leads_to(child.path(), &target))?;
    }
}

pub fn find_node_by_path_mut<'a>(
    root: &'a mut FileSystemNode,
    path: &str,
) -> Option<&'a mut FileSystemNode> {
    let target = normalize_path(path);
    let mut current = root;
    loop {
        if current.path() == target {
            return Some(current);
        }
        let FileSystemNode::Directory(dir) = current else {
            return None;
        };
        current = dir
            .children
            .iter_mut()
            .find(|child| leads_to(child.path(), &target))?;
    }
}

pub fn find_file_mut<'a>(root: &'a mut FileSystemNode, path: &str) -> Option<&'a mut FileNode> {
    find_node_by_path_mut(root, path)?.as_file_mut()
}

/// Every file node in pre-order.
pub fn files(root: &FileSystemNode) -> Vec<&FileNode> {
    fn walk<'a>(node: &'a FileSystemNode, out: &mut Vec<&'a FileNode>) {
        match node {
            FileSystemNode::File(file) => out.push(file),
            FileSystemNode::Directory(dir) => {
                for child in &dir.children {
                    walk(child, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

/// Number of (directories, files) in the tree, the root included.
pub fn count(root: &FileSystemNode) -> (usize, usize) {
    match root {
        FileSystemNode::File(_) => (0, 1),
        FileSystemNode::Directory(dir) => {
            dir.children.iter().map(count).fold((1, 0), |(d, f), (cd, cf)| (d + cd, f + cf))
        }
    }
}

/// Directories start expanded for the first two levels.
pub fn default_expanded(depth: usize) -> bool {
    depth < 2
}

/// Indented text listing, two spaces per level, directories suffixed with
/// `/`. Unless `expand_all` is set, directories that start collapsed are
/// shown with a `/...` marker instead of their children.
pub fn render_tree(root: &FileSystemNode, expand_all: bool) -> String {
    fn walk(node: &FileSystemNode, depth: usize, expand_all: bool, out: &mut String) {
        let indent = "  ".repeat(depth);
        match node {
            FileSystemNode::File(file) => {
                let _ = writeln!(out, "{}{}", indent, file.name);
            }
            FileSystemNode::Directory(dir) => {
                if expand_all || default_expanded(depth) {
                    let _ = writeln!(out, "{}{}/", indent, dir.name.trim_end_matches('/'));
                    for child in &dir.children {
                        walk(child, depth + 1, expand_all, out);
                    }
                } else {
                    let _ = writeln!(out, "{}{}/...", indent, dir.name);
                }
            }
        }
    }

    let mut out = String::new();
    walk(root, 0, expand_all, &mut out);
    out
}
