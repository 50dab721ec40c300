//! In-memory file tree of an archive and the operations that walk it.

mod builder;
mod navigate;
mod node;

pub use builder::{
    BuildOptions, ContentMode, TextFilter, build_tree, build_tree_from_bytes, is_hidden_entry,
};
pub use navigate::{
    count, default_expanded, files, find_file_mut, find_first_file, find_node_by_path,
    find_node_by_path_mut, render_tree,
};
pub use node::{DirectoryNode, FileNode, FileSystemNode, child_path};
