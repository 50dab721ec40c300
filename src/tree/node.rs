use serde::Serialize;

/// One element of an archive's file tree.
///
/// Serializes to the shape the viewer consumes:
/// `{ "type": "file" | "directory", "name", "path", "children"?, "content"?, "language"? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileSystemNode {
    Directory(DirectoryNode),
    File(FileNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryNode {
    pub name: String,
    /// Forward-slash path from the archive root; empty for the synthetic root.
    pub path: String,
    /// In first-seen archive order.
    pub children: Vec<FileSystemNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Join a child name onto its parent's path.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

impl FileSystemNode {
    pub fn name(&self) -> &str {
        match self {
            FileSystemNode::Directory(dir) => &dir.name,
            FileSystemNode::File(file) => &file.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FileSystemNode::Directory(dir) => &dir.path,
            FileSystemNode::File(file) => &file.path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FileSystemNode::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileSystemNode::Directory(_))
    }

    /// Children of a directory; files have none.
    pub fn children(&self) -> &[FileSystemNode] {
        match self {
            FileSystemNode::Directory(dir) => &dir.children,
            FileSystemNode::File(_) => &[],
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            FileSystemNode::File(file) => Some(file),
            FileSystemNode::Directory(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileNode> {
        match self {
            FileSystemNode::File(file) => Some(file),
            FileSystemNode::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            FileSystemNode::Directory(dir) => Some(dir),
            FileSystemNode::File(_) => None,
        }
    }
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            children: Vec::new(),
        }
    }

    /// The synthetic root every tree is built under.
    pub fn root() -> Self {
        Self::new("/", "")
    }

    fn position_or_insert(
        &mut self,
        name: &str,
        make: impl FnOnce(String) -> FileSystemNode,
    ) -> usize {
        match self.children.iter().position(|child| child.name() == name) {
            Some(pos) => pos,
            None => {
                let path = child_path(&self.path, name);
                self.children.push(make(path));
                self.children.len() - 1
            }
        }
    }

    /// Find the child directory `name`, creating it if missing.
    ///
    /// Returns `None` when a file already occupies that name.
    pub fn ensure_directory(&mut self, name: &str) -> Option<&mut DirectoryNode> {
        let pos = self.position_or_insert(name, |path| {
            FileSystemNode::Directory(DirectoryNode::new(name, path))
        });
        match &mut self.children[pos] {
            FileSystemNode::Directory(dir) => Some(dir),
            FileSystemNode::File(_) => None,
        }
    }

    /// Find the child file `name`, creating an empty placeholder if missing.
    ///
    /// Returns `None` when a directory already occupies that name.
    pub fn ensure_file(&mut self, name: &str) -> Option<&mut FileNode> {
        let pos = self.position_or_insert(name, |path| {
            FileSystemNode::File(FileNode {
                name: name.to_string(),
                path,
                content: None,
                language: None,
            })
        });
        match &mut self.children[pos] {
            FileSystemNode::File(file) => Some(file),
            FileSystemNode::Directory(_) => None,
        }
    }

    /// Create every directory along `parts`, returning the deepest one.
    pub fn ensure_directories(&mut self, parts: &[&str]) -> Option<&mut DirectoryNode> {
        let mut current = self;
        for part in parts {
            current = current.ensure_directory(part)?;
        }
        Some(current)
    }
}
