use thiserror::Error;

/// Errors produced while loading, browsing and re-encoding archives.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte buffer is not a readable ZIP archive.
    #[error("could not process archive: {0}")]
    ArchiveFormat(String),

    /// A single member could not be decoded to text.
    #[error("could not decode {path} as text: {reason}")]
    EntryDecode { path: String, reason: String },

    /// The requested path is not present in the tree or the archive index.
    #[error("could not load file content: no member at {0:?}")]
    MemberNotFound(String),

    /// Re-encoding the tree into a new archive failed.
    #[error("could not build archive: {0}")]
    Serialization(String),

    /// The member is on the binary denylist and is never decoded as text.
    #[error("{0} is a binary file and cannot be shown as text")]
    BinaryMember(String),

    /// The node has no content and there is no archive index to read it from.
    #[error("content for {0} is not available")]
    ContentUnavailable(String),

    /// An operation needed a loaded archive.
    #[error("no archive is loaded")]
    NotLoaded,

    #[error("unsupported compression method {method} for {path}")]
    UnsupportedCompression { path: String, method: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::ArchiveFormat(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
