//! # snipzip
//!
//! Client-side ZIP handling for a code-sharing site.
//!
//! An uploaded or downloaded archive is parsed in memory, turned into a
//! browsable file tree, edited file by file and re-encoded into a new
//! archive. Nothing is ever extracted to disk.
//!
//! ## Features
//!
//! - File tree built from the central directory, with `__MACOSX` and
//!   dot-prefixed entries hidden and a lone top-level folder collapsed
//! - Eager decoding of source files on upload, or lazy per-file decoding
//!   when browsing a shared archive
//! - Language classification by extension or by source heuristics
//! - Editing through an overlay, repacking into a fresh archive
//! - Listing, downloading and submitting snippets on the remote service
//!
//! ## Example
//!
//! ```no_run
//! use snipzip::{ArchiveSession, BuildOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> snipzip::Result<()> {
//!     let bytes = std::fs::read("project.zip")?;
//!
//!     let mut session = ArchiveSession::new();
//!     session.load(bytes, BuildOptions::lazy()).await?;
//!
//!     if let Some(path) = session.selected().map(str::to_owned) {
//!         let text = session.get_content(&path).await?;
//!         session.update_content(&path, text.to_uppercase(), None)?;
//!     }
//!
//!     let repacked = session.serialize().await?;
//!     std::fs::write("project-edited.zip", repacked)?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod error;
pub mod io;
pub mod language;
pub mod logging;
pub mod session;
pub mod tree;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{MemoryReader, ReadAt};
pub use logging::init_logging;
pub use session::{ArchiveSession, EditOverlay, SessionState};
pub use tree::{BuildOptions, ContentMode, FileNode, FileSystemNode, TextFilter, build_tree};
pub use crate::zip::{ArchiveIndex, ArchiveWriter, ZipFileEntry};
