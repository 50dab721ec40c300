//! ZIP archive reading and writing.
//!
//! - [`structures`]: on-disk records (EOCD, central and local headers)
//! - [`parser`]: low-level parsing of those records from a [`ReadAt`](crate::io::ReadAt) source
//! - [`index`]: path lookup and member decoding over an opened archive
//! - [`writer`]: in-memory archive construction on top of the `zip` crate
//!
//! The reader locates the End of Central Directory first and works from the
//! central directory, so listing an archive never touches member data.
//!
//! Supported: standard PKZIP archives, ZIP64 records when reading, STORED
//! and DEFLATE members. Not supported: encryption, multi-disk archives,
//! other compression methods.

mod index;
mod parser;
mod structures;
mod writer;

pub use index::{ArchiveIndex, decode_text, normalize_path};
pub use parser::ZipParser;
pub use structures::*;
pub use writer::ArchiveWriter;
