use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::{MemoryReader, ReadAt};
use crate::language::is_binary_by_extension;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Deflate cannot expand input by more than about 1032:1.
const MAX_DEFLATE_RATIO: usize = 1032;

/// Largest buffer reserved before any inflated bytes are seen.
const MAX_PREALLOC: usize = 64 << 20;

/// An opened archive that can be queried for members by path.
///
/// Opening reads the central directory once; member data is only read and
/// inflated when asked for.
pub struct ArchiveIndex<R: ReadAt = MemoryReader> {
    parser: ZipParser<R>,
    entries: Vec<ZipFileEntry>,
    by_path: HashMap<String, usize>,
}

impl<R: ReadAt> ArchiveIndex<R> {
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files().await?;

        let mut by_path = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.is_directory {
                continue;
            }
            // Later duplicates shadow earlier ones, like most unzip tools.
            by_path.insert(normalize_path(&entry.file_name), i);
        }

        tracing::debug!(entries = entries.len(), "opened archive index");
        Ok(Self {
            parser,
            entries,
            by_path,
        })
    }

    /// All entries, directories included, in central directory order.
    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a file member by its tree path.
    pub fn entry(&self, path: &str) -> Option<&ZipFileEntry> {
        self.by_path
            .get(&normalize_path(path))
            .map(|&i| &self.entries[i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entry(path).is_some()
    }

    /// Read and inflate a member's bytes.
    pub async fn read_member(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .entry(path)
            .ok_or_else(|| Error::MemberNotFound(path.to_string()))?;
        self.read_entry(entry).await
    }

    /// Read a member and decode it as UTF-8 text.
    ///
    /// Members on the binary denylist are refused without being read.
    pub async fn read_text(&self, path: &str) -> Result<String> {
        let entry = self
            .entry(path)
            .ok_or_else(|| Error::MemberNotFound(path.to_string()))?;
        if is_binary_by_extension(&entry.file_name) {
            return Err(Error::BinaryMember(path.to_string()));
        }
        let data = self.read_entry(entry).await?;
        decode_text(path, data)
    }

    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            return Err(Error::EntryDecode {
                path: entry.file_name.clone(),
                reason: "member is encrypted".to_string(),
            });
        }

        let raw = self.parser.read_raw(entry).await?;
        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let expected =
                    usize::try_from(entry.uncompressed_size).map_err(|_| Error::EntryDecode {
                        path: entry.file_name.clone(),
                        reason: "member is too large".to_string(),
                    })?;
                // The declared size is untrusted: cap the up-front allocation
                // and never inflate past it.
                let capacity = expected
                    .min(raw.len().saturating_mul(MAX_DEFLATE_RATIO))
                    .min(MAX_PREALLOC);
                let mut out = Vec::with_capacity(capacity);
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .map_err(|e| Error::EntryDecode {
                        path: entry.file_name.clone(),
                        reason: format!("corrupt deflate stream: {}", e),
                    })?;
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(Error::UnsupportedCompression {
                    path: entry.file_name.clone(),
                    method,
                });
            }
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if data.len() as u64 != entry.uncompressed_size || crc.sum() != entry.crc32 {
            return Err(Error::EntryDecode {
                path: entry.file_name.clone(),
                reason: "size or checksum mismatch".to_string(),
            });
        }

        Ok(data)
    }
}

impl ArchiveIndex<MemoryReader> {
    pub async fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::open(Arc::new(MemoryReader::new(bytes))).await
    }
}

/// Decode member bytes as UTF-8, dropping a leading byte order mark.
pub fn decode_text(path: &str, data: Vec<u8>) -> Result<String> {
    let mut text = String::from_utf8(data).map_err(|e| Error::EntryDecode {
        path: path.to_string(),
        reason: e.utf8_error().to_string(),
    })?;
    if text.starts_with('\u{feff}') {
        text.replace_range(..'\u{feff}'.len_utf8(), "");
    }
    Ok(text)
}

/// Forward-slash path with empty segments removed, so `/a//b/` and `a/b`
/// address the same member.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
