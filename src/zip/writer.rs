use ::zip::write::FileOptions;
use ::zip::{CompressionMethod, ZipWriter};
use std::collections::HashSet;
use std::io::{Cursor, Write};

use crate::error::{Error, Result};

/// Builds a ZIP archive in memory.
///
/// Members are deflated and written in the order they are added. Names are
/// stored as UTF-8.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    options: FileOptions,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Add an explicit directory entry. A trailing `/` is optional.
    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        let name = format!("{}/", path.trim_end_matches('/'));
        self.claim(&name)?;
        self.zip
            .add_directory(name.as_str(), self.options)
            .map_err(|e| serialization(&name, e))
    }

    pub fn add_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.claim(path)?;
        self.zip
            .start_file(path, self.options)
            .map_err(|e| serialization(path, e))?;
        self.zip
            .write_all(data)
            .map_err(|e| serialization(path, e))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn claim(&mut self, name: &str) -> Result<()> {
        if name.trim_matches('/').is_empty() {
            return Err(Error::Serialization("member name is empty".to_string()));
        }
        if !self.names.insert(name.to_string()) {
            return Err(Error::Serialization(format!("duplicate member {}", name)));
        }
        Ok(())
    }

    /// Write the central directory and return the finished archive.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let bytes = self
            .zip
            .finish()
            .map_err(|e| Error::Serialization(e.to_string()))?
            .into_inner();

        tracing::debug!(members = self.names.len(), bytes = bytes.len(), "wrote archive");
        Ok(bytes)
    }
}

fn serialization(name: &str, err: impl std::fmt::Display) -> Error {
    Error::Serialization(format!("{}: {}", name, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::{ArchiveIndex, CompressionMethod as Method, EndOfCentralDirectory};
    use std::io::Read;

    fn read_back(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn output_is_readable_by_other_tools() {
        let long = "print('hello')\n".repeat(100);
        let mut writer = ArchiveWriter::new();
        writer.add_directory("src").unwrap();
        writer.add_file("src/main.py", long.as_bytes()).unwrap();
        writer.add_file("src/tiny.txt", b"x").unwrap();
        writer.add_file("한글.md", "# 안녕".as_bytes()).unwrap();
        assert_eq!(writer.len(), 4);

        let members = read_back(writer.finish().unwrap());
        assert_eq!(
            members,
            vec![
                ("src/".to_string(), Vec::new()),
                ("src/main.py".to_string(), long.into_bytes()),
                ("src/tiny.txt".to_string(), b"x".to_vec()),
                ("한글.md".to_string(), "# 안녕".as_bytes().to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn members_are_deflated_and_readable_by_the_index() {
        let body = "fn main() {}\n".repeat(500);
        let mut writer = ArchiveWriter::new();
        writer.add_file("src/main.rs", body.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap();
        assert!(bytes.len() < body.len());

        let index = ArchiveIndex::from_bytes(bytes).await.unwrap();
        let entry = index.entry("src/main.rs").unwrap();
        assert_eq!(entry.compression_method, Method::Deflate);
        assert_eq!(index.read_text("src/main.rs").await.unwrap(), body);
    }

    #[test]
    fn empty_archive_is_valid() {
        let writer = ArchiveWriter::new();
        assert!(writer.is_empty());
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), EndOfCentralDirectory::SIZE);
        assert!(read_back(bytes).is_empty());
    }

    #[test]
    fn refuses_duplicate_and_empty_members() {
        let mut writer = ArchiveWriter::new();
        writer.add_file("a.txt", b"1").unwrap();
        assert!(matches!(
            writer.add_file("a.txt", b"2"),
            Err(Error::Serialization(_))
        ));
        assert!(matches!(writer.add_directory("/"), Err(Error::Serialization(_))));
    }
}
