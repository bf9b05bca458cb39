use std::fmt;
use std::path::{Path, PathBuf};

use crate::ReadError;
use crate::mime::sniff_mime_type;

/// A local file selected for upload.
///
/// The handle only describes the file; readers open it on demand so one
/// upload can re-read it for a retry without keeping a descriptor around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Local path the bytes are read from.
    pub path: PathBuf,
    /// File name as shown to the user and suggested to the metadata service.
    pub name: String,
    /// Size in bytes at the time the handle was created.
    pub size: u64,
    /// MIME type sent with the authorization request.
    pub mime_type: String,
}

impl FileHandle {
    /// Stats `path` and builds a handle, sniffing the MIME type from the
    /// file extension.
    pub async fn from_path(path: &Path) -> Result<Self, ReadError> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(ReadError::NotAFile(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = sniff_mime_type(&name).to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            mime_type,
        })
    }

    /// Overrides the sniffed MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Lowercased extension including the leading dot (`".png"`), or an
    /// empty string when the name has none.
    pub fn extension(&self) -> String {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => self.name[idx..].to_lowercase(),
            _ => String::new(),
        }
    }
}

/// A chunk of file data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position of this chunk in the file.
    pub index: u64,
    /// Byte offset within the file.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Length of the chunk in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// MD5 digest of a file's full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Lowercase hex rendering (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
