use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::api::UploadPart;
use crate::core::constants::MAX_UPLOAD_BYTES;

const PDF_MIME: &str = "application/pdf";
const TXT_MIME: &str = "text/plain";
const DOC_MIME: &str = "application/msword";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Which document kinds the drop target admits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AllowedTypes {
    #[default]
    PdfOnly,
    /// PDF, plain text, DOC and DOCX.
    Documents,
}

impl AllowedTypes {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            AllowedTypes::PdfOnly => &["pdf"],
            AllowedTypes::Documents => &["pdf", "txt", "doc", "docx"],
        }
    }

    fn mime_types(self) -> &'static [&'static str] {
        match self {
            AllowedTypes::PdfOnly => &[PDF_MIME],
            AllowedTypes::Documents => &[PDF_MIME, TXT_MIME, DOC_MIME, DOCX_MIME],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AllowedTypes::PdfOnly => "pdf-only",
            AllowedTypes::Documents => "documents",
        }
    }
}

impl TryFrom<&str> for AllowedTypes {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" | "pdf-only" => Ok(AllowedTypes::PdfOnly),
            "documents" | "docs" => Ok(AllowedTypes::Documents),
            other => Err(format!(
                "unknown upload type set '{other}' (expected pdf-only or documents)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptPolicy {
    pub max_bytes: u64,
    pub allowed: AllowedTypes,
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed: AllowedTypes::PdfOnly,
        }
    }
}

impl AcceptPolicy {
    pub fn check(&self, file: &PendingFile) -> Result<(), Rejection> {
        if file.size_bytes > self.max_bytes {
            return Err(Rejection::TooLarge {
                filename: file.filename.clone(),
                size_bytes: file.size_bytes,
                limit_bytes: self.max_bytes,
            });
        }

        let extension_ok = extension_of(&file.filename)
            .is_some_and(|ext| self.allowed.extensions().contains(&ext.as_str()));
        let mime_ok = file
            .declared_mime
            .as_deref()
            .is_some_and(|mime| self.allowed.mime_types().contains(&mime));
        if !(extension_ok || mime_ok) {
            return Err(Rejection::UnsupportedType {
                filename: file.filename.clone(),
                allowed: self.allowed,
            });
        }
        Ok(())
    }
}

/// Why a dropped file never became an upload record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooLarge {
        filename: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
    UnsupportedType {
        filename: String,
        allowed: AllowedTypes,
    },
}

impl Rejection {
    pub fn filename(&self) -> &str {
        match self {
            Rejection::TooLarge { filename, .. } | Rejection::UnsupportedType { filename, .. } => {
                filename
            }
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooLarge {
                filename,
                size_bytes,
                limit_bytes,
            } => write!(
                f,
                "{filename} is {} (limit {})",
                format_file_size(*size_bytes),
                format_file_size(*limit_bytes)
            ),
            Rejection::UnsupportedType { filename, allowed } => {
                write!(
                    f,
                    "{filename} is not an accepted type (allowed: {})",
                    allowed.extensions().join(", ")
                )
            }
        }
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Contents {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A file offered to the drop target, not yet admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    filename: String,
    size_bytes: u64,
    declared_mime: Option<String>,
    contents: Contents,
}

impl PendingFile {
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            size_bytes: bytes.len() as u64,
            declared_mime: None,
            contents: Contents::Bytes(bytes),
        }
    }

    /// Reference a file on disk; contents are read only once the upload starts.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            filename,
            size_bytes: metadata.len(),
            declared_mime: None,
            contents: Contents::Path(path.to_path_buf()),
        })
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.declared_mime = Some(mime_type.into());
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn mime_type(&self) -> String {
        self.declared_mime
            .clone()
            .unwrap_or_else(|| guess_mime(&self.filename).to_string())
    }

    pub(crate) async fn into_part(self) -> io::Result<UploadPart> {
        let mime_type = self.mime_type();
        let bytes = match self.contents {
            Contents::Bytes(bytes) => bytes,
            Contents::Path(path) => tokio::fs::read(&path).await?,
        };
        Ok(UploadPart {
            filename: self.filename,
            mime_type,
            bytes,
        })
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn guess_mime(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("pdf") => PDF_MIME,
        Some("txt") => TXT_MIME,
        Some("doc") => DOC_MIME,
        Some("docx") => DOCX_MIME,
        _ => FALLBACK_MIME,
    }
}

/// Human-readable size, e.g. `2 MB` or `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
