use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::ImageStore;

/// Accepted content types and the extension stored files get.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub filename: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

pub struct UploadService<S> {
    store: S,
    max_bytes: usize,
    public_prefix: String,
}

impl<S: ImageStore> UploadService<S> {
    pub fn new(store: S, max_bytes: usize, public_prefix: impl Into<String>) -> Self {
        Self {
            store,
            max_bytes,
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validates the content type against the allow-list; returns the file extension.
    pub fn extension_for(content_type: &str) -> Result<&'static str, DomainError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| *mime == essence)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                DomainError::invalid(format!(
                    "unsupported file type '{essence}'; allowed: jpeg, png, webp, gif"
                ))
            })
    }

    pub fn store(&self, content_type: &str, bytes: &[u8]) -> Result<StoredImage, DomainError> {
        let ext = Self::extension_for(content_type)?;
        if bytes.is_empty() {
            return Err(DomainError::invalid("empty file"));
        }
        if bytes.len() > self.max_bytes {
            return Err(DomainError::invalid(format!(
                "file too large; maximum is {} bytes",
                self.max_bytes
            )));
        }

        let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
        self.store.save(&filename, bytes)?;
        log::info!("Stored upload {} ({} bytes)", filename, bytes.len());

        Ok(StoredImage {
            url: format!("{}/{}", self.public_prefix, filename),
            filename,
            size: bytes.len(),
            content_type: content_type.to_string(),
        })
    }

    pub fn delete(&self, filename: &str) -> Result<(), DomainError> {
        let filename = sanitize_filename(filename)?;
        if !self.store.delete(filename)? {
            return Err(DomainError::not_found("File"));
        }
        log::info!("Deleted upload {}", filename);
        Ok(())
    }
}

/// Accepts only a bare file name made of `[A-Za-z0-9._-]`, never `..`.
pub fn sanitize_filename(name: &str) -> Result<&str, DomainError> {
    let valid = !name.is_empty()
        && name != "."
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(name)
    } else {
        Err(DomainError::invalid(format!("invalid file name '{name}'")))
    }
}
