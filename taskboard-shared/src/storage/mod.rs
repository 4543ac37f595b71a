/// External image storage
///
/// Profile pictures live outside the database. The [`ImageStore`] trait is
/// the seam: production uses [`cloudinary::CloudinaryStore`], deployments
/// without credentials use [`DisabledImageStore`], and tests plug in their
/// own recorder.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::storage::{validate_image, ImageStore, ImageUpload};
///
/// # async fn example(store: &dyn ImageStore, bytes: bytes::Bytes) -> Result<(), Box<dyn std::error::Error>> {
/// let upload = ImageUpload {
///     bytes,
///     file_name: "me.png".to_string(),
///     content_type: "image/png".to_string(),
/// };
/// validate_image(&upload)?;
///
/// let stored = store.upload(upload).await?;
/// store.delete(&stored.public_id).await?;
/// # Ok(())
/// # }
/// ```

pub mod cloudinary;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted image formats (matched against file extension and MIME subtype)
pub const ALLOWED_FORMATS: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// File type is not an accepted image format
    #[error("Only image files are allowed!")]
    UnsupportedType,

    /// File exceeds [`MAX_IMAGE_BYTES`]
    #[error("File too large! Maximum size is 5 MB.")]
    TooLarge,

    /// No storage backend is configured
    #[error("Image storage is not configured")]
    NotConfigured,

    /// Transport failure talking to the storage service
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage service refused the request
    #[error("Storage service rejected the request: {0}")]
    Rejected(String),
}

/// Image received from a client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: String,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// Public HTTPS URL
    pub url: String,

    /// Reference used to delete the image later
    pub public_id: String,
}

/// Image storage backend
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores an image and returns where it lives
    async fn upload(&self, image: ImageUpload) -> Result<StoredImage, StorageError>;

    /// Removes a previously stored image
    async fn delete(&self, public_id: &str) -> Result<(), StorageError>;
}

/// Checks size, file extension and MIME type
///
/// Both the extension and the MIME type must name an accepted format.
pub fn validate_image(image: &ImageUpload) -> Result<(), StorageError> {
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(StorageError::TooLarge);
    }

    let file_name = image.file_name.to_ascii_lowercase();
    let extension_ok = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_FORMATS.contains(&ext))
        .unwrap_or(false);

    let content_type = image.content_type.to_ascii_lowercase();
    let mime_ok = content_type
        .strip_prefix("image/")
        .map(|subtype| ALLOWED_FORMATS.contains(&subtype))
        .unwrap_or(false);

    if extension_ok && mime_ok {
        Ok(())
    } else {
        Err(StorageError::UnsupportedType)
    }
}

/// Backend used when no storage credentials are configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _image: ImageUpload) -> Result<StoredImage, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn delete(&self, _public_id: &str) -> Result<(), StorageError> {
        Err(StorageError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: &str, content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            bytes: Bytes::from(vec![0u8; len]),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_accepts_supported_images() {
        assert!(validate_image(&upload("me.png", "image/png", 10)).is_ok());
        assert!(validate_image(&upload("ME.JPG", "image/jpeg", 10)).is_ok());
        assert!(validate_image(&upload("a.b.webp", "image/webp", 10)).is_ok());
        assert!(validate_image(&upload("anim.gif", "image/gif", MAX_IMAGE_BYTES)).is_ok());
    }

    #[test]
    fn test_rejects_other_types() {
        assert!(matches!(
            validate_image(&upload("doc.pdf", "application/pdf", 10)),
            Err(StorageError::UnsupportedType)
        ));
        assert!(matches!(
            validate_image(&upload("fake.png", "text/plain", 10)),
            Err(StorageError::UnsupportedType)
        ));
        assert!(matches!(
            validate_image(&upload("noext", "image/png", 10)),
            Err(StorageError::UnsupportedType)
        ));
        assert!(matches!(
            validate_image(&upload("icon.svg", "image/svg+xml", 10)),
            Err(StorageError::UnsupportedType)
        ));
    }

    #[test]
    fn test_rejects_oversized_images() {
        assert!(matches!(
            validate_image(&upload("big.png", "image/png", MAX_IMAGE_BYTES + 1)),
            Err(StorageError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_disabled_store() {
        let store = DisabledImageStore;
        assert!(matches!(
            store.upload(upload("me.png", "image/png", 1)).await,
            Err(StorageError::NotConfigured)
        ));
        assert!(matches!(store.delete("x").await, Err(StorageError::NotConfigured)));
    }
}
