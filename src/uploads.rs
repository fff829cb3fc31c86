//! Image upload contract shared by orders (reference photos) and the
//! catalog (product images).
//!
//! Validation runs before any I/O: oversized or non-image payloads never
//! reach the backend. With a remote backend the bytes go to object
//! storage and a public URL comes back; in local mode the image is inlined
//! as a `data:` URL and lives only inside the stored record.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use tracing::{info, warn};

use crate::error::{ServiceError, UploadError};
use crate::ids;
use crate::remote::SupabaseClient;

/// Hard client-side ceiling (5 MB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Storage folder for customer reference photos.
pub const ORDERS_FOLDER: &str = "orders";
/// Storage folder for catalog images.
pub const PRODUCTS_FOLDER: &str = "products";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reject anything that is not `image/*` or exceeds [`MAX_IMAGE_BYTES`].
    pub fn validate(&self) -> Result<(), UploadError> {
        let mime = self.content_type.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") {
            return Err(UploadError::NotAnImage(self.content_type.clone()));
        }
        if self.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge {
                size: self.bytes.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }
        Ok(())
    }

    /// Extension after the last dot of the original file name. A name
    /// without a dot yields the whole name.
    pub fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or_default()
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type.trim(),
            BASE64_STANDARD.encode(&self.bytes)
        )
    }

    /// `<folder>/<millis>-<random>.<ext>`
    pub fn storage_path(&self, folder: &str) -> String {
        format!("{folder}/{}", ids::upload_file_name(self.extension()))
    }
}

/// Store the image with the active backend and return a retrievable URL.
pub(crate) async fn store_image(
    remote: Option<SupabaseClient>,
    upload: ImageUpload,
    folder: &str,
) -> Result<String, ServiceError> {
    upload.validate()?;

    let Some(client) = remote else {
        return Ok(upload.to_data_url());
    };

    let path = upload.storage_path(folder);
    let content_type = upload.content_type.trim().to_string();
    client
        .upload_object(&path, upload.bytes, &content_type)
        .await
        .map_err(|e| {
            warn!(path = %path, error = %e, "image upload failed");
            ServiceError::Persistence("Failed to upload image".into())
        })?;
    info!(path = %path, "image uploaded");
    Ok(client.public_url(&path))
}
