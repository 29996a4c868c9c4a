//! Item and location images

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Largest accepted image, after base64 decoding
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit for routes carrying a base64 image: the encoded size of
/// `MAX_IMAGE_BYTES` plus room for the surrounding JSON
pub const MAX_UPLOAD_BODY_BYTES: usize = (MAX_IMAGE_BYTES + 2) / 3 * 4 + 64 * 1024;

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Image metadata (without payload)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImageInfo {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Image payload as stored
#[derive(Debug, Clone, FromRow)]
pub struct ImageData {
    pub id: Uuid,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Upload request, payload encoded as base64
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UploadImage {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    pub content_type: String,
    /// Base64 (standard alphabet) encoded image bytes
    pub data: String,
}

/// Validated, decoded upload
#[derive(Debug)]
pub struct NewImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadImage {
    /// Check the content type and decode the payload
    pub fn decode(self) -> AppResult<NewImage> {
        let content_type = self.content_type.to_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::Validation(format!(
                "Unsupported image type: {}",
                self.content_type
            )));
        }

        let data = STANDARD
            .decode(self.data.trim())
            .map_err(|e| AppError::Validation(format!("Invalid base64 image data: {}", e)))?;

        if data.is_empty() {
            return Err(AppError::Validation("Image is empty".to_string()));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "Image exceeds {} bytes",
                MAX_IMAGE_BYTES
            )));
        }

        Ok(NewImage {
            file_name: self.file_name,
            content_type,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, data: &str) -> UploadImage {
        UploadImage {
            file_name: "shelf.png".to_string(),
            content_type: content_type.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_decode_valid_image() {
        let encoded = STANDARD.encode([0x89, b'P', b'N', b'G']);
        let image = upload("IMAGE/PNG", &encoded).decode().unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.data.len(), 4);
    }

    #[test]
    fn test_rejects_unknown_type() {
        let encoded = STANDARD.encode(b"hello");
        assert!(upload("text/plain", &encoded).decode().is_err());
    }

    #[test]
    fn test_rejects_bad_base64_and_empty() {
        assert!(upload("image/png", "***").decode().is_err());
        assert!(upload("image/png", "").decode().is_err());
    }
}
