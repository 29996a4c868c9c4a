//! Normalized results from external lookup services

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Name/value pair, named after the built-in attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExternalAttribute {
    pub name: String,
    pub value: String,
}

/// Uniform shape for every lookup provider
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExternalSearchResult {
    /// Provider name ("google_books", "discogs", "upcitemdb", "google_vision")
    pub source: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub attributes: Vec<ExternalAttribute>,
}

impl ExternalSearchResult {
    pub fn new(source: &str, title: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            title: title.into(),
            description: None,
            image_url: None,
            attributes: Vec::new(),
        }
    }

    /// Append an attribute, skipping blank values
    pub fn with_attribute(mut self, name: &str, value: Option<String>) -> Self {
        if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.attributes.push(ExternalAttribute {
                name: name.to_string(),
                value,
            });
        }
        self
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookLookupQuery {
    pub isbn: Option<String>,
    /// Free-text title/author search
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AlbumLookupQuery {
    pub q: Option<String>,
    pub barcode: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BarcodeLookupQuery {
    pub code: String,
}

/// Image to recognize, base64 encoded
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VisionLookupRequest {
    #[validate(length(min = 1, message = "Image data is required"))]
    pub data: String,
}
