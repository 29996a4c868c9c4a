//! External metadata lookups (books, albums, barcodes, image recognition)
//!
//! Every provider is normalized into [`ExternalSearchResult`] with attribute names
//! matching the built-in attributes, so results can be applied to items directly.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    config::LookupConfig,
    error::{AppError, AppResult},
    models::lookup::ExternalSearchResult,
};

pub const SOURCE_BOOKS: &str = "google_books";
pub const SOURCE_DISCOGS: &str = "discogs";
pub const SOURCE_UPC: &str = "upcitemdb";
pub const SOURCE_VISION: &str = "google_vision";

// Google Books

#[derive(Debug, Default, Deserialize)]
pub struct BooksResponse {
    #[serde(default)]
    pub items: Vec<BookVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookVolume {
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<u32>,
    pub industry_identifiers: Vec<IndustryIdentifier>,
    pub categories: Vec<String>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
    #[serde(rename = "smallThumbnail")]
    pub small_thumbnail: Option<String>,
}

pub fn normalize_books(response: BooksResponse, max_results: usize) -> Vec<ExternalSearchResult> {
    response
        .items
        .into_iter()
        .filter_map(|volume| {
            let info = volume.volume_info;
            let title = match (info.title, info.subtitle) {
                (Some(title), Some(subtitle)) => format!("{}: {}", title, subtitle),
                (Some(title), None) => title,
                (None, _) => return None,
            };

            // Prefer ISBN-13 over ISBN-10
            let isbn = info
                .industry_identifiers
                .iter()
                .find(|id| id.kind == "ISBN_13")
                .or_else(|| info.industry_identifiers.iter().find(|id| id.kind == "ISBN_10"))
                .map(|id| id.identifier.clone());

            let mut result = ExternalSearchResult::new(SOURCE_BOOKS, title)
                .with_attribute("Author(s)", join_non_empty(&info.authors))
                .with_attribute("Publisher", info.publisher)
                .with_attribute("Published", info.published_date)
                .with_attribute("Pages", info.page_count.map(|p| p.to_string()))
                .with_attribute("ISBN", isbn)
                .with_attribute("Genre", join_non_empty(&info.categories));
            result.description = info.description;
            result.image_url = info.image_links.and_then(|l| l.thumbnail.or(l.small_thumbnail));
            Some(result)
        })
        .take(max_results)
        .collect()
}

// Discogs

#[derive(Debug, Default, Deserialize)]
pub struct DiscogsResponse {
    #[serde(default)]
    pub results: Vec<DiscogsRelease>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiscogsRelease {
    /// "Artist - Title"
    pub title: String,
    pub year: Option<String>,
    pub label: Vec<String>,
    pub genre: Vec<String>,
    pub style: Vec<String>,
    pub country: Option<String>,
    pub format: Vec<String>,
    pub barcode: Vec<String>,
    pub cover_image: Option<String>,
    pub thumb: Option<String>,
}

/// Split "Artist - Title" as used by Discogs search results
pub fn split_discogs_title(raw: &str) -> (Option<String>, String) {
    match raw.split_once(" - ") {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            (Some(artist.trim().to_string()), title.trim().to_string())
        }
        _ => (None, raw.trim().to_string()),
    }
}

pub fn normalize_discogs(response: DiscogsResponse, max_results: usize) -> Vec<ExternalSearchResult> {
    response
        .results
        .into_iter()
        .filter(|r| !r.title.trim().is_empty())
        .take(max_results)
        .map(|release| {
            let (artist, title) = split_discogs_title(&release.title);
            let mut genres = release.genre.clone();
            genres.extend(release.style.iter().cloned());

            let mut result = ExternalSearchResult::new(SOURCE_DISCOGS, title)
                .with_attribute("Artist", artist)
                .with_attribute("Label", release.label.first().cloned())
                .with_attribute("Year", release.year.clone())
                .with_attribute("Genre", join_non_empty(&genres))
                .with_attribute("Barcode", release.barcode.first().cloned());

            let details: Vec<String> = release
                .format
                .iter()
                .cloned()
                .chain(release.country.clone())
                .collect();
            result.description = join_non_empty(&details);
            result.image_url = release
                .cover_image
                .filter(|u| !u.is_empty())
                .or(release.thumb.filter(|u| !u.is_empty()));
            result
        })
        .collect()
}

// UPCitemdb

#[derive(Debug, Default, Deserialize)]
pub struct UpcResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub items: Vec<UpcItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpcItem {
    pub ean: Option<String>,
    pub upc: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub images: Vec<String>,
}

pub fn normalize_upc(response: UpcResponse, max_results: usize) -> Vec<ExternalSearchResult> {
    response
        .items
        .into_iter()
        .filter(|i| !i.title.trim().is_empty())
        .take(max_results)
        .map(|item| {
            let mut result = ExternalSearchResult::new(SOURCE_UPC, item.title.trim())
                .with_attribute("Brand", item.brand)
                .with_attribute("Barcode", item.ean.or(item.upc))
                .with_attribute("Genre", item.category);
            result.description = item.description.filter(|d| !d.trim().is_empty());
            result.image_url = item.images.into_iter().next();
            result
        })
        .collect()
}

// Google Vision

#[derive(Debug, Default, Deserialize)]
pub struct VisionResponse {
    #[serde(default)]
    pub responses: Vec<VisionAnnotation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisionAnnotation {
    pub label_annotations: Vec<VisionLabel>,
    pub web_detection: Option<WebDetection>,
    pub error: Option<VisionError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VisionLabel {
    pub description: String,
    pub score: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebDetection {
    pub best_guess_labels: Vec<BestGuessLabel>,
    pub web_entities: Vec<VisionLabel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BestGuessLabel {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct VisionError {
    pub message: String,
}

/// Best guesses first, then web entities and labels by score, without duplicates
pub fn normalize_vision(response: VisionResponse, max_results: usize) -> AppResult<Vec<ExternalSearchResult>> {
    let annotation = response.responses.into_iter().next().unwrap_or_default();
    if let Some(error) = annotation.error {
        return Err(AppError::ExternalApi(format!("Vision API error: {}", error.message)));
    }

    let mut guesses: Vec<(String, String)> = Vec::new();
    let mut scored: Vec<(f64, String, &str)> = Vec::new();

    if let Some(web) = annotation.web_detection {
        guesses.extend(web.best_guess_labels.into_iter().map(|l| (l.label, "Best guess".to_string())));
        scored.extend(web.web_entities.into_iter().map(|e| (e.score, e.description, "Web entity")));
    }
    scored.extend(annotation.label_annotations.into_iter().map(|l| (l.score, l.description, "Label")));
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    guesses.extend(scored.into_iter().map(|(_, text, kind)| (text, kind.to_string())));

    let mut seen = std::collections::HashSet::new();
    Ok(guesses
        .into_iter()
        .filter(|(text, _)| !text.trim().is_empty() && seen.insert(text.trim().to_lowercase()))
        .take(max_results)
        .map(|(text, kind)| {
            let mut result = ExternalSearchResult::new(SOURCE_VISION, text.trim());
            result.description = Some(kind);
            result
        })
        .collect())
}

fn join_non_empty(values: &[String]) -> Option<String> {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

/// HTTP client for the lookup providers
#[derive(Clone)]
pub struct LookupService {
    client: Client,
    config: LookupConfig,
}

impl LookupService {
    pub fn new(config: LookupConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("MyVentory/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn fetch<T: DeserializeOwned>(&self, provider: &str, request: RequestBuilder) -> AppResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider, status = status.as_u16(), "Lookup provider returned an error");
            debug!(provider, body = %body, "Lookup error body");
            return Err(AppError::ExternalApi(format!("{} returned HTTP {}", provider, status.as_u16())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Invalid response from {}: {}", provider, e)))
    }

    /// Search Google Books by ISBN or free text
    pub async fn books(&self, isbn: Option<&str>, text: Option<&str>) -> AppResult<Vec<ExternalSearchResult>> {
        let q = match (clean(isbn), clean(text)) {
            (Some(isbn), _) => format!("isbn:{}", isbn.replace(['-', ' '], "")),
            (None, Some(text)) => text.to_string(),
            (None, None) => return Err(AppError::Validation("Either isbn or q is required".to_string())),
        };

        let mut params = vec![
            ("q".to_string(), q),
            ("maxResults".to_string(), self.config.max_results.clamp(1, 40).to_string()),
        ];
        if let Some(ref key) = self.config.books_api_key {
            params.push(("key".to_string(), key.clone()));
        }

        let url = format!("{}/volumes", self.config.books_url.trim_end_matches('/'));
        debug!("GET {}", url);
        let response: BooksResponse = self.fetch(SOURCE_BOOKS, self.client.get(&url).query(&params)).await?;
        Ok(normalize_books(response, self.config.max_results))
    }

    /// Search Discogs releases by text or barcode
    pub async fn albums(&self, text: Option<&str>, barcode: Option<&str>) -> AppResult<Vec<ExternalSearchResult>> {
        let token = self
            .config
            .discogs_token
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("Album lookup is not configured".to_string()))?;

        let mut params = vec![
            ("type".to_string(), "release".to_string()),
            ("per_page".to_string(), self.config.max_results.to_string()),
            ("token".to_string(), token.to_string()),
        ];
        match (clean(text), clean(barcode)) {
            (_, Some(barcode)) => params.push(("barcode".to_string(), barcode.to_string())),
            (Some(text), None) => params.push(("q".to_string(), text.to_string())),
            (None, None) => return Err(AppError::Validation("Either q or barcode is required".to_string())),
        }

        let url = format!("{}/database/search", self.config.discogs_url.trim_end_matches('/'));
        debug!("GET {}", url);
        let response: DiscogsResponse = self.fetch(SOURCE_DISCOGS, self.client.get(&url).query(&params)).await?;
        Ok(normalize_discogs(response, self.config.max_results))
    }

    /// Look up a UPC/EAN product code
    pub async fn barcode(&self, code: &str) -> AppResult<Vec<ExternalSearchResult>> {
        let code = clean(Some(code)).ok_or_else(|| AppError::Validation("Barcode is required".to_string()))?;
        if !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation("Barcode must contain digits only".to_string()));
        }

        let url = format!("{}/lookup", self.config.upc_url.trim_end_matches('/'));
        debug!("GET {}", url);
        let response: UpcResponse = self
            .fetch(SOURCE_UPC, self.client.get(&url).query(&[("upc", code)]))
            .await?;
        if !response.code.is_empty() && response.code != "OK" {
            return Err(AppError::ExternalApi(format!(
                "{}: {}",
                SOURCE_UPC,
                response.message.unwrap_or(response.code)
            )));
        }
        Ok(normalize_upc(response, self.config.max_results))
    }

    /// Recognize an image (base64) with label and web detection
    pub async fn vision(&self, image_base64: &str) -> AppResult<Vec<ExternalSearchResult>> {
        let key = self
            .config
            .vision_api_key
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("Image recognition is not configured".to_string()))?;

        let body = json!({
            "requests": [{
                "image": { "content": image_base64.trim() },
                "features": [
                    { "type": "LABEL_DETECTION", "maxResults": self.config.max_results },
                    { "type": "WEB_DETECTION", "maxResults": self.config.max_results }
                ]
            }]
        });

        let url = format!("{}/images:annotate", self.config.vision_url.trim_end_matches('/'));
        debug!("POST {}", url);
        let response: VisionResponse = self
            .fetch(SOURCE_VISION, self.client.post(&url).query(&[("key", key)]).json(&body))
            .await?;
        normalize_vision(response, self.config.max_results)
    }
}

fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute<'a>(result: &'a ExternalSearchResult, name: &str) -> Option<&'a str> {
        result
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    #[test]
    fn test_books_normalization() {
        let raw = r#"{
            "totalItems": 2,
            "items": [
                {"volumeInfo": {
                    "title": "The Hobbit",
                    "subtitle": "There and Back Again",
                    "authors": ["J. R. R. Tolkien"],
                    "publisher": "HarperCollins",
                    "publishedDate": "2012-09-18",
                    "pageCount": 300,
                    "industryIdentifiers": [
                        {"type": "ISBN_10", "identifier": "0007487282"},
                        {"type": "ISBN_13", "identifier": "9780007487288"}
                    ],
                    "categories": ["Fiction"],
                    "imageLinks": {"thumbnail": "http://books.google.com/hobbit.jpg"}
                }},
                {"volumeInfo": {"authors": ["Nobody"]}}
            ]
        }"#;
        let results = normalize_books(serde_json::from_str(raw).unwrap(), 10);

        assert_eq!(results.len(), 1);
        let book = &results[0];
        assert_eq!(book.source, SOURCE_BOOKS);
        assert_eq!(book.title, "The Hobbit: There and Back Again");
        assert_eq!(attribute(book, "Author(s)"), Some("J. R. R. Tolkien"));
        assert_eq!(attribute(book, "ISBN"), Some("9780007487288"));
        assert_eq!(attribute(book, "Pages"), Some("300"));
        assert_eq!(attribute(book, "Published"), Some("2012-09-18"));
        assert_eq!(book.image_url.as_deref(), Some("http://books.google.com/hobbit.jpg"));
    }

    #[test]
    fn test_empty_books_response() {
        let results = normalize_books(serde_json::from_str(r#"{"totalItems": 0}"#).unwrap(), 10);
        assert!(results.is_empty());
    }

    #[test]
    fn test_discogs_normalization() {
        let raw = r#"{
            "pagination": {"items": 1},
            "results": [{
                "title": "Radiohead - OK Computer",
                "year": "1997",
                "label": ["Parlophone", "EMI"],
                "genre": ["Rock"],
                "style": ["Alternative Rock"],
                "format": ["CD", "Album"],
                "country": "UK",
                "barcode": ["724385522925"],
                "cover_image": "https://img.discogs.com/okc.jpg"
            }]
        }"#;
        let results = normalize_discogs(serde_json::from_str(raw).unwrap(), 10);

        let album = &results[0];
        assert_eq!(album.title, "OK Computer");
        assert_eq!(attribute(album, "Artist"), Some("Radiohead"));
        assert_eq!(attribute(album, "Label"), Some("Parlophone"));
        assert_eq!(attribute(album, "Year"), Some("1997"));
        assert_eq!(attribute(album, "Genre"), Some("Rock, Alternative Rock"));
        assert_eq!(attribute(album, "Barcode"), Some("724385522925"));
        assert_eq!(album.description.as_deref(), Some("CD, Album, UK"));
    }

    #[test]
    fn test_discogs_title_without_artist() {
        assert_eq!(split_discogs_title("Untitled"), (None, "Untitled".to_string()));
        assert_eq!(
            split_discogs_title("Various - Now 42"),
            (Some("Various".to_string()), "Now 42".to_string())
        );
    }

    #[test]
    fn test_upc_normalization() {
        let raw = r#"{
            "code": "OK",
            "total": 1,
            "items": [{
                "ean": "0885909950805",
                "title": "Apple iPhone 6",
                "brand": "Apple",
                "category": "Electronics > Phones",
                "description": "",
                "images": ["https://img.example/iphone.jpg"]
            }]
        }"#;
        let results = normalize_upc(serde_json::from_str(raw).unwrap(), 10);

        let product = &results[0];
        assert_eq!(product.source, SOURCE_UPC);
        assert_eq!(attribute(product, "Brand"), Some("Apple"));
        assert_eq!(attribute(product, "Barcode"), Some("0885909950805"));
        assert!(product.description.is_none());
        assert_eq!(product.image_url.as_deref(), Some("https://img.example/iphone.jpg"));
    }

    #[test]
    fn test_vision_normalization() {
        let raw = r#"{
            "responses": [{
                "labelAnnotations": [
                    {"description": "Guitar", "score": 0.97},
                    {"description": "String instrument", "score": 0.92}
                ],
                "webDetection": {
                    "bestGuessLabels": [{"label": "fender stratocaster"}],
                    "webEntities": [
                        {"description": "Fender Stratocaster", "score": 1.4},
                        {"description": "Guitar", "score": 0.5}
                    ]
                }
            }]
        }"#;
        let results = normalize_vision(serde_json::from_str(raw).unwrap(), 10).unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();

        assert_eq!(titles, vec!["fender stratocaster", "Guitar", "String instrument"]);
        assert_eq!(results[0].description.as_deref(), Some("Best guess"));
    }

    #[test]
    fn test_vision_error_is_reported() {
        let raw = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        let err = normalize_vision(serde_json::from_str(raw).unwrap(), 10).unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn test_missing_keys_mean_unavailable() {
        let service = LookupService::new(LookupConfig::default()).unwrap();
        assert!(matches!(
            service.albums(Some("ok computer"), None).await,
            Err(AppError::ServiceUnavailable(_))
        ));
        assert!(matches!(
            service.vision("aGVsbG8=").await,
            Err(AppError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_input_validation() {
        let service = LookupService::new(LookupConfig::default()).unwrap();
        assert!(matches!(service.books(None, Some("  ")).await, Err(AppError::Validation(_))));
        assert!(matches!(service.barcode("12ab").await, Err(AppError::Validation(_))));
    }
}
