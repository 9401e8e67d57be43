//! Wikipedia city-information client.
//!
//! Single-attempt plain-text extract lookups against the MediaWiki API.
//! Response caching is left to whatever sits in front of this client.

use serde_json::Value;
use thiserror::Error;

const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Errors from city-information lookups.
#[derive(Debug, Error)]
pub enum WikiError {
    /// The HTTP request failed.
    #[error("Wikipedia request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response did not have the expected shape.
    #[error("Unexpected Wikipedia response: {0}")]
    Malformed(String),
}

/// Client for the Wikipedia extracts API.
#[derive(Debug, Clone)]
pub struct WikiClient {
    http: reqwest::Client,
    api_url: String,
}

impl WikiClient {
    /// Creates a client against the public Wikipedia API.
    pub fn new() -> Self {
        Self::with_api_url(DEFAULT_API_URL)
    }

    /// Creates a client against a custom endpoint.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    /// Fetches the cleaned plain-text extract for a page title.
    pub async fn city_extract(&self, city_name: &str) -> Result<String, WikiError> {
        let url = extract_url(&self.api_url, city_name);
        let body: Value = self.http.get(&url).send().await?.json().await?;
        parse_extract(&body)
    }
}

impl Default for WikiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the extracts query URL for a page title.
fn extract_url(api_url: &str, title: &str) -> String {
    format!(
        "{}?action=query&prop=extracts&explaintext&titles={}&format=json",
        api_url,
        urlencoding::encode(title)
    )
}

/// Pulls the extract text out of a MediaWiki query response.
fn parse_extract(body: &Value) -> Result<String, WikiError> {
    let pages = body
        .get("query")
        .and_then(|q| q.get("pages"))
        .and_then(|p| p.as_object())
        .ok_or_else(|| WikiError::Malformed("missing query.pages".to_string()))?;

    // The page sits under a key only Wikipedia knows; take the first one.
    let page = pages
        .values()
        .next()
        .ok_or_else(|| WikiError::Malformed("empty query.pages".to_string()))?;
    let extract = page
        .get("extract")
        .and_then(|e| e.as_str())
        .ok_or_else(|| WikiError::Malformed("missing extract".to_string()))?;

    Ok(clean_extract(extract))
}

/// Strips section heading markers and collapses surrounding whitespace.
fn clean_extract(extract: &str) -> String {
    extract
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !(line.starts_with("==") && line.ends_with("==")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_url_encodes_title() {
        let url = extract_url("https://en.wikipedia.org/w/api.php", "Rio de Janeiro");
        assert!(url.contains("titles=Rio%20de%20Janeiro"));
        assert!(url.starts_with("https://en.wikipedia.org/w/api.php?action=query"));
    }

    #[test]
    fn test_parse_extract() {
        let body = json!({
            "query": {
                "pages": {
                    "736": {
                        "pageid": 736,
                        "title": "Paris",
                        "extract": "Paris is the capital of France.\n\n== History ==\nLutetia."
                    }
                }
            }
        });

        let text = parse_extract(&body).unwrap();
        assert_eq!(text, "Paris is the capital of France.\nLutetia.");
    }

    #[test]
    fn test_parse_extract_rejects_malformed() {
        let body = json!({ "query": {} });
        assert!(matches!(
            parse_extract(&body),
            Err(WikiError::Malformed(_))
        ));

        let body = json!({ "query": { "pages": { "1": { "title": "No extract" } } } });
        assert!(matches!(
            parse_extract(&body),
            Err(WikiError::Malformed(_))
        ));
    }

    #[test]
    fn test_clean_extract_drops_headings() {
        let cleaned = clean_extract("Intro text.\n\n== Section ==\nBody.\n=== Deep ===\nMore.");
        assert_eq!(cleaned, "Intro text.\nBody.\nMore.");
    }
}
