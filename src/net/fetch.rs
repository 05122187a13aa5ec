use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{PageError, UnreachableReason};

/// Result of fetching a target
#[derive(Clone)]
pub struct FetchResult {
    pub html: String,
    pub url: String,
    pub status: u16,
    pub content_type: String,
}

/// Fetch a target and return its HTML content (blocking).
///
/// `http(s)` targets go over the network; `file://` URLs and bare paths are
/// read from disk.
pub fn fetch_target(target: &str) -> Result<FetchResult, PageError> {
    match Url::parse(target) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => fetch_url(&url),
        Ok(url) if url.scheme() == "file" => {
            let path = url.to_file_path().map_err(|_| {
                PageError::new(UnreachableReason::Offline, format!("Invalid file URL: {}", target))
            })?;
            read_file(&path, url.as_str())
        }
        Ok(url) => Err(PageError::new(
            UnreachableReason::Forbidden,
            format!("Unsupported scheme: {}", url.scheme()),
        )),
        Err(_) => {
            let path = PathBuf::from(target);
            let url = std::fs::canonicalize(&path)
                .ok()
                .and_then(|abs| Url::from_file_path(abs).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| target.to_string());
            read_file(&path, &url)
        }
    }
}

fn fetch_url(url: &Url) -> Result<FetchResult, PageError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("regex-page-search/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(15))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| PageError::disconnected(format!("Client error: {}", e)))?;

    let response = client
        .get(url.as_str())
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .send()
        .map_err(|e| PageError::disconnected(format!("Request failed: {}", e)))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_string();

    if !is_text_content(&content_type) {
        return Err(PageError::new(
            UnreachableReason::UnsupportedFormat,
            format!("Cannot search {} content", content_type),
        ));
    }

    let final_url = response.url().to_string();

    let html = response
        .text()
        .map_err(|e| PageError::disconnected(format!("Failed to read body: {}", e)))?;

    log::info!("Fetched {} ({}, {} bytes)", final_url, status, html.len());

    Ok(FetchResult {
        html,
        url: final_url,
        status,
        content_type,
    })
}

fn read_file(path: &Path, url: &str) -> Result<FetchResult, PageError> {
    let html = std::fs::read_to_string(path).map_err(|e| {
        PageError::new(
            UnreachableReason::Offline,
            format!("Cannot read {}: {}", path.display(), e),
        )
    })?;

    log::info!("Loaded {} ({} bytes)", path.display(), html.len());

    Ok(FetchResult {
        html,
        url: url.to_string(),
        status: 200,
        content_type: "text/html".to_string(),
    })
}

fn is_text_content(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    mime.starts_with("text/") || mime == "application/xhtml+xml" || mime == "application/xml"
}
