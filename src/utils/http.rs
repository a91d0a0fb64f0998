// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::PortalConfig;
use crate::utils::text::decode_bytes;

/// The portal expects this on every request, GETs included.
const PORTAL_CONTENT_TYPE: &str = "charset=UTF-8";

/// Create a configured asynchronous HTTP client.
///
/// Called once at startup; a failure here is a configuration error and
/// should stop the process.
pub fn create_async_client(config: &PortalConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// GET a portal page and return its text.
///
/// Only `200 OK` counts as success; any other status is a
/// [`AppError::Fetch`].
pub async fn fetch_portal_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .header(CONTENT_TYPE, HeaderValue::from_static(PORTAL_CONTENT_TYPE))
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AppError::fetch(url, format!("unexpected status {status}")));
    }

    let bytes = response.bytes().await?;
    Ok(decode_bytes(&bytes))
}
