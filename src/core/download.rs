//! Archive download with browser-emulating headers.
//!
//! The origin rejects plain programmatic requests, so the request carries
//! the fixed header set a desktop browser would send. The body is
//! streamed straight to the archive path, overwriting any previous file.

use std::fs::File;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Fixed request headers, mirroring a desktop Chromium navigation.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("Host", "www.minecraft.net"),
    ("Sec-Ch-Ua", "\"Not:A-Brand\";v=\"99\", \"Chromium\";v=\"112\""),
    ("Sec-Ch-Ua-Mobile", "?0"),
    ("Sec-Ch-Ua-Platform", "\"Windows\""),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.5615.50 Safari/537.36",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("Sec-Fetch-Site", "same-origin"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-User", "?1"),
    ("Sec-Fetch-Dest", "document"),
    ("Referer", "https://www.minecraft.net/en-us/download/server/bedrock"),
    ("Accept-Encoding", "gzip, deflate"),
    ("Accept-Language", "en-US,en;q=0.9"),
];

fn browser_headers() -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len());
    for (name, value) in BROWSER_HEADERS {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("build header {}", name)))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("build header {}", name)))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Download the archive at `url` to `output`, overwriting.
pub fn download_archive(url: &str, output: &Path) -> Result<()> {
    log_status!("download", "Fetching {}", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

    let mut response = client
        .get(url)
        .headers(browser_headers()?)
        .send()
        .map_err(|e| Error::download_failed(url, e.to_string(), None))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::download_failed(
            url,
            format!("HTTP {}", status.as_u16()),
            Some(status.as_u16()),
        ));
    }

    let mut file = File::create(output).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("create {}", output.display())))
    })?;

    response
        .copy_to(&mut file)
        .map_err(|e| Error::download_failed(url, e.to_string(), Some(status.as_u16())))?;

    log_status!("download", "Saved archive to {}", output.display());
    Ok(())
}
