//! Latest-release discovery against the vendor download API.
//!
//! One GET to the links endpoint, then the `serverBedrockLinux` entry is
//! selected and the version is parsed out of the URL filename. The API
//! also carries a `version` field on some entries; the filename is the
//! authoritative source here and the field is ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const DOWNLOAD_LINKS_API: &str =
    "https://net-secondary.web.minecraft-services.net/api/v1.0/download/links";

/// The link entry for the Linux dedicated server build.
pub const LINUX_DOWNLOAD_TYPE: &str = "serverBedrockLinux";

/// Version placeholder when the filename does not match the pattern.
pub const UNKNOWN_VERSION: &str = "unknown";

const API_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub download_url: String,
    pub version: String,
}

impl ReleaseInfo {
    pub fn version_is_known(&self) -> bool {
        self.version != UNKNOWN_VERSION
    }
}

#[derive(Debug, Deserialize)]
struct DownloadLinksResponse {
    #[serde(default)]
    result: DownloadLinksResult,
}

#[derive(Debug, Default, Deserialize)]
struct DownloadLinksResult {
    #[serde(default)]
    links: Vec<DownloadLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadLink {
    #[serde(default)]
    download_type: String,
    #[serde(default)]
    download_url: String,
    // Present on some entries; the filename is authoritative (see module docs)
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<String>,
}

/// Query the download API and resolve the latest Linux server release.
pub fn fetch_latest_release(version_pattern: &str) -> Result<ReleaseInfo> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(format!("bedrockup/{}", VERSION))
        .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
        .build()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

    let response = client
        .get(DOWNLOAD_LINKS_API)
        .send()
        .map_err(|e| Error::api_request_failed(DOWNLOAD_LINKS_API, e.to_string(), None))?;

    let status = response.status();
    let body = response
        .text()
        .map_err(|e| Error::api_request_failed(DOWNLOAD_LINKS_API, e.to_string(), None))?;

    if !status.is_success() {
        return Err(Error::api_request_failed(
            DOWNLOAD_LINKS_API,
            format!("HTTP {}", status.as_u16()),
            Some(status.as_u16()),
        ));
    }

    resolve_from_body(&body, version_pattern)
}

/// Resolve a release from a raw API response body.
fn resolve_from_body(body: &str, version_pattern: &str) -> Result<ReleaseInfo> {
    let parsed: DownloadLinksResponse = serde_json::from_str(body).map_err(|e| {
        Error::internal_json(
            e.to_string(),
            Some("parse download links response".to_string()),
        )
    })?;

    let link = parsed
        .result
        .links
        .into_iter()
        .find(|l| l.download_type == LINUX_DOWNLOAD_TYPE)
        .ok_or_else(|| Error::api_link_not_found(LINUX_DOWNLOAD_TYPE))?;

    let version = parse_version_from_url(&link.download_url, version_pattern);

    Ok(ReleaseInfo {
        download_url: link.download_url,
        version,
    })
}

/// Extract a version from the last path segment of a download URL.
///
/// Total over its inputs: any non-matching filename (or an unparseable
/// pattern, which config validation normally rules out) yields
/// `"unknown"` rather than an error.
pub fn parse_version_from_url(url: &str, pattern: &str) -> String {
    let without_query = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    let filename = without_query.rsplit('/').next().unwrap_or(without_query);

    let Ok(re) = Regex::new(pattern) else {
        return UNKNOWN_VERSION.to_string();
    };

    re.captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}
