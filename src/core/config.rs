//! Runtime configuration resolved once at startup.
//!
//! Every knob is an optional environment variable with a default, so the
//! tool runs unconfigured on a box that has `docker` and `git` logged-in
//! context. Loading goes through an injectable lookup function so tests
//! never touch the process environment.

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

pub const ENV_USERNAME: &str = "BEDROCKUP_USERNAME";
pub const ENV_IMAGE: &str = "BEDROCKUP_IMAGE";
pub const ENV_CREDENTIAL_FILE: &str = "BEDROCKUP_CREDENTIAL_FILE";
pub const ENV_ARCHIVE: &str = "BEDROCKUP_ARCHIVE";
pub const ENV_STATE_FILE: &str = "BEDROCKUP_STATE_FILE";
pub const ENV_FORCE: &str = "BEDROCKUP_FORCE";
pub const ENV_VERSION_PATTERN: &str = "BEDROCKUP_VERSION_PATTERN";

const DEFAULT_USERNAME: &str = "jackclark1123";
const DEFAULT_CREDENTIAL_FILE: &str = "pass";
const DEFAULT_ARCHIVE: &str = "bedrock-server.zip";
const DEFAULT_STATE_FILE: &str = "built_version.txt";

/// Default pattern for extracting a version from the archive filename.
/// Exactly one capturing group, matching `bedrock-server-1.21.102.1.zip`.
pub const DEFAULT_VERSION_PATTERN: &str = r"^bedrock-server-(.+)\.zip$";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub registry_username: String,
    pub image: String,
    pub credential_file: String,
    pub archive_path: String,
    pub state_file: String,
    pub force: bool,
    pub version_pattern: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry_username =
            lookup(ENV_USERNAME).unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let image =
            lookup(ENV_IMAGE).unwrap_or_else(|| format!("{}/bedrockserver", registry_username));
        let credential_file =
            lookup(ENV_CREDENTIAL_FILE).unwrap_or_else(|| DEFAULT_CREDENTIAL_FILE.to_string());
        let archive_path = lookup(ENV_ARCHIVE).unwrap_or_else(|| DEFAULT_ARCHIVE.to_string());
        let state_file = lookup(ENV_STATE_FILE).unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
        let force = lookup(ENV_FORCE).map(|v| truthy(&v)).unwrap_or(false);
        let version_pattern =
            lookup(ENV_VERSION_PATTERN).unwrap_or_else(|| DEFAULT_VERSION_PATTERN.to_string());

        validate_version_pattern(&version_pattern)?;

        Ok(Self {
            registry_username,
            image,
            credential_file,
            archive_path,
            state_file,
            force,
            version_pattern,
        })
    }
}

/// Interpret a flag value the way shell-ish tooling expects.
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// A version pattern must compile and contain exactly one capturing group.
fn validate_version_pattern(pattern: &str) -> Result<()> {
    let re = Regex::new(pattern).map_err(|e| {
        Error::config_invalid_value(
            ENV_VERSION_PATTERN,
            Some(pattern.to_string()),
            format!("Invalid regex: {}", e),
        )
    })?;

    // captures_len counts the implicit whole-match group 0
    if re.captures_len() != 2 {
        return Err(Error::config_invalid_value(
            ENV_VERSION_PATTERN,
            Some(pattern.to_string()),
            "Pattern must contain exactly one capturing group",
        ));
    }

    Ok(())
}
