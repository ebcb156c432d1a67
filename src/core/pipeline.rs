//! The build pipeline: resolve, guard, download, publish, sync, record.
//!
//! Stages run strictly in order. Failure policy per stage:
//! - resolve: degrades to an unknown version, the build is still attempted
//! - download: aborts the run (nothing is published against a missing or
//!   partial archive)
//! - publish: non-fatal, but blocks sync and record
//! - sync: non-fatal, logged only
//! - record: only after a successful publish of a known version

use std::path::Path;

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::registry::{self, PublishReport, RegistryClient};
use crate::repo::{self, RepoClient, SyncReport};
use crate::resolver::{self, ReleaseInfo, UNKNOWN_VERSION};
use crate::state;
use crate::{download, Error};

/// Seam over release resolution, so pipeline policy tests run offline.
pub trait ReleaseSource {
    fn latest_release(&self, version_pattern: &str) -> Result<ReleaseInfo>;
}

/// Seam over the archive download.
pub trait ArchiveFetcher {
    fn fetch(&self, url: &str, output: &Path) -> Result<()>;
}

/// Live resolver against the vendor API.
pub struct HttpReleaseSource;

impl ReleaseSource for HttpReleaseSource {
    fn latest_release(&self, version_pattern: &str) -> Result<ReleaseInfo> {
        resolver::fetch_latest_release(version_pattern)
    }
}

/// Live downloader. Pauses briefly after the download so the archive is
/// settled on disk before the container build picks it up.
pub struct HttpArchiveFetcher;

const SETTLE_DELAY_SECS: u64 = 2;

impl ArchiveFetcher for HttpArchiveFetcher {
    fn fetch(&self, url: &str, output: &Path) -> Result<()> {
        download::download_archive(url, output)?;
        std::thread::sleep(std::time::Duration::from_secs(SETTLE_DELAY_SECS));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Skipped,
    Success,
    PartialSuccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: &'static str,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    fn success(stage: &'static str) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            error: None,
        }
    }

    fn skipped(stage: &'static str) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            error: None,
        }
    }

    fn failed(stage: &'static str, error: &Error) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub status: RunStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    pub forced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncReport>,
    pub recorded: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    pub would_skip: bool,
}

/// External collaborators for one pipeline run.
pub struct Pipeline<'a> {
    pub resolver: &'a dyn ReleaseSource,
    pub fetcher: &'a dyn ArchiveFetcher,
    pub registry: &'a dyn RegistryClient,
    pub repo: &'a dyn RepoClient,
}

/// Resolve the latest release, degrading to an unknown version when the
/// API is unreachable so the build can still be attempted.
fn resolve_release(
    source: &dyn ReleaseSource,
    config: &Config,
    stages: &mut Vec<StageReport>,
) -> Option<ReleaseInfo> {
    match source.latest_release(&config.version_pattern) {
        Ok(release) => {
            log_status!("resolve", "Latest version: {}", release.version);
            log_status!("resolve", "Download URL: {}", release.download_url);
            stages.push(StageReport::success("resolve"));
            Some(release)
        }
        Err(e) => {
            log_status!("resolve", "API check failed: {} (building anyway)", e);
            stages.push(StageReport::failed("resolve", &e));
            None
        }
    }
}

/// Execute the full pipeline.
///
/// `force` is ORed with the configured force flag. The returned report is
/// the terminal outcome; irrecoverable failures (download, credential
/// file) surface as errors instead.
pub fn run(pipeline: &Pipeline, config: &Config, force: bool) -> Result<RunReport> {
    let force = force || config.force;
    let mut stages = Vec::new();

    let release = resolve_release(pipeline.resolver, config, &mut stages);
    let (download_url, version) = match release {
        Some(r) => (Some(r.download_url), r.version),
        None => (None, UNKNOWN_VERSION.to_string()),
    };

    let previous = state::read_built_version(Path::new(&config.state_file));

    if state::should_skip(&version, previous.as_deref(), force) {
        log_status!(
            "guard",
            "Already built version {}; skipping. Set {}=1 to override.",
            version,
            crate::config::ENV_FORCE
        );
        return Ok(RunReport {
            status: RunStatus::Skipped,
            version,
            previous_version: previous,
            forced: force,
            download_url,
            stages,
            publish: None,
            sync: None,
            recorded: false,
        });
    }

    match &download_url {
        Some(url) => {
            pipeline.fetcher.fetch(url, Path::new(&config.archive_path))?;
            stages.push(StageReport::success("download"));
        }
        // No URL means the resolver already failed; build from whatever
        // archive is on disk.
        None => stages.push(StageReport::skipped("download")),
    }

    let publish = registry::publish(
        pipeline.registry,
        &config.registry_username,
        &config.image,
        Path::new(&config.credential_file),
    )?;
    if publish.published {
        stages.push(StageReport::success("publish"));
    } else {
        stages.push(StageReport {
            stage: "publish",
            status: StageStatus::Failed,
            error: publish.error.clone(),
        });
    }

    let mut sync = None;
    let mut recorded = false;

    if publish.published {
        match repo::sync(pipeline.repo) {
            Ok(report) => {
                stages.push(StageReport::success("sync"));
                sync = Some(report);
            }
            Err(e) => {
                log_status!("sync", "Repository sync failed: {} (continuing)", e);
                stages.push(StageReport::failed("sync", &e));
            }
        }

        if version != UNKNOWN_VERSION {
            match state::write_built_version(Path::new(&config.state_file), &version) {
                Ok(()) => {
                    stages.push(StageReport::success("record"));
                    recorded = true;
                }
                Err(e) => {
                    log_status!("state", "Could not write state file: {} (continuing)", e);
                    stages.push(StageReport::failed("record", &e));
                }
            }
        } else {
            stages.push(StageReport::skipped("record"));
        }
    } else {
        stages.push(StageReport::skipped("sync"));
        stages.push(StageReport::skipped("record"));
    }

    let status = if stages
        .iter()
        .any(|s| s.status == StageStatus::Failed)
    {
        RunStatus::PartialSuccess
    } else {
        RunStatus::Success
    };

    Ok(RunReport {
        status,
        version,
        previous_version: previous,
        forced: force,
        download_url,
        stages,
        publish: Some(publish),
        sync,
        recorded,
    })
}

/// Resolve and compare without side effects: what would `run` do.
pub fn check(source: &dyn ReleaseSource, config: &Config) -> Result<CheckReport> {
    let release = source.latest_release(&config.version_pattern)?;
    let previous = state::read_built_version(Path::new(&config.state_file));
    let would_skip = state::should_skip(&release.version, previous.as_deref(), config.force);

    Ok(CheckReport {
        version: release.version,
        download_url: Some(release.download_url),
        previous_version: previous,
        would_skip,
    })
}
