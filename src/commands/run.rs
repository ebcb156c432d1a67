use clap::Args;

use bedrockup::pipeline::{self, HttpArchiveFetcher, HttpReleaseSource, Pipeline, RunReport};
use bedrockup::registry::DockerClient;
use bedrockup::repo::GitClient;
use bedrockup::Config;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct RunArgs {
    /// Rebuild and publish even if the resolved version was already built
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: RunArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunReport> {
    let config = Config::from_env()?;

    let pipeline = Pipeline {
        resolver: &HttpReleaseSource,
        fetcher: &HttpArchiveFetcher,
        registry: &DockerClient,
        repo: &GitClient,
    };

    let report = pipeline::run(&pipeline, &config, args.force)?;
    Ok((report, 0))
}
