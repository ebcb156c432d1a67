use clap::Args;

use bedrockup::pipeline::{self, CheckReport, HttpReleaseSource};
use bedrockup::Config;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct CheckArgs {}

pub fn run(_args: CheckArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<CheckReport> {
    let config = Config::from_env()?;
    let report = pipeline::check(&HttpReleaseSource, &config)?;
    Ok((report, 0))
}
