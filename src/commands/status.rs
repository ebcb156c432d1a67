use std::path::Path;

use clap::Args;
use serde::Serialize;

use bedrockup::{state, Config};

use crate::commands::CmdResult;

#[derive(Args)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_version: Option<String>,
    // Paths only; credential contents never leave the credential file
    pub config: Config,
}

pub fn run(_args: StatusArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<StatusReport> {
    let config = Config::from_env()?;
    let built_version = state::read_built_version(Path::new(&config.state_file));

    Ok((
        StatusReport {
            built_version,
            config,
        },
        0,
    ))
}
