use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{check, run, status, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "bedrockup")]
#[command(version = VERSION)]
#[command(about = "CLI for automated Bedrock server image build and publish workflow")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full build-and-publish pipeline
    Run(run::RunArgs),
    /// Resolve the latest release and report what `run` would do
    Check(check::CheckArgs),
    /// Show the recorded build state and resolved configuration
    Status(status::StatusArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
