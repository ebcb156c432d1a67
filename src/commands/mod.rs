pub type CmdResult<T> = bedrockup::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod check;
pub mod run;
pub mod status;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (bedrockup::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Check(args) => dispatch!(args, global, check),
        crate::Commands::Status(args) => dispatch!(args, global, status),
    }
}
