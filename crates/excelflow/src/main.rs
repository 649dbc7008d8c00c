use std::process::ExitCode;

use clap::Parser;
use excelflow::SaveError;
use excelflow::cli::{Cli, load_cli_config, run};
use excelflow_log::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<SaveError>() {
                Some(err_save) => eprintln!("{}", err_save.user_message()),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> anyhow::Result<()> {
    let cfg = load_cli_config(&cli)?;
    init_logging(&cfg.to_log_config(cli.log_level.as_deref())?)?;
    run(cli.command, &cfg)
}
