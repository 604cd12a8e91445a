use anyhow::Result;
use clap::Parser;

use txt2utf8::cli::{self, Args, CliConfig};
use txt2utf8::ExitStatus;

fn main() {
    let code = match run() {
        Ok(status) => status.code(),
        Err(e) => {
            cli::CliUtils::show_error(&format!("{:#}", e));
            ExitStatus::FatalError.code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<ExitStatus> {
    let args = Args::parse();
    cli::setup_logging(args.verbose, args.quiet);

    let config = match CliConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            cli::handle_error(&e);
            return Ok(ExitStatus::FatalError);
        }
    };

    Ok(cli::execute(&config))
}
