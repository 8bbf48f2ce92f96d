use std::process::ExitCode;

use ccr_install::{ExitCode as InstallExit, InstallError};
use ccr_install_cli::{build_cli_command, Cli, Commands};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[warn] logging disabled: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[error] {err}");
            for cause in err.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            let code = err
                .downcast_ref::<InstallError>()
                .map(InstallError::exit_code)
                .unwrap_or(InstallExit::Failure);
            debug!(code = code.code(), "exiting");
            ExitCode::from(code.code() as u8)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.version {
        commands::version::handle();
        return Ok(());
    }
    match &cli.command {
        None => {
            build_cli_command().print_help()?;
            println!();
            Ok(())
        }
        Some(Commands::Install { version }) => {
            commands::install::handle(commands::load_config(cli)?, version)
        }
        Some(Commands::Uninstall { purge }) => {
            commands::uninstall::handle(&commands::load_config(cli)?, *purge)
        }
        Some(Commands::Status) => commands::status::handle(&commands::load_config(cli)?),
        Some(Commands::Version) => {
            commands::version::handle();
            Ok(())
        }
        Some(Commands::Completions { shell, out }) => {
            commands::completions::handle(*shell, out.as_deref())
        }
    }
}
