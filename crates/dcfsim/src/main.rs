use clap::Parser;
use dcfsim::cli::Cli;
use dcfsim::{execute, init_logging};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let output = execute(&cli)?;
    println!("{output}");

    tracing::debug!("dcfsim finished");
    Ok(())
}
