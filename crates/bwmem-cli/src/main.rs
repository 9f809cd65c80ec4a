mod cli;
mod commands;
mod config;
mod input;
mod shutdown;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use commands::watch::WatchOptions;
use config::Settings;

fn main() -> Result<()> {
    // Logs go to stderr so dumps on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bwmem=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;

    match cli.command {
        Command::Watch {
            kinds,
            interval_ms,
            diff,
            diff_output,
        } => commands::watch::run(
            &settings,
            WatchOptions {
                kinds: &kinds,
                interval_ms,
                diff,
                diff_output: diff_output.as_deref(),
            },
        ),
        Command::List {
            kind,
            fields,
            limit,
        } => commands::list::run(&settings, kind, &fields, limit),
        Command::Show { kind, slot } => commands::show::run(&settings, kind, slot),
        Command::Set {
            kind,
            slot,
            field,
            value,
        } => commands::set::run(&settings, kind, slot, &field, &value),
        Command::Dump { kind, output } => commands::dump::run(&settings, kind, output.as_deref()),
        Command::Schema { kind, output } => {
            commands::schema::run(&settings.schema, kind, output.as_deref())
        }
        Command::Hexdump {
            address,
            size,
            no_ascii,
        } => commands::hexdump::run(&settings, address, size, !no_ascii),
    }
}
