mod cli;
mod commands;
mod config;
mod paths;
mod resources;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, ServiceArgs};
use reconcile::Operation;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub service: ServiceArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        service: cli.service,
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Check(args) => commands::lifecycle::run(ctx, Operation::Check, &args),
        Commands::Diff(args) => commands::lifecycle::run(ctx, Operation::Diff, &args),
        Commands::Create(args) => commands::lifecycle::run(ctx, Operation::Create, &args),
        Commands::Read(args) => commands::lifecycle::run(ctx, Operation::Read, &args),
        Commands::Update(args) => commands::lifecycle::run(ctx, Operation::Update, &args),
        Commands::Delete(args) => commands::lifecycle::run(ctx, Operation::Delete, &args),
        Commands::Batch(args) => commands::batch::run(ctx, &args),
        Commands::Types => commands::inspect::types(ctx),
        Commands::DecodeId { type_token, id } => commands::inspect::decode_id(&type_token, &id),
        Commands::Config => commands::inspect::config(ctx),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pulumiservice", &mut io::stdout());
            Ok(())
        }
    }
}
