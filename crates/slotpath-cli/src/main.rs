//! CLI for Solidity storage-slot layout and address resolution
//!
//! This binary provides the `slotpath` command-line interface for assigning
//! base slots, resolving queries to slot addresses, and reading them from a
//! node.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod formatters;

use cli::{Cli, Commands};
use commands::read::ReadTarget;
use commands::{
    cmd_batch_resolve, cmd_layout, cmd_read, cmd_resolve, cmd_resolve_all, cmd_verify_layout,
};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dotenv::dotenv().ok();
    let config = Config::load(cli.config.as_deref())?.with_env();

    match cli.command {
        Commands::Layout {
            descriptor,
            format,
            output,
        } => cmd_layout(&descriptor, format, output.as_deref()),

        Commands::Resolve {
            query,
            layout,
            format,
            output,
        } => cmd_resolve(
            &query,
            &layout,
            output.as_deref(),
            config.output_format(format),
        ),

        Commands::ResolveAll {
            layout,
            format,
            output,
        } => cmd_resolve_all(&layout, output.as_deref(), config.output_format(format)),

        Commands::BatchResolve {
            queries_file,
            layout,
            format,
            output,
        } => cmd_batch_resolve(
            &queries_file,
            &layout,
            output.as_deref(),
            config.output_format(format),
        ),

        Commands::Read {
            query,
            layout,
            contract,
            rpc,
            block,
            output,
        } => {
            let target = ReadTarget::from_args(
                &config,
                contract.as_deref(),
                rpc.as_deref(),
                block.as_deref(),
            )?;
            cmd_read(&query, &layout, target, output.as_deref()).await
        }

        Commands::VerifyLayout {
            descriptor,
            solc,
            output,
        } => cmd_verify_layout(&descriptor, &solc, output.as_deref()),
    }
}
