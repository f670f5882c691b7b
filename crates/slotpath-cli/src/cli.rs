//! CLI argument definitions
//!
//! This module contains all the clap-derived structures for parsing
//! command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command-line interface for storage-slot layout and address resolution
#[derive(Parser)]
#[command(name = "slotpath")]
#[command(about = "Storage-slot layout and address resolution for Solidity contracts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to slotpath.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assign base slots for a contract descriptor
    Layout {
        /// Contract descriptor JSON
        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,

        /// Output format
        #[arg(long, default_value = "json", value_enum)]
        format: LayoutFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a single query to its slot address
    Resolve {
        /// Query, e.g. `balances[0x...]` or `matrix[1][0]`
        query: String,

        /// Contract descriptor JSON
        #[arg(short, long, value_name = "DESCRIPTOR")]
        layout: PathBuf,

        /// Output format (overrides the config file)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve every statically addressable location of a contract
    ResolveAll {
        /// Contract descriptor JSON
        #[arg(short, long, value_name = "DESCRIPTOR")]
        layout: PathBuf,

        /// Output format (overrides the config file)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve queries listed one per line in a file
    BatchResolve {
        /// File with one query per line
        #[arg(value_name = "QUERIES_FILE")]
        queries_file: PathBuf,

        /// Contract descriptor JSON
        #[arg(short, long, value_name = "DESCRIPTOR")]
        layout: PathBuf,

        /// Output format (overrides the config file)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a query and read its value from a node
    Read {
        /// Query to read
        query: String,

        /// Contract descriptor JSON
        #[arg(short, long, value_name = "DESCRIPTOR")]
        layout: PathBuf,

        /// Deployed contract address
        #[arg(long)]
        contract: Option<String>,

        /// JSON-RPC endpoint
        #[arg(long)]
        rpc: Option<String>,

        /// Block number or tag (`latest`, `safe`, `finalized`)
        #[arg(long)]
        block: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare the computed layout with solc's storageLayout output
    VerifyLayout {
        /// Contract descriptor JSON
        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,

        /// solc storageLayout JSON (bare or inside a compiler artifact)
        #[arg(long, value_name = "STORAGE_LAYOUT_JSON")]
        solc: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Output format for resolved addresses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Full resolved address as JSON
    #[default]
    #[value(name = "json")]
    Json,
    /// Hex slot key, offset and size only
    #[value(name = "compact")]
    Compact,
    #[value(name = "toml")]
    Toml,
}

/// Output format for the `layout` command
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayoutFormat {
    #[value(name = "json")]
    Json,
    #[value(name = "toml")]
    Toml,
    /// Compiler-style `storageLayout` with a types table
    #[value(name = "solc")]
    Solc,
}
