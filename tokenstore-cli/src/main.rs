//! `tokenstore`: developer CLI for a token object store.
//!
//! Opens (and if needed recovers) the store at `--store`, then runs one
//! maintenance command against it. Output is JSON so it can be piped into
//! other tooling.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "tokenstore", version, about = "Inspect and maintain a token object store")]
pub struct Cli {
    /// Storage root directory, or `:memory:` for a throwaway store.
    #[arg(long, env = "TOKENSTORE_PATH", global = true, default_value = "./tokenstore")]
    pub store: String,

    /// Master key as 64 hex characters. Required for private objects.
    #[arg(long, env = "TOKENSTORE_KEY_HEX", global = true, hide_env_values = true)]
    pub key_hex: Option<String>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Store maintenance commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the store and report how it was brought up.
    Init,
    /// Print an internal blob as hex, or `null` if it is not set.
    GetInternal {
        /// Internal blob id.
        id: u32,
    },
    /// Write an internal blob.
    SetInternal {
        /// Internal blob id.
        id: u32,
        /// Blob contents as hex.
        hex: String,
    },
    /// Insert an object and print its handle.
    Insert {
        /// Store the object as private (requires `--key-hex`).
        #[arg(long)]
        private: bool,
        /// Object payload as hex.
        hex: String,
    },
    /// Print every readable object as a JSON map of handle to hex payload.
    List {
        /// List private objects instead of public ones.
        #[arg(long)]
        private: bool,
    },
    /// Delete one object.
    Delete {
        /// Object handle.
        handle: u32,
    },
    /// Delete every object, keeping internal blobs.
    Wipe,
}

fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(&cli, &mut std::io::stdout().lock())
}
