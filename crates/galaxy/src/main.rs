// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Galaxy - a sandboxed WebAssembly plugin runtime.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod discover;
mod scan;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Galaxy - a sandboxed WebAssembly plugin runtime.
#[derive(Parser, Debug)]
#[command(name = "galaxy", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load installed plugins and serve their routes.
    Serve,
    /// Scan a plugin archive (.tar.gz) for security issues.
    Scan {
        /// Path to the archive.
        archive: PathBuf,
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List installed plugins found in the plugins directory.
    Discover {
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => galaxy_config::load_and_validate_path(path),
        None => galaxy_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            galaxy_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Scan { archive, json }) => {
            match scan::run_scan(&archive, json, config.scanner.max_file_size_bytes) {
                Ok(true) => {}
                Ok(false) => std::process::exit(2),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Discover { json }) => {
            if let Err(e) = discover::run_discover(&config, json).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("galaxy: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_scan_arguments() {
        let cli = Cli::try_parse_from(["galaxy", "scan", "plugin.tar.gz", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Scan { archive, json }) => {
                assert_eq!(archive, PathBuf::from("plugin.tar.gz"));
                assert!(json);
            }
            other => panic!("expected scan command, got {other:?}"),
        }
    }

    #[test]
    fn cli_accepts_global_config_flag() {
        let cli = Cli::try_parse_from(["galaxy", "discover", "--config", "/tmp/g.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.toml")));
        assert!(matches!(cli.command, Some(Commands::Discover { json: false })));
    }

    #[test]
    fn cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
