// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! macpool CLI options.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mac_pool::MacAddress;

/// Inspect MAC pool configurations.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Opts {
    /// Top-level subcommand
    #[command(subcommand)]
    pub command: Commands,

    /// Logging options
    #[command(flatten)]
    pub logging: LoggingOptions,
}

/// Logging options.
#[derive(Debug, Args)]
pub struct LoggingOptions {
    /// Log to stderr.
    #[arg(long, global = true, default_value = "true")]
    pub stderr: bool,

    /// Directory for the log file.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

/// Pool options shared by all subcommands.
#[derive(Debug, Args)]
pub struct PoolOptions {
    /// JSON file with the pool configuration.
    #[arg(long)]
    pub config: PathBuf,

    /// Addresses to mark as in use before running the command.
    #[arg(long = "in-use", value_delimiter = ',')]
    pub in_use: Vec<MacAddress>,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the state of a freshly initialized pool as JSON.
    Inspect {
        /// Pool options.
        #[command(flatten)]
        pool: PoolOptions,
    },
    /// Allocate addresses from a freshly initialized pool and print them.
    ///
    /// Nothing is persisted.
    Allocate {
        /// Pool options.
        #[command(flatten)]
        pool: PoolOptions,

        /// Number of addresses to allocate.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Opts::command().debug_assert();
    }

    #[test]
    fn parses_allocate() {
        let opts = Opts::try_parse_from([
            "macpool",
            "allocate",
            "--config",
            "pool.json",
            "--count",
            "3",
            "--in-use",
            "00:1a:4a:00:00:01,00:1a:4a:00:00:02",
        ])
        .unwrap();

        let Commands::Allocate { pool, count } = opts.command else {
            panic!("expected allocate");
        };
        assert_eq!(count, 3);
        assert_eq!(pool.config, PathBuf::from("pool.json"));
        assert_eq!(
            pool.in_use,
            vec![
                MacAddress::from_octets([0x00, 0x1a, 0x4a, 0, 0, 1]),
                MacAddress::from_octets([0x00, 0x1a, 0x4a, 0, 0, 2]),
            ]
        );
        assert!(opts.logging.stderr);
    }

    #[test]
    fn rejects_malformed_addresses() {
        let result = Opts::try_parse_from([
            "macpool",
            "inspect",
            "--config",
            "pool.json",
            "--in-use",
            "not-a-mac",
        ]);
        assert!(result.is_err());
    }
}
