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
//! macpool: inspect MAC pool configurations and dry-run allocations.

mod cli;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use clap::Parser;
use cli::{Commands, Opts, PoolOptions};
use engine_audit::TracingAuditSink;
use mac_pool::{MacPool, RangePoolManager, config::MacPoolConfig};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct AllocationReport {
    requested: usize,
    allocated: Vec<mac_pool::MacAddress>,
    remaining: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let _guards = engine_observability::setup_tracing(opts.logging.log_dir, opts.logging.stderr)?;

    match opts.command {
        Commands::Inspect { pool } => {
            let manager = init_pool(&pool).await?;
            print_json(&manager.snapshot())
        }
        Commands::Allocate { pool, count } => {
            let manager = init_pool(&pool).await?;
            let allocated = manager.allocate_mac_addresses(count);
            if allocated.len() < count {
                tracing::warn!(
                    requested = count,
                    allocated = allocated.len(),
                    "Not enough available addresses"
                );
            }
            print_json(&AllocationReport {
                requested: count,
                allocated,
                remaining: manager.available_macs_count(),
            })
        }
    }
}

async fn load_config(path: &Path) -> anyhow::Result<MacPoolConfig> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading pool config {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing pool config {}", path.display()))
}

async fn init_pool(opts: &PoolOptions) -> anyhow::Result<RangePoolManager> {
    let config = load_config(&opts.config).await?;
    let manager = RangePoolManager::from_config(&config, Arc::new(TracingAuditSink))
        .context("initializing MAC pool")?;
    for mac in &opts.in_use {
        manager.force_add_mac(*mac);
    }
    Ok(manager)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}
