// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDN Topology CLI
//!
//! Runs the link discovery engine against an in-memory fabric and inspects
//! probe frames.
//!
//! # Usage
//!
//! ```bash
//! # Two probe passes over a described fabric
//! sdn-topology simulate --fabric fabric.toml --cycles 2
//!
//! # Keep probing on the configured schedule until Ctrl+C
//! sdn-topology --config topology.toml simulate --fabric fabric.toml --follow
//!
//! # Probe frame for switch 0x1 port 3, as hex
//! sdn-topology encode --dpid 0x1 --port 3
//!
//! # Decode a captured frame
//! sdn-topology decode 0180c200000e000000000001...
//! ```

use clap::{Parser, Subcommand};
use sdn_topology::codec;
use sdn_topology::types::parse_dpid;
use sdn_topology::{
    ControllerProvider, Link, LinkUpdate, LoopbackFabric, ProbeReport, RecordingRouting, TopologyConfig,
    TopologyEngine,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// SDN topology link discovery
#[derive(Parser, Debug)]
#[command(name = "sdn-topology")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover the links of a fabric described in TOML
    Simulate {
        /// Fabric description file
        #[arg(short, long)]
        fabric: PathBuf,

        /// Probe passes to run
        #[arg(long, default_value = "1")]
        cycles: u32,

        /// Run on the configured schedule until Ctrl+C instead
        #[arg(long, conflicts_with = "cycles")]
        follow: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the probe frame for a switch port as hex
    Encode {
        /// Datapath id (decimal or 0x hex)
        #[arg(long)]
        dpid: String,

        /// Port number
        #[arg(long)]
        port: u16,
    },

    /// Decode a hex frame
    Decode {
        /// Frame bytes as hex (':' and whitespace ignored)
        frame: String,
    },

    /// Generate an example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "topology.toml")]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct SimulationOutput {
    passes: Vec<ProbeReport>,
    links: Vec<Link>,
    updates: Vec<LinkUpdate>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match args.config {
        Some(ref path) => TopologyConfig::from_file(path)?,
        None => TopologyConfig::default(),
    };

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::Simulate {
            fabric,
            cycles,
            follow,
            json,
        } => cmd_simulate(config, fabric, cycles, follow, json).await,
        Commands::Encode { dpid, port } => cmd_encode(&dpid, port),
        Commands::Decode { frame } => cmd_decode(&frame),
        Commands::GenConfig { output } => cmd_gen_config(output),
    }
}

async fn cmd_simulate(
    config: TopologyConfig,
    fabric_path: PathBuf,
    cycles: u32,
    follow: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let fabric = Arc::new(LoopbackFabric::from_file(&fabric_path)?);
    let routing = Arc::new(RecordingRouting::new());
    let engine = TopologyEngine::new(config, fabric.clone(), routing.clone())?;

    info!("+----------------------------------------------------+");
    info!("|  SDN Topology v{:<36}|", env!("CARGO_PKG_VERSION"));
    info!("+----------------------------------------------------+");
    info!("|  Instance: {:<40}|", engine.config().name);
    info!("|  Fabric:   {:<40}|", fabric_path.display());
    info!("|  Switches: {:<40}|", fabric.switches().len());
    info!("+----------------------------------------------------+");

    engine.start()?;

    let mut passes = Vec::new();
    if follow {
        // Carry frames across cables while the scheduler probes
        let pump = fabric.clone();
        let pump_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(50));
            loop {
                tick.tick().await;
                pump.deliver();
            }
        });

        info!("Press Ctrl+C to stop...");
        tokio::signal::ctrl_c().await?;
        info!("Shutting down...");
        pump_task.abort();
        fabric.deliver();
    } else {
        for cycle in 1..=cycles {
            let report = engine.probe_now()?;
            let delivered = fabric.deliver();
            info!(
                "Pass {}: {} switch(es), {} probe(s) sent, {} failed, {} delivered",
                cycle, report.switches, report.probes_sent, report.probe_errors, delivered
            );
            passes.push(report);
        }
    }

    let links: Vec<Link> = engine.links().into_iter().map(|r| r.link).collect();
    engine.shutdown().await;

    let output = SimulationOutput {
        passes,
        links,
        updates: routing.updates(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Discovered {} link(s):", output.links.len());
        for link in &output.links {
            println!("  {}", link);
        }
    }

    Ok(())
}

fn cmd_encode(dpid: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let switch_id = parse_dpid(dpid).ok_or_else(|| format!("invalid datapath id '{}'", dpid))?;
    println!("{}", hex::encode(codec::encode(switch_id, port)));
    Ok(())
}

fn cmd_decode(frame: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cleaned: String = frame
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let bytes = hex::decode(cleaned)?;

    match codec::decode(&bytes) {
        Some((switch_id, port)) => println!("dpid {:#x} port {}", switch_id, port),
        None if codec::is_lldp(&bytes) => println!("LLDP, not a probe"),
        None => println!("not a probe"),
    }
    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    TopologyConfig::default().to_file(&output)?;
    println!("Configuration written to {}", output.display());
    Ok(())
}
