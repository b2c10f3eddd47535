// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDN Topology Link Discovery
//!
//! Learns the directed switch-to-switch links of an OpenFlow network by
//! sending LLDP probes out of every switch port and listening for them to
//! come back in on another switch.
//!
//! # Features
//!
//! - **Probe codec**: LLDP frames carrying the full 64-bit datapath id
//! - **Link store**: links indexed by switch and by port, updated atomically
//! - **Probe scheduler**: periodic probing with a cancellable background task
//! - **Event processing**: link up on probe receipt, link down on port or switch loss
//! - **Optional expiry**: drop links that stop answering probes
//!
//! # Quick Start
//!
//! ```bash
//! # Discover links in a fabric described in TOML
//! sdn-topology simulate --fabric fabric.toml --cycles 2
//!
//! # Inspect a probe frame
//! sdn-topology encode --dpid 0x1 --port 3
//! sdn-topology decode 0180c200000e...
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! name = "lab-topology"
//! initial_delay_ms = 1000
//! probe_interval_secs = 60
//! # link_timeout_secs = 180
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod fabric;
pub mod processor;
pub mod provider;
pub mod scheduler;
pub mod store;
pub mod types;

pub use config::{ConfigError, TopologyConfig};
pub use engine::{EngineError, TopologyEngine};
pub use fabric::{FabricError, FabricSpec, LoopbackFabric, RecordingRouting};
pub use processor::{DiscoveryEvent, DiscoveryEventProcessor};
pub use provider::{ControllerProvider, MessageListener, RoutingSink, SwitchHandle, SwitchListener};
pub use scheduler::{ProbeReport, ProbeScheduler};
pub use store::{ConsistencyError, LinkStateStore, Upsert};
pub use types::{
    Disposition, Link, LinkRecord, LinkUpdate, MessageType, OfMessage, PacketOut, PortDesc, PortReason,
    PortStatus, SwitchId, SwitchPortRef,
};
