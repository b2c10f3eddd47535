// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topology engine: lifecycle and queries.

use crate::config::{ConfigError, TopologyConfig};
use crate::processor::{DiscoveryEventProcessor, LISTENER_NAME};
use crate::provider::{ControllerProvider, RoutingSink};
use crate::scheduler::{self, ProbeReport, ProbeScheduler};
use crate::store::LinkStateStore;
use crate::types::{Link, LinkRecord, MessageType, SwitchId, SwitchPortRef};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine already running")]
    AlreadyRunning,

    #[error("Engine not running")]
    NotRunning,
}

/// Background task removing links that stopped answering probes.
struct Sweeper {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Sweeper {
    fn spawn(processor: Arc<DiscoveryEventProcessor>, timeout: Duration, interval: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let task_shutdown = shutdown.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        sweep(&processor, timeout, Instant::now());
                    }
                    _ = task_shutdown.notified() => {
                        debug!("Link sweeper shutting down");
                        break;
                    }
                }
            }
        });

        Self { shutdown, task }
    }

    async fn stop(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            warn!("Sweeper task ended abnormally: {}", e);
        }
    }
}

fn sweep(processor: &DiscoveryEventProcessor, timeout: Duration, now: Instant) -> Vec<Link> {
    let removed = processor.store().remove_stale(timeout, now);
    if !removed.is_empty() {
        info!(
            "Expired {} link(s) not verified within {:?}",
            removed.len(),
            timeout
        );
    }
    processor.notify_down(&removed);
    removed
}

/// Link discovery engine.
///
/// Owns the link store and the event processor, registers the processor with
/// the controller and drives the probe scheduler.
pub struct TopologyEngine {
    config: TopologyConfig,
    provider: Arc<dyn ControllerProvider>,
    processor: Arc<DiscoveryEventProcessor>,
    scheduler: Mutex<Option<ProbeScheduler>>,
    sweeper: Mutex<Option<Sweeper>>,
    running: AtomicBool,
}

impl TopologyEngine {
    /// Create an engine. Nothing is registered until [`TopologyEngine::start`].
    pub fn new(
        config: TopologyConfig,
        provider: Arc<dyn ControllerProvider>,
        routing: Arc<dyn RoutingSink>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let store = Arc::new(LinkStateStore::new());
        let processor = Arc::new(DiscoveryEventProcessor::new(
            store,
            provider.clone(),
            routing,
        ));

        Ok(Self {
            config,
            provider,
            processor,
            scheduler: Mutex::new(None),
            sweeper: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// The link store backing the queries.
    pub fn store(&self) -> &Arc<LinkStateStore> {
        self.processor.store()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register with the controller and start probing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }

        self.provider
            .add_message_listener(MessageType::PacketIn, self.processor.clone());
        self.provider
            .add_message_listener(MessageType::PortStatus, self.processor.clone());
        self.provider.add_switch_listener(self.processor.clone());

        *self.scheduler.lock() = Some(ProbeScheduler::spawn(
            self.provider.clone(),
            self.config.initial_delay(),
            self.config.probe_interval(),
        ));

        if let Some(timeout) = self.config.link_timeout() {
            *self.sweeper.lock() = Some(Sweeper::spawn(
                self.processor.clone(),
                timeout,
                self.config.sweep_interval(),
            ));
            info!(
                "[{}] Link expiry enabled: timeout {:?}, sweep every {:?}",
                self.config.name,
                timeout,
                self.config.sweep_interval()
            );
        }

        info!(
            "[{}] Topology engine started: first probe in {:?}, then every {:?}",
            self.config.name,
            self.config.initial_delay(),
            self.config.probe_interval()
        );
        Ok(())
    }

    /// Stop probing and unregister from the controller. Idempotent.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let scheduler = self.scheduler.lock().take();
        if let Some(mut scheduler) = scheduler {
            scheduler.stop().await;
        }
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }

        self.provider
            .remove_message_listener(MessageType::PacketIn, LISTENER_NAME);
        self.provider
            .remove_message_listener(MessageType::PortStatus, LISTENER_NAME);
        self.provider.remove_switch_listener(LISTENER_NAME);

        info!(
            "[{}] Topology engine stopped with {} link(s) known",
            self.config.name,
            self.link_count()
        );
    }

    /// Run one probe pass right away, outside the schedule.
    pub fn probe_now(&self) -> Result<ProbeReport, EngineError> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        Ok(scheduler::run_once(self.provider.as_ref()))
    }

    /// Completed scheduled probe passes.
    pub fn probe_passes(&self) -> u64 {
        self.scheduler
            .lock()
            .as_ref()
            .map(ProbeScheduler::passes)
            .unwrap_or(0)
    }

    /// Expire links as of `now`. No-op unless a link timeout is configured.
    pub fn sweep_at(&self, now: Instant) -> Vec<Link> {
        match self.config.link_timeout() {
            Some(timeout) => sweep(&self.processor, timeout, now),
            None => Vec::new(),
        }
    }

    /// Snapshot of every known link.
    pub fn links(&self) -> Vec<LinkRecord> {
        self.store().snapshot()
    }

    pub fn links_for_switch(&self, switch_id: SwitchId) -> Vec<Link> {
        self.store().links_for_switch(switch_id)
    }

    pub fn links_for_port(&self, port: SwitchPortRef) -> Vec<Link> {
        self.store().links_for_port(port)
    }

    /// Whether `port` faces another switch.
    pub fn is_internal(&self, port: SwitchPortRef) -> bool {
        self.store().is_internal(port)
    }

    pub fn link_count(&self) -> usize {
        self.store().len()
    }
}
