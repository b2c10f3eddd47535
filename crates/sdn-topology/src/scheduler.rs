// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic probe emission.

use crate::codec;
use crate::provider::ControllerProvider;
use crate::types::{PacketOut, OFPP_LOCAL};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of one probe pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    /// Switches visited
    pub switches: usize,
    /// Probes accepted by an output channel
    pub probes_sent: usize,
    /// Probes whose write failed
    pub probe_errors: usize,
}

/// Send one probe out of every enabled, non-local port of every connected switch.
///
/// A failed write is logged and counted; the pass carries on with the next port.
pub fn run_once(provider: &dyn ControllerProvider) -> ProbeReport {
    let mut report = ProbeReport::default();

    for switch in provider.switches() {
        report.switches += 1;
        let switch_id = switch.id();

        for port in switch.enabled_ports() {
            if port.port_no == OFPP_LOCAL {
                continue;
            }

            let packet_out = PacketOut::to_port(port.port_no, codec::encode(switch_id, port.port_no));
            match switch.send_packet_out(&packet_out) {
                Ok(()) => {
                    trace!("Probe sent on {:#x}:{}", switch_id, port.port_no);
                    report.probes_sent += 1;
                }
                Err(e) => {
                    warn!(
                        "Failure sending probe on {:#x}:{}: {}",
                        switch_id, port.port_no, e
                    );
                    report.probe_errors += 1;
                }
            }
        }
    }

    report
}

/// Handle to the background probe task.
///
/// Dropping the handle without calling [`ProbeScheduler::stop`] still signals
/// the task to exit, but does not wait for it.
pub struct ProbeScheduler {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
    passes: Arc<AtomicU64>,
}

impl ProbeScheduler {
    /// Spawn the probe loop: first pass after `initial_delay`, then every
    /// `interval` measured from the start of the previous pass.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        provider: Arc<dyn ControllerProvider>,
        initial_delay: Duration,
        interval: Duration,
    ) -> Self {
        let shutdown = Arc::new(Notify::new());
        let passes = Arc::new(AtomicU64::new(0));

        let task_shutdown = shutdown.clone();
        let task_passes = passes.clone();
        // Fixed rate: a slow pass does not push the next one back
        let period = interval.max(MIN_INTERVAL);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + initial_delay, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = run_once(provider.as_ref());
                        let pass = task_passes.fetch_add(1, Ordering::Relaxed) + 1;
                        debug!(
                            "Probe pass {}: {} switch(es), {} sent, {} failed",
                            pass, report.switches, report.probes_sent, report.probe_errors
                        );
                    }
                    _ = task_shutdown.notified() => {
                        debug!("Probe scheduler shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            shutdown,
            task: Some(task),
            passes,
        }
    }

    /// Completed passes so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Whether the loop is still alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for an in-flight pass to finish. Idempotent.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        // notify_one keeps a permit if the task is mid-pass
        self.shutdown.notify_one();
        if let Err(e) = task.await {
            warn!("Probe task ended abnormally: {}", e);
        }
    }
}

impl Drop for ProbeScheduler {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.shutdown.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::LoopbackFabric;
    use crate::provider::{MessageListener, SwitchHandle, SwitchListener};
    use crate::types::{port_bits, MessageType, PortDesc, BUFFER_ID_NONE, OFPP_NONE};

    fn fabric() -> Arc<LoopbackFabric> {
        let fabric = Arc::new(LoopbackFabric::new());
        fabric.connect_switch(0x1, &[1, 2, OFPP_LOCAL]);
        fabric.connect_switch(0x2, &[7]);
        fabric
    }

    #[test]
    fn test_run_once_probes_every_port() {
        let fabric = fabric();
        let report = run_once(fabric.as_ref());

        assert_eq!(
            report,
            ProbeReport {
                switches: 2,
                probes_sent: 3,
                probe_errors: 0
            }
        );

        let sent = fabric.virtual_switch(0x1).unwrap().sent();
        let ports: Vec<u16> = sent.iter().map(|p| p.out_port).collect();
        assert_eq!(ports, vec![1, 2]);
        for packet_out in &sent {
            assert_eq!(packet_out.buffer_id, BUFFER_ID_NONE);
            assert_eq!(packet_out.in_port, OFPP_NONE);
            assert_eq!(
                codec::decode(&packet_out.data),
                Some((0x1, packet_out.out_port))
            );
        }
    }

    #[test]
    fn test_run_once_skips_disabled_ports() {
        let fabric = fabric();
        let mut blocked = PortDesc::up(2);
        blocked.state = port_bits::STATE_STP_BLOCK;
        fabric.set_port(0x1, blocked).unwrap();

        let report = run_once(fabric.as_ref());
        assert_eq!(report.probes_sent, 2);
        let sent = fabric.virtual_switch(0x1).unwrap().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].out_port, 1);
    }

    #[test]
    fn test_run_once_write_failure_continues() {
        let fabric = fabric();
        fabric.fail_writes(0x1, true).unwrap();

        let report = run_once(fabric.as_ref());
        assert_eq!(report.switches, 2);
        assert_eq!(report.probe_errors, 2);
        assert_eq!(report.probes_sent, 1);
        assert_eq!(fabric.virtual_switch(0x2).unwrap().sent().len(), 1);
    }

    #[test]
    fn test_run_once_no_switches() {
        let fabric = LoopbackFabric::new();
        assert_eq!(run_once(&fabric), ProbeReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_pass_after_initial_delay() {
        let fabric = fabric();
        let mut scheduler = ProbeScheduler::spawn(
            fabric.clone(),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );

        tokio::time::sleep(Duration::from_millis(990)).await;
        assert_eq!(scheduler.passes(), 0);
        assert!(fabric.virtual_switch(0x2).unwrap().sent().is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(scheduler.passes(), 1);
        assert_eq!(fabric.virtual_switch(0x2).unwrap().sent().len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(scheduler.passes(), 2);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_passes() {
        let fabric = fabric();
        let mut scheduler = ProbeScheduler::spawn(
            fabric.clone(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(scheduler.passes(), 2);

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        let sent_at_stop = fabric.virtual_switch(0x2).unwrap().sent().len();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(scheduler.passes(), 2);
        assert_eq!(fabric.virtual_switch(0x2).unwrap().sent().len(), sent_at_stop);

        // Second stop is a no-op
        scheduler.stop().await;
    }

    /// One switch whose every write takes `stall`.
    struct SlowProvider {
        switch: Arc<SlowSwitch>,
    }

    struct SlowSwitch {
        stall: Duration,
    }

    impl SwitchHandle for SlowSwitch {
        fn id(&self) -> u64 {
            0x5
        }

        fn enabled_ports(&self) -> Vec<PortDesc> {
            vec![PortDesc::up(1)]
        }

        fn send_packet_out(&self, _packet_out: &PacketOut) -> std::io::Result<()> {
            std::thread::sleep(self.stall);
            Ok(())
        }
    }

    impl ControllerProvider for SlowProvider {
        fn switches(&self) -> Vec<Arc<dyn SwitchHandle>> {
            vec![self.switch.clone()]
        }

        fn switch(&self, id: u64) -> Option<Arc<dyn SwitchHandle>> {
            (id == 0x5).then(|| self.switch.clone() as Arc<dyn SwitchHandle>)
        }

        fn add_message_listener(&self, _: MessageType, _: Arc<dyn MessageListener>) {}

        fn remove_message_listener(&self, _: MessageType, _: &str) {}

        fn add_switch_listener(&self, _: Arc<dyn SwitchListener>) {}

        fn remove_switch_listener(&self, _: &str) {}
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_pass_keeps_fixed_rate() {
        let provider = Arc::new(SlowProvider {
            switch: Arc::new(SlowSwitch {
                stall: Duration::from_millis(40),
            }),
        });
        let mut scheduler = ProbeScheduler::spawn(
            provider,
            Duration::from_millis(10),
            Duration::from_millis(100),
        );

        // Passes start at 10, 110, ..., 910 ms; with the pass time added to
        // the period only 7 would have started.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let passes = scheduler.passes();
        scheduler.stop().await;

        assert!(passes >= 9, "only {} passes", passes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_pass() {
        let fabric = fabric();
        let mut scheduler = ProbeScheduler::spawn(
            fabric.clone(),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        scheduler.stop().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(scheduler.passes(), 0);
        assert!(fabric.virtual_switch(0x1).unwrap().sent().is_empty());
    }
}
