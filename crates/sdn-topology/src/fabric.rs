// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory switch fabric.
//!
//! Implements the controller-side collaborator traits over a set of virtual
//! switches joined by virtual cables. Used by the `simulate` command and by
//! the tests to drive the engine end to end.
//!
//! # How it works
//!
//! 1. A virtual switch's output channel queues every packet-out
//! 2. [`LoopbackFabric::deliver`] drains the queue
//! 3. A frame sent out a cabled port arrives as a packet-in on the far end
//!    and is handed to the registered packet-in listeners

use crate::provider::{ControllerProvider, MessageListener, RoutingSink, SwitchHandle, SwitchListener};
use crate::types::{
    parse_dpid, Disposition, LinkUpdate, MessageType, OfMessage, PacketOut, ParseEndpointError, PortDesc,
    PortReason, PortStatus, SwitchId, SwitchPortRef,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Fabric errors.
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("Unknown switch {0:#x}")]
    UnknownSwitch(SwitchId),

    #[error("Unknown port {0}")]
    UnknownPort(SwitchPortRef),

    #[error("Port {0} is already cabled")]
    PortInUse(SwitchPortRef),

    #[error("Invalid datapath id '{0}'")]
    InvalidDpid(String),

    #[error(transparent)]
    Endpoint(#[from] ParseEndpointError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Delivery statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FabricStats {
    /// Frames handed to a far-end switch.
    pub frames_delivered: u64,
    /// Frames sent out an uncabled, missing or disabled port.
    pub frames_dropped: u64,
}

/// Packet-outs each virtual switch remembers for inspection.
pub const SENT_LOG_CAPACITY: usize = 1024;

/// A frame waiting in a switch output channel.
#[derive(Debug)]
struct Transmit {
    switch_id: SwitchId,
    packet_out: PacketOut,
}

/// A virtual OpenFlow switch.
pub struct VirtualSwitch {
    id: SwitchId,
    ports: RwLock<BTreeMap<u16, PortDesc>>,
    tx: mpsc::UnboundedSender<Transmit>,
    fail_writes: AtomicBool,
    sent: Mutex<VecDeque<PacketOut>>,
    sent_total: AtomicU64,
}

impl VirtualSwitch {
    /// The most recent packet-outs accepted by this switch, oldest first.
    /// At most [`SENT_LOG_CAPACITY`] are kept.
    pub fn sent(&self) -> Vec<PacketOut> {
        self.sent.lock().iter().cloned().collect()
    }

    /// Packet-outs accepted since the switch connected.
    pub fn sent_total(&self) -> u64 {
        self.sent_total.load(Ordering::Relaxed)
    }

    /// All ports, enabled or not.
    pub fn ports(&self) -> Vec<PortDesc> {
        self.ports.read().values().copied().collect()
    }

    fn port(&self, port_no: u16) -> Option<PortDesc> {
        self.ports.read().get(&port_no).copied()
    }
}

impl SwitchHandle for VirtualSwitch {
    fn id(&self) -> SwitchId {
        self.id
    }

    fn enabled_ports(&self) -> Vec<PortDesc> {
        self.ports
            .read()
            .values()
            .filter(|p| p.is_enabled())
            .copied()
            .collect()
    }

    fn send_packet_out(&self, packet_out: &PacketOut) -> io::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("switch {:#x} output channel closed", self.id),
            ));
        }
        self.tx
            .send(Transmit {
                switch_id: self.id,
                packet_out: packet_out.clone(),
            })
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "fabric gone"))?;
        let mut sent = self.sent.lock();
        if sent.len() == SENT_LOG_CAPACITY {
            sent.pop_front();
        }
        sent.push_back(packet_out.clone());
        self.sent_total.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Virtual switches, cables and listener registries.
pub struct LoopbackFabric {
    switches: RwLock<HashMap<SwitchId, Arc<VirtualSwitch>>>,
    /// Cable table, stored in both directions
    cables: RwLock<HashMap<SwitchPortRef, SwitchPortRef>>,
    message_listeners: RwLock<HashMap<MessageType, Vec<Arc<dyn MessageListener>>>>,
    switch_listeners: RwLock<Vec<Arc<dyn SwitchListener>>>,
    tx: mpsc::UnboundedSender<Transmit>,
    rx: Mutex<mpsc::UnboundedReceiver<Transmit>>,
    stats: Mutex<FabricStats>,
}

impl LoopbackFabric {
    /// Create an empty fabric.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            switches: RwLock::new(HashMap::new()),
            cables: RwLock::new(HashMap::new()),
            message_listeners: RwLock::new(HashMap::new()),
            switch_listeners: RwLock::new(Vec::new()),
            tx,
            rx: Mutex::new(rx),
            stats: Mutex::new(FabricStats::default()),
        }
    }

    /// Build a fabric from a parsed description.
    pub fn from_spec(spec: &FabricSpec) -> Result<Self, FabricError> {
        let fabric = Self::new();
        for sw in &spec.switches {
            let id = parse_dpid(&sw.id).ok_or_else(|| FabricError::InvalidDpid(sw.id.clone()))?;
            fabric.connect_switch(id, &sw.ports);
        }
        for cable in &spec.links {
            let a: SwitchPortRef = cable.a.parse()?;
            let b: SwitchPortRef = cable.b.parse()?;
            fabric.wire(a, b)?;
        }
        Ok(fabric)
    }

    /// Load a fabric description from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FabricError> {
        let content = std::fs::read_to_string(path)?;
        let spec: FabricSpec = toml::from_str(&content)?;
        Self::from_spec(&spec)
    }

    /// Connect a switch with the given (enabled) ports.
    ///
    /// Reconnecting a connected id first reports the old instance as removed.
    pub fn connect_switch(&self, id: SwitchId, ports: &[u16]) -> Arc<VirtualSwitch> {
        let sw = Arc::new(VirtualSwitch {
            id,
            ports: RwLock::new(ports.iter().map(|p| (*p, PortDesc::up(*p))).collect()),
            tx: self.tx.clone(),
            fail_writes: AtomicBool::new(false),
            sent: Mutex::new(VecDeque::new()),
            sent_total: AtomicU64::new(0),
        });
        let previous = self.switches.write().insert(id, sw.clone());
        debug!("Switch {:#x} connected with {} port(s)", id, ports.len());

        let listeners = self.switch_listeners.read().clone();
        if let Some(old) = previous {
            debug!("Switch {:#x} reconnected, dropping previous session", id);
            for listener in &listeners {
                listener.switch_removed(old.as_ref());
            }
        }
        for listener in &listeners {
            listener.switch_added(sw.as_ref());
        }
        sw
    }

    /// Disconnect a switch. Its cables stay in place for a later reconnect.
    pub fn disconnect_switch(&self, id: SwitchId) -> Result<(), FabricError> {
        let sw = self
            .switches
            .write()
            .remove(&id)
            .ok_or(FabricError::UnknownSwitch(id))?;
        debug!("Switch {:#x} disconnected", id);

        let listeners = self.switch_listeners.read().clone();
        for listener in listeners {
            listener.switch_removed(sw.as_ref());
        }
        Ok(())
    }

    /// Get a virtual switch.
    pub fn virtual_switch(&self, id: SwitchId) -> Option<Arc<VirtualSwitch>> {
        self.switches.read().get(&id).cloned()
    }

    /// Make writes to `id`'s output channel fail (or succeed again).
    pub fn fail_writes(&self, id: SwitchId, fail: bool) -> Result<(), FabricError> {
        let sw = self.virtual_switch(id).ok_or(FabricError::UnknownSwitch(id))?;
        sw.fail_writes.store(fail, Ordering::Relaxed);
        Ok(())
    }

    /// Plug a cable between two ports.
    pub fn wire(&self, a: SwitchPortRef, b: SwitchPortRef) -> Result<(), FabricError> {
        for end in [a, b] {
            let sw = self
                .virtual_switch(end.switch_id)
                .ok_or(FabricError::UnknownSwitch(end.switch_id))?;
            if sw.port(end.port).is_none() {
                return Err(FabricError::UnknownPort(end));
            }
        }

        let mut cables = self.cables.write();
        for end in [a, b] {
            if cables.contains_key(&end) {
                return Err(FabricError::PortInUse(end));
            }
        }
        cables.insert(a, b);
        cables.insert(b, a);
        Ok(())
    }

    /// Pull the cable attached to `end`, if any. Returns the far end.
    pub fn unwire(&self, end: SwitchPortRef) -> Option<SwitchPortRef> {
        let mut cables = self.cables.write();
        let peer = cables.remove(&end)?;
        cables.remove(&peer);
        Some(peer)
    }

    /// Add or change a port and report it as a port-status message.
    pub fn set_port(&self, id: SwitchId, desc: PortDesc) -> Result<(), FabricError> {
        let sw = self.virtual_switch(id).ok_or(FabricError::UnknownSwitch(id))?;
        let reason = match sw.ports.write().insert(desc.port_no, desc) {
            Some(_) => PortReason::Modify,
            None => PortReason::Add,
        };
        self.dispatch(sw.as_ref(), &OfMessage::PortStatus(PortStatus { reason, desc }));
        Ok(())
    }

    /// Remove a port and report it as a port-status message.
    pub fn delete_port(&self, id: SwitchId, port_no: u16) -> Result<(), FabricError> {
        let sw = self.virtual_switch(id).ok_or(FabricError::UnknownSwitch(id))?;
        let desc = sw
            .ports
            .write()
            .remove(&port_no)
            .ok_or(FabricError::UnknownPort(SwitchPortRef::new(id, port_no)))?;
        self.dispatch(
            sw.as_ref(),
            &OfMessage::PortStatus(PortStatus {
                reason: PortReason::Delete,
                desc,
            }),
        );
        Ok(())
    }

    /// Offer a message to the registered listeners in order until one consumes it.
    pub fn dispatch(&self, switch: &dyn SwitchHandle, msg: &OfMessage) -> Disposition {
        let listeners = self
            .message_listeners
            .read()
            .get(&msg.message_type())
            .cloned()
            .unwrap_or_default();

        for listener in listeners {
            if listener.receive(switch, msg) == Disposition::Consumed {
                trace!("{:?} consumed by {}", msg.message_type(), listener.name());
                return Disposition::Consumed;
            }
        }
        Disposition::NotConsumed
    }

    /// Carry every queued frame across its cable. Returns frames delivered.
    pub fn deliver(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.rx.lock().try_recv();
            let Ok(transmit) = next else {
                break;
            };

            let from = SwitchPortRef::new(transmit.switch_id, transmit.packet_out.out_port);
            match self.far_end(from) {
                Some((peer_switch, in_port)) => {
                    let msg = OfMessage::PacketIn {
                        in_port,
                        data: transmit.packet_out.data,
                    };
                    self.dispatch(peer_switch.as_ref(), &msg);
                    self.stats.lock().frames_delivered += 1;
                    delivered += 1;
                }
                None => {
                    trace!("Dropped frame sent out {}", from);
                    self.stats.lock().frames_dropped += 1;
                }
            }
        }
        delivered
    }

    /// Switch and ingress port a frame sent out `from` lands on.
    fn far_end(&self, from: SwitchPortRef) -> Option<(Arc<VirtualSwitch>, u16)> {
        let local = self.virtual_switch(from.switch_id)?;
        if !local.port(from.port)?.is_enabled() {
            return None;
        }
        let peer = *self.cables.read().get(&from)?;
        let remote = self.virtual_switch(peer.switch_id)?;
        if !remote.port(peer.port)?.is_enabled() {
            return None;
        }
        Some((remote, peer.port))
    }

    /// Get delivery statistics.
    pub fn stats(&self) -> FabricStats {
        self.stats.lock().clone()
    }

    /// Number of listeners registered for `msg_type`.
    pub fn listener_count(&self, msg_type: MessageType) -> usize {
        self.message_listeners
            .read()
            .get(&msg_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Number of switch lifecycle listeners.
    pub fn switch_listener_count(&self) -> usize {
        self.switch_listeners.read().len()
    }
}

impl Default for LoopbackFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerProvider for LoopbackFabric {
    fn switches(&self) -> Vec<Arc<dyn SwitchHandle>> {
        let mut switches: Vec<Arc<VirtualSwitch>> = self.switches.read().values().cloned().collect();
        switches.sort_by_key(|sw| sw.id);
        switches
            .into_iter()
            .map(|sw| sw as Arc<dyn SwitchHandle>)
            .collect()
    }

    fn switch(&self, id: SwitchId) -> Option<Arc<dyn SwitchHandle>> {
        self.virtual_switch(id).map(|sw| sw as Arc<dyn SwitchHandle>)
    }

    fn add_message_listener(&self, msg_type: MessageType, listener: Arc<dyn MessageListener>) {
        self.message_listeners
            .write()
            .entry(msg_type)
            .or_default()
            .push(listener);
    }

    fn remove_message_listener(&self, msg_type: MessageType, name: &str) {
        if let Some(list) = self.message_listeners.write().get_mut(&msg_type) {
            list.retain(|l| l.name() != name);
        }
    }

    fn add_switch_listener(&self, listener: Arc<dyn SwitchListener>) {
        self.switch_listeners.write().push(listener);
    }

    fn remove_switch_listener(&self, name: &str) {
        self.switch_listeners.write().retain(|l| l.name() != name);
    }
}

/// Routing sink that remembers every update, in order.
#[derive(Debug, Default)]
pub struct RecordingRouting {
    updates: Mutex<Vec<LinkUpdate>>,
}

impl RecordingRouting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<LinkUpdate> {
        self.updates.lock().clone()
    }

    pub fn clear(&self) {
        self.updates.lock().clear();
    }
}

impl RoutingSink for RecordingRouting {
    fn update(&self, update: LinkUpdate) {
        self.updates.lock().push(update);
    }
}

/// Fabric description file.
///
/// ```toml
/// [[switches]]
/// id = "0x1"
/// ports = [1, 2, 3]
///
/// [[switches]]
/// id = "0x2"
/// ports = [7]
///
/// [[links]]
/// a = "0x1:3"
/// b = "0x2:7"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FabricSpec {
    #[serde(default)]
    pub switches: Vec<SwitchSpec>,

    #[serde(default)]
    pub links: Vec<CableSpec>,
}

/// One switch in a fabric description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSpec {
    /// Datapath id, decimal or `0x` hex
    pub id: String,

    #[serde(default)]
    pub ports: Vec<u16>,
}

/// A cable between two `<dpid>:<port>` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableSpec {
    pub a: String,
    pub b: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OFPP_LOCAL;

    struct Sink {
        name: &'static str,
        verdict: Disposition,
        seen: Mutex<Vec<(SwitchId, OfMessage)>>,
    }

    impl Sink {
        fn new(name: &'static str, verdict: Disposition) -> Arc<Self> {
            Arc::new(Self {
                name,
                verdict,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl MessageListener for Sink {
        fn name(&self) -> &str {
            self.name
        }

        fn receive(&self, switch: &dyn SwitchHandle, msg: &OfMessage) -> Disposition {
            self.seen.lock().push((switch.id(), msg.clone()));
            self.verdict
        }
    }

    #[test]
    fn test_fabric_new() {
        let fabric = LoopbackFabric::new();
        assert!(fabric.switches().is_empty());
        assert_eq!(fabric.stats(), FabricStats::default());
    }

    #[test]
    fn test_frame_crosses_cable() {
        let fabric = LoopbackFabric::new();
        fabric.connect_switch(1, &[3]);
        fabric.connect_switch(2, &[7]);
        fabric
            .wire(SwitchPortRef::new(1, 3), SwitchPortRef::new(2, 7))
            .unwrap();

        let sink = Sink::new("sink", Disposition::Consumed);
        fabric.add_message_listener(MessageType::PacketIn, sink.clone());

        let sw1 = fabric.switch(1).unwrap();
        sw1.send_packet_out(&PacketOut::to_port(3, vec![0xaa])).unwrap();
        assert_eq!(fabric.deliver(), 1);

        let seen = sink.seen.lock().clone();
        assert_eq!(
            seen,
            vec![(
                2,
                OfMessage::PacketIn {
                    in_port: 7,
                    data: vec![0xaa]
                }
            )]
        );
        assert_eq!(fabric.stats().frames_delivered, 1);
    }

    #[test]
    fn test_uncabled_port_drops() {
        let fabric = LoopbackFabric::new();
        let sw = fabric.connect_switch(1, &[1, 2]);
        sw.send_packet_out(&PacketOut::to_port(2, vec![1])).unwrap();
        sw.send_packet_out(&PacketOut::to_port(OFPP_LOCAL, vec![1]))
            .unwrap();

        assert_eq!(fabric.deliver(), 0);
        assert_eq!(fabric.stats().frames_dropped, 2);
        assert_eq!(sw.sent().len(), 2);
    }

    #[test]
    fn test_disabled_port_drops() {
        let fabric = LoopbackFabric::new();
        fabric.connect_switch(1, &[1]);
        fabric.connect_switch(2, &[1]);
        fabric
            .wire(SwitchPortRef::new(1, 1), SwitchPortRef::new(2, 1))
            .unwrap();

        let mut down = PortDesc::up(1);
        down.config = crate::types::port_bits::CONFIG_PORT_DOWN;
        fabric.set_port(2, down).unwrap();

        let sw1 = fabric.switch(1).unwrap();
        sw1.send_packet_out(&PacketOut::to_port(1, vec![1])).unwrap();
        assert_eq!(fabric.deliver(), 0);
        assert!(fabric.switch(2).unwrap().enabled_ports().is_empty());
    }

    #[test]
    fn test_dispatch_stops_at_consumer() {
        let fabric = LoopbackFabric::new();
        let sw = fabric.connect_switch(1, &[1]);
        let first = Sink::new("first", Disposition::NotConsumed);
        let second = Sink::new("second", Disposition::Consumed);
        let third = Sink::new("third", Disposition::Consumed);
        fabric.add_message_listener(MessageType::PacketIn, first.clone());
        fabric.add_message_listener(MessageType::PacketIn, second.clone());
        fabric.add_message_listener(MessageType::PacketIn, third.clone());

        let msg = OfMessage::PacketIn {
            in_port: 1,
            data: vec![],
        };
        assert_eq!(fabric.dispatch(sw.as_ref(), &msg), Disposition::Consumed);
        assert_eq!(first.seen.lock().len(), 1);
        assert_eq!(second.seen.lock().len(), 1);
        assert!(third.seen.lock().is_empty());

        fabric.remove_message_listener(MessageType::PacketIn, "second");
        assert_eq!(fabric.listener_count(MessageType::PacketIn), 2);
    }

    #[test]
    fn test_port_status_reasons() {
        let fabric = LoopbackFabric::new();
        fabric.connect_switch(1, &[1]);
        let sink = Sink::new("sink", Disposition::NotConsumed);
        fabric.add_message_listener(MessageType::PortStatus, sink.clone());

        fabric.set_port(1, PortDesc::up(2)).unwrap();
        fabric.set_port(1, PortDesc::up(2)).unwrap();
        fabric.delete_port(1, 2).unwrap();

        let reasons: Vec<PortReason> = sink
            .seen
            .lock()
            .iter()
            .map(|(_, msg)| match msg {
                OfMessage::PortStatus(status) => status.reason,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![PortReason::Add, PortReason::Modify, PortReason::Delete]
        );
        assert!(matches!(
            fabric.delete_port(1, 2),
            Err(FabricError::UnknownPort(_))
        ));
    }

    #[test]
    fn test_fail_writes() {
        let fabric = LoopbackFabric::new();
        let sw = fabric.connect_switch(1, &[1]);
        fabric.fail_writes(1, true).unwrap();
        assert!(sw.send_packet_out(&PacketOut::to_port(1, vec![])).is_err());
        assert!(sw.sent().is_empty());

        fabric.fail_writes(1, false).unwrap();
        assert!(sw.send_packet_out(&PacketOut::to_port(1, vec![])).is_ok());
    }

    #[test]
    fn test_sent_log_is_bounded() {
        let fabric = LoopbackFabric::new();
        let sw = fabric.connect_switch(1, &[1]);
        let extra = 76;
        for i in 0..SENT_LOG_CAPACITY + extra {
            sw.send_packet_out(&PacketOut::to_port(1, (i as u32).to_be_bytes().to_vec()))
                .unwrap();
        }

        let sent = sw.sent();
        assert_eq!(sent.len(), SENT_LOG_CAPACITY);
        assert_eq!(sent[0].data, (extra as u32).to_be_bytes().to_vec());
        assert_eq!(sw.sent_total(), (SENT_LOG_CAPACITY + extra) as u64);
    }

    struct Lifecycle {
        events: Mutex<Vec<(&'static str, SwitchId, usize)>>,
    }

    impl SwitchListener for Lifecycle {
        fn name(&self) -> &str {
            "lifecycle"
        }

        fn switch_added(&self, switch: &dyn SwitchHandle) {
            let ports = switch.enabled_ports().len();
            self.events.lock().push(("added", switch.id(), ports));
        }

        fn switch_removed(&self, switch: &dyn SwitchHandle) {
            let ports = switch.enabled_ports().len();
            self.events.lock().push(("removed", switch.id(), ports));
        }
    }

    #[test]
    fn test_reconnect_reports_old_session_removed() {
        let fabric = LoopbackFabric::new();
        let lifecycle = Arc::new(Lifecycle {
            events: Mutex::new(Vec::new()),
        });
        fabric.add_switch_listener(lifecycle.clone());

        fabric.connect_switch(1, &[1, 2]);
        fabric.connect_switch(1, &[5]);

        assert_eq!(
            lifecycle.events.lock().clone(),
            vec![("added", 1, 2), ("removed", 1, 2), ("added", 1, 1)]
        );
        assert_eq!(fabric.switches().len(), 1);
    }

    #[test]
    fn test_wire_errors() {
        let fabric = LoopbackFabric::new();
        fabric.connect_switch(1, &[1, 2]);
        fabric.connect_switch(2, &[1]);

        assert!(matches!(
            fabric.wire(SwitchPortRef::new(1, 1), SwitchPortRef::new(9, 1)),
            Err(FabricError::UnknownSwitch(9))
        ));
        assert!(matches!(
            fabric.wire(SwitchPortRef::new(1, 5), SwitchPortRef::new(2, 1)),
            Err(FabricError::UnknownPort(_))
        ));

        fabric
            .wire(SwitchPortRef::new(1, 1), SwitchPortRef::new(2, 1))
            .unwrap();
        assert!(matches!(
            fabric.wire(SwitchPortRef::new(1, 2), SwitchPortRef::new(2, 1)),
            Err(FabricError::PortInUse(_))
        ));

        assert_eq!(
            fabric.unwire(SwitchPortRef::new(2, 1)),
            Some(SwitchPortRef::new(1, 1))
        );
        assert_eq!(fabric.unwire(SwitchPortRef::new(1, 1)), None);
    }

    #[test]
    fn test_from_spec_toml() {
        let spec: FabricSpec = toml::from_str(
            r#"
            [[switches]]
            id = "0x1"
            ports = [1, 2, 3]

            [[switches]]
            id = "2"
            ports = [7]

            [[links]]
            a = "0x1:3"
            b = "2:7"
            "#,
        )
        .unwrap();

        let fabric = LoopbackFabric::from_spec(&spec).unwrap();
        assert_eq!(fabric.switches().len(), 2);
        assert_eq!(
            fabric.unwire(SwitchPortRef::new(2, 7)),
            Some(SwitchPortRef::new(1, 3))
        );
    }

    #[test]
    fn test_from_spec_bad_dpid() {
        let spec = FabricSpec {
            switches: vec![SwitchSpec {
                id: "zz".into(),
                ports: vec![],
            }],
            links: vec![],
        };
        assert!(matches!(
            LoopbackFabric::from_spec(&spec),
            Err(FabricError::InvalidDpid(_))
        ));
    }
}
