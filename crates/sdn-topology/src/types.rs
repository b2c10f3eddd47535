// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core value types shared by the discovery engine.
//!
//! Port descriptors, port-status reasons and the packet-out instruction follow
//! the OpenFlow 1.0 layout the switch connection layer hands us.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Datapath identifier of a switch.
pub type SwitchId = u64;

/// The switch-local pseudo port (never probed).
pub const OFPP_LOCAL: u16 = 0xfffe;

/// "No port" marker used as `in_port` for controller-originated packets.
pub const OFPP_NONE: u16 = 0xffff;

/// Packet-out buffer id meaning "data is carried inline".
pub const BUFFER_ID_NONE: u32 = 0xffff_ffff;

/// Port config / state bits.
pub mod port_bits {
    /// Port is administratively down.
    pub const CONFIG_PORT_DOWN: u32 = 1 << 0;
    /// No physical link present.
    pub const STATE_LINK_DOWN: u32 = 1 << 0;
    /// Mask of the spanning-tree state field.
    pub const STATE_STP_MASK: u32 = 3 << 8;
    /// Spanning-tree blocking state.
    pub const STATE_STP_BLOCK: u32 = 3 << 8;
}

/// One endpoint of a link: a (switch, port) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SwitchPortRef {
    pub switch_id: SwitchId,
    pub port: u16,
}

impl SwitchPortRef {
    pub fn new(switch_id: SwitchId, port: u16) -> Self {
        Self { switch_id, port }
    }
}

impl fmt::Display for SwitchPortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}:{}", self.switch_id, self.port)
    }
}

/// Endpoint parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid endpoint '{0}', expected <dpid>:<port>")]
pub struct ParseEndpointError(pub String);

impl FromStr for SwitchPortRef {
    type Err = ParseEndpointError;

    /// Parses `<dpid>:<port>`, dpid in decimal or `0x` hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseEndpointError(s.to_string());
        let (dpid, port) = s.trim().rsplit_once(':').ok_or_else(err)?;
        let switch_id = parse_dpid(dpid).ok_or_else(err)?;
        let port = port.parse::<u16>().map_err(|_| err())?;
        Ok(Self { switch_id, port })
    }
}

/// Parse a datapath id given as decimal or `0x`-prefixed hex.
pub fn parse_dpid(s: &str) -> Option<SwitchId> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// A verified directed adjacency.
///
/// `source` is the port the probe was sent out of, `destination` the port it
/// arrived on. The reverse direction is a separate link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub source: SwitchPortRef,
    pub destination: SwitchPortRef,
}

impl Link {
    pub fn new(source: SwitchPortRef, destination: SwitchPortRef) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// True if either endpoint is `port`.
    pub fn touches_port(&self, port: &SwitchPortRef) -> bool {
        self.source == *port || self.destination == *port
    }

    /// True if either endpoint lives on `switch_id`.
    pub fn touches_switch(&self, switch_id: SwitchId) -> bool {
        self.source.switch_id == switch_id || self.destination.switch_id == switch_id
    }

    /// Routing notification for this link.
    pub fn update(&self, up: bool) -> LinkUpdate {
        LinkUpdate {
            src_switch: self.source.switch_id,
            src_port: self.source.port,
            dst_switch: self.destination.switch_id,
            dst_port: self.destination.port,
            up,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// A link together with the time it was last verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRecord {
    pub link: Link,
    pub last_verified: Instant,
}

/// Notification pushed to the routing component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub src_switch: SwitchId,
    pub src_port: u16,
    pub dst_switch: SwitchId,
    pub dst_port: u16,
    pub up: bool,
}

/// Physical port descriptor as last reported by the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDesc {
    pub port_no: u16,
    #[serde(default)]
    pub config: u32,
    #[serde(default)]
    pub state: u32,
}

impl PortDesc {
    /// An up, forwarding port.
    pub fn up(port_no: u16) -> Self {
        Self {
            port_no,
            config: 0,
            state: 0,
        }
    }

    pub fn is_config_down(&self) -> bool {
        self.config & port_bits::CONFIG_PORT_DOWN != 0
    }

    pub fn is_link_down(&self) -> bool {
        self.state & port_bits::STATE_LINK_DOWN != 0
    }

    pub fn is_stp_blocked(&self) -> bool {
        self.state & port_bits::STATE_STP_MASK == port_bits::STATE_STP_BLOCK
    }

    /// Not configured down, not link down, not spanning-tree blocked.
    pub fn is_enabled(&self) -> bool {
        !self.is_config_down() && !self.is_link_down() && !self.is_stp_blocked()
    }
}

/// Why a port-status message was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortReason {
    Add,
    Delete,
    Modify,
}

/// Asynchronous port-status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStatus {
    pub reason: PortReason,
    pub desc: PortDesc,
}

impl PortStatus {
    /// Whether links on this port must be torn down.
    pub fn takes_port_down(&self) -> bool {
        match self.reason {
            PortReason::Delete => true,
            PortReason::Modify => !self.desc.is_enabled(),
            PortReason::Add => false,
        }
    }
}

/// Instruction to transmit `data` out exactly one port, unbuffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    pub buffer_id: u32,
    pub in_port: u16,
    pub out_port: u16,
    pub data: Vec<u8>,
}

impl PacketOut {
    pub fn to_port(out_port: u16, data: Vec<u8>) -> Self {
        Self {
            buffer_id: BUFFER_ID_NONE,
            in_port: OFPP_NONE,
            out_port,
            data,
        }
    }
}

/// Inbound switch messages the engine listens for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfMessage {
    PacketIn { in_port: u16, data: Vec<u8> },
    PortStatus(PortStatus),
}

impl OfMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::PacketIn { .. } => MessageType::PacketIn,
            Self::PortStatus(_) => MessageType::PortStatus,
        }
    }
}

/// Message categories a listener can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    PacketIn,
    PortStatus,
}

/// Listener verdict: stop the dispatch chain or let others see the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Consumed,
    NotConsumed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        let ep: SwitchPortRef = "0x1:3".parse().unwrap();
        assert_eq!(ep, SwitchPortRef::new(1, 3));

        let ep: SwitchPortRef = "42:7".parse().unwrap();
        assert_eq!(ep, SwitchPortRef::new(42, 7));

        assert!("42".parse::<SwitchPortRef>().is_err());
        assert!("x:1".parse::<SwitchPortRef>().is_err());
        assert!("1:70000".parse::<SwitchPortRef>().is_err());
    }

    #[test]
    fn test_link_is_directed() {
        let a = SwitchPortRef::new(1, 3);
        let b = SwitchPortRef::new(2, 7);
        assert_ne!(Link::new(a, b), Link::new(b, a));
        assert!(Link::new(a, b).touches_port(&b));
        assert!(Link::new(a, b).touches_switch(1));
        assert!(!Link::new(a, b).touches_switch(3));
    }

    #[test]
    fn test_link_update_keeps_direction() {
        let link = Link::new(SwitchPortRef::new(1, 3), SwitchPortRef::new(2, 7));
        let update = link.update(false);
        assert_eq!(
            update,
            LinkUpdate {
                src_switch: 1,
                src_port: 3,
                dst_switch: 2,
                dst_port: 7,
                up: false,
            }
        );
    }

    #[test]
    fn test_port_enabled() {
        assert!(PortDesc::up(1).is_enabled());

        let mut desc = PortDesc::up(1);
        desc.config = port_bits::CONFIG_PORT_DOWN;
        assert!(!desc.is_enabled());

        let mut desc = PortDesc::up(1);
        desc.state = port_bits::STATE_LINK_DOWN;
        assert!(!desc.is_enabled());

        let mut desc = PortDesc::up(1);
        desc.state = port_bits::STATE_STP_BLOCK;
        assert!(!desc.is_enabled());

        // STP forwarding (2 << 8) is fine
        let mut desc = PortDesc::up(1);
        desc.state = 2 << 8;
        assert!(desc.is_enabled());
    }

    #[test]
    fn test_port_status_takes_port_down() {
        let delete = PortStatus {
            reason: PortReason::Delete,
            desc: PortDesc::up(3),
        };
        assert!(delete.takes_port_down());

        let modify_up = PortStatus {
            reason: PortReason::Modify,
            desc: PortDesc::up(3),
        };
        assert!(!modify_up.takes_port_down());

        let mut down = PortDesc::up(3);
        down.state = port_bits::STATE_LINK_DOWN;
        let modify_down = PortStatus {
            reason: PortReason::Modify,
            desc: down,
        };
        assert!(modify_down.takes_port_down());

        let add_down = PortStatus {
            reason: PortReason::Add,
            desc: down,
        };
        assert!(!add_down.takes_port_down());
    }
}
