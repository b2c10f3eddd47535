// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collaborator interfaces.
//!
//! The switch connection layer, the message-dispatch registry and the routing
//! component live outside this crate. The engine only talks to them through
//! the traits below.

use crate::types::{Disposition, LinkUpdate, MessageType, OfMessage, PacketOut, PortDesc, SwitchId};
use std::io;
use std::sync::Arc;

/// A connected switch as seen by the controller.
pub trait SwitchHandle: Send + Sync {
    /// Datapath id.
    fn id(&self) -> SwitchId;

    /// Ports currently enabled per the latest port-status messages.
    fn enabled_ports(&self) -> Vec<PortDesc>;

    /// Queue a packet-out on the switch's output channel.
    fn send_packet_out(&self, packet_out: &PacketOut) -> io::Result<()>;
}

/// Receives inbound switch messages of the types it registered for.
pub trait MessageListener: Send + Sync {
    /// Name used to unregister.
    fn name(&self) -> &str;

    fn receive(&self, switch: &dyn SwitchHandle, msg: &OfMessage) -> Disposition;
}

/// Receives switch connect/disconnect notifications.
pub trait SwitchListener: Send + Sync {
    fn name(&self) -> &str;

    fn switch_added(&self, switch: &dyn SwitchHandle);

    fn switch_removed(&self, switch: &dyn SwitchHandle);
}

/// Switch registry plus listener registration, provided by the controller core.
pub trait ControllerProvider: Send + Sync {
    /// All currently connected switches.
    fn switches(&self) -> Vec<Arc<dyn SwitchHandle>>;

    /// Look up a connected switch.
    fn switch(&self, id: SwitchId) -> Option<Arc<dyn SwitchHandle>>;

    fn add_message_listener(&self, msg_type: MessageType, listener: Arc<dyn MessageListener>);

    fn remove_message_listener(&self, msg_type: MessageType, name: &str);

    fn add_switch_listener(&self, listener: Arc<dyn SwitchListener>);

    fn remove_switch_listener(&self, name: &str);
}

/// One-way sink for link state changes.
pub trait RoutingSink: Send + Sync {
    fn update(&self, update: LinkUpdate);
}
