// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery event state machine.
//!
//! Turns returned probes into links and port/switch loss into link removal,
//! telling routing about every transition exactly once.

use crate::codec;
use crate::provider::{ControllerProvider, MessageListener, RoutingSink, SwitchHandle, SwitchListener};
use crate::store::{LinkStateStore, Upsert};
use crate::types::{Disposition, Link, OfMessage, PortStatus, SwitchId, SwitchPortRef};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Listener name used with the dispatch registry.
pub const LISTENER_NAME: &str = "topology";

/// Inbound events the processor reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A data frame punted to the controller.
    InboundData {
        switch_id: SwitchId,
        in_port: u16,
        frame: Vec<u8>,
    },

    /// A port changed state on a switch.
    PortStatus {
        switch_id: SwitchId,
        status: PortStatus,
    },

    /// A switch connected.
    SwitchAdded { switch_id: SwitchId },

    /// A switch disconnected.
    SwitchRemoved { switch_id: SwitchId },
}

/// Event processor bound to one store and one routing sink.
pub struct DiscoveryEventProcessor {
    store: Arc<LinkStateStore>,
    provider: Arc<dyn ControllerProvider>,
    routing: Arc<dyn RoutingSink>,
}

impl DiscoveryEventProcessor {
    pub fn new(
        store: Arc<LinkStateStore>,
        provider: Arc<dyn ControllerProvider>,
        routing: Arc<dyn RoutingSink>,
    ) -> Self {
        Self {
            store,
            provider,
            routing,
        }
    }

    /// The store this processor mutates.
    pub fn store(&self) -> &Arc<LinkStateStore> {
        &self.store
    }

    /// Process one event.
    pub fn handle(&self, event: DiscoveryEvent) -> Disposition {
        match event {
            DiscoveryEvent::InboundData {
                switch_id,
                in_port,
                frame,
            } => self.handle_inbound(switch_id, in_port, &frame),
            DiscoveryEvent::PortStatus { switch_id, status } => {
                self.handle_port_status(switch_id, status);
                Disposition::NotConsumed
            }
            DiscoveryEvent::SwitchAdded { switch_id } => {
                debug!("Switch {:#x} added", switch_id);
                Disposition::NotConsumed
            }
            DiscoveryEvent::SwitchRemoved { switch_id } => {
                self.handle_switch_removed(switch_id);
                Disposition::NotConsumed
            }
        }
    }

    fn handle_inbound(&self, switch_id: SwitchId, in_port: u16, frame: &[u8]) -> Disposition {
        if !codec::is_lldp(frame) {
            return Disposition::NotConsumed;
        }

        // LLDP never goes further down the chain, ours or not
        let Some((remote_id, remote_port)) = codec::decode(frame) else {
            debug!(
                "Ignoring foreign LLDP on {:#x}:{} ({} bytes)",
                switch_id,
                in_port,
                frame.len()
            );
            return Disposition::Consumed;
        };

        if self.provider.switch(remote_id).is_none() {
            error!(
                "Failed to locate remote switch {:#x} for probe received on {:#x}:{}",
                remote_id, switch_id, in_port
            );
            return Disposition::Consumed;
        }

        let link = Link::new(
            SwitchPortRef::new(remote_id, remote_port),
            SwitchPortRef::new(switch_id, in_port),
        );

        match self.store.upsert(link) {
            Upsert::Inserted => {
                info!("Link discovered: {}", link);
                self.routing.update(link.update(true));
                self.drop_if_orphaned(link);
            }
            Upsert::Refreshed => {
                debug!("Link refreshed: {}", link);
            }
        }

        Disposition::Consumed
    }

    /// Undo an insert whose endpoint switch disconnected meanwhile.
    ///
    /// The registry drops a switch before notifying listeners, so either this
    /// check or the pending switch removal sees the link.
    fn drop_if_orphaned(&self, link: Link) {
        let gone = [link.source.switch_id, link.destination.switch_id]
            .into_iter()
            .find(|id| self.provider.switch(*id).is_none());
        let Some(switch_id) = gone else {
            return;
        };

        if self.store.remove(&link) {
            debug!(
                "Switch {:#x} disconnected while {} was recorded, dropping it",
                switch_id, link
            );
            self.notify_down(&[link]);
        }
    }

    fn handle_port_status(&self, switch_id: SwitchId, status: PortStatus) {
        if !status.takes_port_down() {
            return;
        }

        let port = SwitchPortRef::new(switch_id, status.desc.port_no);
        let removed = self.store.remove_port(port);
        if !removed.is_empty() {
            info!(
                "Port {} went down ({:?}), removed {} link(s)",
                port,
                status.reason,
                removed.len()
            );
        }
        self.notify_down(&removed);
    }

    fn handle_switch_removed(&self, switch_id: SwitchId) {
        let removed = self.store.remove_switch(switch_id);
        info!(
            "Switch {:#x} removed, dropped {} link(s)",
            switch_id,
            removed.len()
        );
        self.notify_down(&removed);
    }

    /// Tell routing each link in `removed` is gone.
    pub(crate) fn notify_down(&self, removed: &[Link]) {
        for link in removed {
            debug!("Link down: {}", link);
            self.routing.update(link.update(false));
        }
    }
}

impl MessageListener for DiscoveryEventProcessor {
    fn name(&self) -> &str {
        LISTENER_NAME
    }

    fn receive(&self, switch: &dyn SwitchHandle, msg: &OfMessage) -> Disposition {
        let event = match msg {
            OfMessage::PacketIn { data, .. } if !codec::is_lldp(data) => {
                return Disposition::NotConsumed;
            }
            OfMessage::PacketIn { in_port, data } => DiscoveryEvent::InboundData {
                switch_id: switch.id(),
                in_port: *in_port,
                frame: data.clone(),
            },
            OfMessage::PortStatus(status) => DiscoveryEvent::PortStatus {
                switch_id: switch.id(),
                status: *status,
            },
        };
        self.handle(event)
    }
}

impl SwitchListener for DiscoveryEventProcessor {
    fn name(&self) -> &str {
        LISTENER_NAME
    }

    fn switch_added(&self, switch: &dyn SwitchHandle) {
        self.handle(DiscoveryEvent::SwitchAdded {
            switch_id: switch.id(),
        });
    }

    fn switch_removed(&self, switch: &dyn SwitchHandle) {
        self.handle(DiscoveryEvent::SwitchRemoved {
            switch_id: switch.id(),
        });
    }
}
