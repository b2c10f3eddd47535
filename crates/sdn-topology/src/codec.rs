// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery probe wire format.
//!
//! Probes are ordinary LLDP frames carrying one extra organizationally
//! specific TLV with the full 64-bit datapath id. That TLV is what marks a
//! frame as one of ours; any other LLDP speaker's frames decode to `None`.
//!
//! Wire format:
//! ```text
//! +----------------+----------------+-----------+
//! | dst MAC (6B)   | src MAC (6B)   | 0x88CC    |
//! +----------------+----------------+-----------+
//! | Chassis-ID  type 1   len 7   subtype 4 | dpid[2..8]      |
//! | Port-ID     type 2   len 3   subtype 2 | port (BE)       |
//! | TTL         type 3   len 2   120                         |
//! | Vendor      type 127 len 12  00:26:E1 00 | dpid (BE, 8B) |
//! | End         type 0   len 0                               |
//! +--------------------------------------------------------+
//! ```
//!
//! Each TLV header is one big-endian 16-bit word: 7 bits of type followed by
//! 9 bits of length.

use crate::types::SwitchId;

/// Nearest-bridge LLDP multicast group.
pub const LLDP_MULTICAST: [u8; 6] = [0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e];

/// LLDP ethertype.
pub const ETHERTYPE_LLDP: u16 = 0x88cc;

/// 802.1Q VLAN tag ethertype.
pub const ETHERTYPE_VLAN: u16 = 0x8100;

/// OpenFlow OUI marking our vendor TLV.
pub const OPENFLOW_OUI: [u8; 3] = [0x00, 0x26, 0xe1];

/// Advertised time-to-live in seconds.
pub const PROBE_TTL_SECS: u16 = 120;

/// TLV type codes.
pub mod tlv_type {
    pub const END: u8 = 0;
    pub const CHASSIS_ID: u8 = 1;
    pub const PORT_ID: u8 = 2;
    pub const TTL: u8 = 3;
    pub const ORG_SPECIFIC: u8 = 127;
}

const CHASSIS_SUBTYPE_MAC: u8 = 4;
const PORT_SUBTYPE_COMPONENT: u8 = 2;
const VENDOR_SUBTYPE_DPID: u8 = 0x00;
const VENDOR_TLV_LEN: usize = 12;
const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

/// Encoded probe size (no padding, no FCS).
pub const PROBE_FRAME_LEN: usize = ETH_HEADER_LEN + (2 + 7) + (2 + 3) + (2 + 2) + (2 + 12) + 2;

fn put_tlv(buf: &mut Vec<u8>, kind: u8, value: &[u8]) {
    let header = (u16::from(kind) << 9) | (value.len() as u16 & 0x01ff);
    buf.extend_from_slice(&header.to_be_bytes());
    buf.extend_from_slice(value);
}

/// Build the probe frame for `switch_id` / `port`.
pub fn encode(switch_id: SwitchId, port: u16) -> Vec<u8> {
    let dpid = switch_id.to_be_bytes();
    let mac = &dpid[2..8];

    let mut buf = Vec::with_capacity(PROBE_FRAME_LEN);
    buf.extend_from_slice(&LLDP_MULTICAST);
    buf.extend_from_slice(mac);
    buf.extend_from_slice(&ETHERTYPE_LLDP.to_be_bytes());

    let mut chassis = [0u8; 7];
    chassis[0] = CHASSIS_SUBTYPE_MAC;
    chassis[1..].copy_from_slice(mac);
    put_tlv(&mut buf, tlv_type::CHASSIS_ID, &chassis);

    let port_be = port.to_be_bytes();
    put_tlv(
        &mut buf,
        tlv_type::PORT_ID,
        &[PORT_SUBTYPE_COMPONENT, port_be[0], port_be[1]],
    );

    put_tlv(&mut buf, tlv_type::TTL, &PROBE_TTL_SECS.to_be_bytes());

    let mut vendor = [0u8; VENDOR_TLV_LEN];
    vendor[..3].copy_from_slice(&OPENFLOW_OUI);
    vendor[3] = VENDOR_SUBTYPE_DPID;
    vendor[4..].copy_from_slice(&dpid);
    put_tlv(&mut buf, tlv_type::ORG_SPECIFIC, &vendor);

    put_tlv(&mut buf, tlv_type::END, &[]);

    debug_assert_eq!(buf.len(), PROBE_FRAME_LEN);
    buf
}

/// Offset of the LLDPDU if `frame` is LLDP-tagged (optionally behind one VLAN tag).
fn lldp_payload_offset(frame: &[u8]) -> Option<usize> {
    let ethertype_at = |offset: usize| -> Option<u16> {
        let bytes = frame.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    };

    match ethertype_at(12)? {
        ETHERTYPE_LLDP => Some(ETH_HEADER_LEN),
        ETHERTYPE_VLAN if ethertype_at(16)? == ETHERTYPE_LLDP => {
            Some(ETH_HEADER_LEN + VLAN_TAG_LEN)
        }
        _ => None,
    }
}

/// Whether the frame carries an LLDP payload at all.
pub fn is_lldp(frame: &[u8]) -> bool {
    lldp_payload_offset(frame).is_some()
}

/// Iterator over the TLVs of an LLDPDU.
///
/// Stops at the End TLV or at the first TLV that runs past the buffer.
struct Tlvs<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Tlvs<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.buf.get(self.offset..self.offset + 2)?;
        let word = u16::from_be_bytes([header[0], header[1]]);
        let kind = (word >> 9) as u8;
        let len = usize::from(word & 0x01ff);

        if kind == tlv_type::END {
            return None;
        }

        let start = self.offset + 2;
        let value = self.buf.get(start..start + len)?;
        self.offset = start + len;
        Some((kind, value))
    }
}

fn dpid_from_vendor_tlv(value: &[u8]) -> Option<SwitchId> {
    if value.len() != VENDOR_TLV_LEN
        || value[..3] != OPENFLOW_OUI
        || value[3] != VENDOR_SUBTYPE_DPID
    {
        return None;
    }
    let mut dpid = [0u8; 8];
    dpid.copy_from_slice(&value[4..]);
    Some(u64::from_be_bytes(dpid))
}

/// Recover `(switch_id, port)` from one of our probes.
///
/// Returns `None` for non-LLDP frames, for LLDP frames from other speakers and
/// for truncated frames.
pub fn decode(frame: &[u8]) -> Option<(SwitchId, u16)> {
    let offset = lldp_payload_offset(frame)?;
    let tlvs = Tlvs {
        buf: frame,
        offset,
    };

    let mut port = None;
    let mut switch_id = None;

    for (kind, value) in tlvs {
        match kind {
            tlv_type::PORT_ID if value.len() >= 3 && port.is_none() => {
                let tail = &value[value.len() - 2..];
                port = Some(u16::from_be_bytes([tail[0], tail[1]]));
            }
            tlv_type::ORG_SPECIFIC if switch_id.is_none() => {
                switch_id = dpid_from_vendor_tlv(value);
            }
            _ => {}
        }
    }

    Some((switch_id?, port?))
}
