// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Probe codec properties.

use proptest::prelude::*;
use sdn_topology::codec;

proptest! {
    #[test]
    fn probe_roundtrips(switch_id in any::<u64>(), port in any::<u16>()) {
        let frame = codec::encode(switch_id, port);
        prop_assert_eq!(frame.len(), codec::PROBE_FRAME_LEN);
        prop_assert_eq!(codec::decode(&frame), Some((switch_id, port)));
    }

    #[test]
    fn probe_roundtrips_behind_vlan_tag(switch_id in any::<u64>(), port in any::<u16>(), vid in 0u16..4096) {
        let plain = codec::encode(switch_id, port);
        let mut tagged = plain[..12].to_vec();
        tagged.extend_from_slice(&codec::ETHERTYPE_VLAN.to_be_bytes());
        tagged.extend_from_slice(&vid.to_be_bytes());
        tagged.extend_from_slice(&plain[12..]);
        prop_assert_eq!(codec::decode(&tagged), Some((switch_id, port)));
    }

    #[test]
    fn arbitrary_bytes_never_panic(frame in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = codec::decode(&frame);
    }

    #[test]
    fn truncated_probe_is_rejected(switch_id in any::<u64>(), port in any::<u16>(), cut in 0usize..codec::PROBE_FRAME_LEN - 2) {
        let frame = codec::encode(switch_id, port);
        prop_assert_eq!(codec::decode(&frame[..cut]), None);
    }
}
