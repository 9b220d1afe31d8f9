//! Deterministic packet fingerprinting.
//!
//! A fingerprint is a content-derived identity used to deduplicate packet
//! records across captures, workers, and restarts. IPv4 identification and
//! header checksum vary across otherwise-identical retransmissions,
//! fragmentation, and capture-path recomputation, so both are overwritten
//! with fixed sentinels in a private copy before hashing. The original
//! captured bytes are never touched.
//!
//! The digest is BLAKE2s-256 (lowercase hex). It is an identity key, not a
//! security boundary, but it must stay stable for multi-year dedup — the
//! algorithm is part of the shared-store contract between monitors.

use crate::packet::CapturedPacket;
use blake2::{Blake2s256, Digest};
use pnet::packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet::packet::ipv4::MutableIpv4Packet;
use pnet::packet::MutablePacket;

/// Sentinel written over the IPv4 identification field.
pub const IPV4_ID_SENTINEL: u16 = 0xdead;

/// Sentinel written over the IPv4 header checksum field.
pub const IPV4_CHECKSUM_SENTINEL: u16 = 0xbeef;

/// Recognized processing deviations, tracked for operator triage.
///
/// An anomaly is not an error: the packet is still fully recorded, and its
/// hash is additionally added to the anomaly's issue set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// The packet carried no link-layer (Ethernet) view.
    FirstLayer,
    /// The Ethernet payload was neither IPv4 nor ARP.
    EtherPayload,
}

impl Anomaly {
    /// Short category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Anomaly::FirstLayer => "first_layer",
            Anomaly::EtherPayload => "ether_payload",
        }
    }

    /// Store key of the issue set this anomaly's packet hashes are added to.
    pub fn issue_set(&self) -> &'static str {
        match self {
            Anomaly::FirstLayer => "unhandled:pkts:first_layer",
            Anomaly::EtherPayload => "unhandled:pkts:ether_payload",
        }
    }
}

/// A computed packet identity plus its optional anomaly classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Lowercase hex BLAKE2s-256 digest of the canonicalized bytes.
    pub hash: String,
    pub anomaly: Option<Anomaly>,
}

/// Computes the fingerprint for a captured packet.
///
/// Pure and deterministic: no store access, no mutation of the capture.
pub fn fingerprint(packet: &CapturedPacket) -> Fingerprint {
    let Some(ether) = packet.ethernet() else {
        return Fingerprint {
            hash: hex_digest(&packet.data),
            anomaly: Some(Anomaly::FirstLayer),
        };
    };

    match ether.get_ethertype() {
        EtherTypes::Ipv4 => match canonicalized(packet) {
            Some(bytes) => Fingerprint {
                hash: hex_digest(&bytes),
                anomaly: None,
            },
            // IPv4 ethertype but no parseable IPv4 header: hash verbatim.
            None => Fingerprint {
                hash: hex_digest(&packet.data),
                anomaly: Some(Anomaly::EtherPayload),
            },
        },
        // ARP carries no IPv4 header to canonicalize; hash verbatim.
        EtherTypes::Arp => Fingerprint {
            hash: hex_digest(&packet.data),
            anomaly: None,
        },
        _ => Fingerprint {
            hash: hex_digest(&packet.data),
            anomaly: Some(Anomaly::EtherPayload),
        },
    }
}

/// Re-serializes a private copy of an Ethernet/IPv4 packet with the
/// identification and checksum sentinels applied.
fn canonicalized(packet: &CapturedPacket) -> Option<Vec<u8>> {
    let mut copy = packet.data.clone();
    {
        let mut ether = MutableEthernetPacket::new(&mut copy)?;
        let mut ipv4 = MutableIpv4Packet::new(ether.payload_mut())?;
        ipv4.set_identification(IPV4_ID_SENTINEL);
        ipv4.set_checksum(IPV4_CHECKSUM_SENTINEL);
    }
    Some(copy)
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Blake2s256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkLayer;
    use pretty_assertions::assert_eq;

    fn ipv4_frame(id: u16, checksum: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xc8, 0xe1, 0x30, 0xba, 0xbe, 0x23]); // dst
        frame.extend_from_slice(&[0x00, 0x0d, 0xf7, 0x12, 0xca, 0xfe]); // src
        frame.extend_from_slice(&[0x08, 0x00]); // IPv4

        let total_len = (20 + payload.len()) as u16;
        frame.push(0x45); // version 4, IHL 5
        frame.push(0x00); // DSCP/ECN
        frame.extend_from_slice(&total_len.to_be_bytes());
        frame.extend_from_slice(&id.to_be_bytes());
        frame.extend_from_slice(&[0x40, 0x00]); // don't fragment
        frame.push(64); // TTL
        frame.push(17); // UDP
        frame.extend_from_slice(&checksum.to_be_bytes());
        frame.extend_from_slice(&[1, 2, 3, 4]); // src IP
        frame.extend_from_slice(&[5, 6, 7, 8]); // dst IP
        frame.extend_from_slice(payload);
        frame
    }

    fn captured(data: Vec<u8>, link: LinkLayer) -> CapturedPacket {
        CapturedPacket {
            data,
            ts: 1686086875.268219,
            iface: "wlx0023cafebabe".to_string(),
            link,
        }
    }

    #[test]
    fn test_deterministic() {
        let packet = captured(ipv4_frame(42, 0x1234, b"payload"), LinkLayer::Ethernet);
        let a = fingerprint(&packet);
        let b = fingerprint(&packet);
        assert_eq!(a, b);
        assert_eq!(a.hash.len(), 64); // 256-bit hex
    }

    #[test]
    fn test_ipv4_id_and_checksum_are_neutralized() {
        let a = captured(ipv4_frame(0x0001, 0x1111, b"same payload"), LinkLayer::Ethernet);
        let b = captured(ipv4_frame(0x9999, 0x2222, b"same payload"), LinkLayer::Ethernet);
        assert_eq!(fingerprint(&a).hash, fingerprint(&b).hash);
        assert_eq!(fingerprint(&a).anomaly, None);
    }

    #[test]
    fn test_different_payloads_differ() {
        let a = captured(ipv4_frame(1, 0, b"payload one"), LinkLayer::Ethernet);
        let b = captured(ipv4_frame(1, 0, b"payload two"), LinkLayer::Ethernet);
        assert_ne!(fingerprint(&a).hash, fingerprint(&b).hash);
    }

    #[test]
    fn test_canonicalization_does_not_mutate_original() {
        let data = ipv4_frame(0x4242, 0x4343, b"x");
        let packet = captured(data.clone(), LinkLayer::Ethernet);
        fingerprint(&packet);
        assert_eq!(packet.data, data);
    }

    #[test]
    fn test_no_link_layer_hashes_raw_with_first_layer_anomaly() {
        let data = vec![0x45, 0x00, 0x00, 0x14, 0xaa, 0xbb];
        let packet = captured(data.clone(), LinkLayer::Other(12));
        let fp = fingerprint(&packet);
        assert_eq!(fp.anomaly, Some(Anomaly::FirstLayer));
        assert_eq!(fp.hash, hex_digest(&data));
    }

    #[test]
    fn test_arp_hashes_raw_without_anomaly() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xff; 6]); // dst broadcast
        frame.extend_from_slice(&[0x00, 0x0d, 0xf7, 0x12, 0xca, 0xfe]);
        frame.extend_from_slice(&[0x08, 0x06]); // ARP
        frame.extend_from_slice(&[0u8; 28]);

        let packet = captured(frame.clone(), LinkLayer::Ethernet);
        let fp = fingerprint(&packet);
        assert_eq!(fp.anomaly, None);
        assert_eq!(fp.hash, hex_digest(&frame));
    }

    #[test]
    fn test_non_ip_non_arp_payload_raises_ether_payload() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xc8, 0xe1, 0x30, 0xba, 0xbe, 0x23]);
        frame.extend_from_slice(&[0x00, 0x0d, 0xf7, 0x12, 0xca, 0xfe]);
        frame.extend_from_slice(&[0x86, 0xdd]); // IPv6
        frame.extend_from_slice(&[0u8; 40]);

        let packet = captured(frame.clone(), LinkLayer::Ethernet);
        let fp = fingerprint(&packet);
        assert_eq!(fp.anomaly, Some(Anomaly::EtherPayload));
        assert_eq!(fp.hash, hex_digest(&frame));
    }

    #[test]
    fn test_truncated_ipv4_hashes_raw() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xc8, 0xe1, 0x30, 0xba, 0xbe, 0x23]);
        frame.extend_from_slice(&[0x00, 0x0d, 0xf7, 0x12, 0xca, 0xfe]);
        frame.extend_from_slice(&[0x08, 0x00]);
        frame.extend_from_slice(&[0x45, 0x00, 0x00]); // 3 bytes of header

        let packet = captured(frame.clone(), LinkLayer::Ethernet);
        let fp = fingerprint(&packet);
        assert_eq!(fp.anomaly, Some(Anomaly::EtherPayload));
        assert_eq!(fp.hash, hex_digest(&frame));
    }
}
