//! Captured-packet view shared by the fingerprinter and the record writer.

use netmond_types::MacAddress;
use pnet::packet::ethernet::EthernetPacket;

/// The link-layer framing of a captured packet, as reported by the capture
/// facility for the interface it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    /// Standard Ethernet framing.
    Ethernet,
    /// Anything else (raw IP captures, tunnel interfaces, ...), carrying the
    /// capture facility's numeric link type for logging.
    Other(i32),
}

/// One packet as received from the capture facility.
///
/// `ts` is the capture timestamp in fractional seconds since the epoch; it is
/// written to the store verbatim, so all liveness fields for one packet carry
/// the same value.
#[derive(Debug, Clone)]
pub struct CapturedPacket {
    /// Raw captured bytes, never mutated.
    pub data: Vec<u8>,
    /// Capture timestamp, fractional seconds since the epoch.
    pub ts: f64,
    /// Name of the interface the packet was sniffed on.
    pub iface: String,
    /// Link-layer framing of `data`.
    pub link: LinkLayer,
}

impl CapturedPacket {
    /// Returns the Ethernet view of the packet, if it has one.
    ///
    /// `None` when the interface does not use Ethernet framing or the capture
    /// is too short to hold an Ethernet header.
    pub fn ethernet(&self) -> Option<EthernetPacket<'_>> {
        match self.link {
            LinkLayer::Ethernet => EthernetPacket::new(&self.data),
            LinkLayer::Other(_) => None,
        }
    }

    /// Returns the source MAC address, if a link-layer view is present.
    pub fn source_mac(&self) -> Option<MacAddress> {
        let ether = self.ethernet()?;
        let mac = ether.get_source();
        Some(MacAddress::new(mac.octets()))
    }

    /// Formats the capture timestamp for store fields.
    ///
    /// Uses the shortest round-trip decimal form, e.g. `1686086875.268219`.
    pub fn ts_bytes(&self) -> Vec<u8> {
        self.ts.to_string().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether_frame(src: [u8; 6]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xc8, 0xe1, 0x30, 0xba, 0xbe, 0x23]); // dst
        frame.extend_from_slice(&src);
        frame.extend_from_slice(&[0x08, 0x00]); // IPv4 ethertype
        frame.extend_from_slice(&[0u8; 20]);
        frame
    }

    #[test]
    fn test_source_mac_lowercased() {
        let packet = CapturedPacket {
            data: ether_frame([0x00, 0x0d, 0xf7, 0x12, 0xca, 0xfe]),
            ts: 1686086875.268219,
            iface: "wlx0023cafebabe".to_string(),
            link: LinkLayer::Ethernet,
        };
        assert_eq!(
            packet.source_mac().unwrap().to_string(),
            "00:0d:f7:12:ca:fe"
        );
    }

    #[test]
    fn test_no_ethernet_view_on_other_link() {
        let packet = CapturedPacket {
            data: ether_frame([0; 6]),
            ts: 0.0,
            iface: "tun0".to_string(),
            link: LinkLayer::Other(12),
        };
        assert!(packet.ethernet().is_none());
        assert!(packet.source_mac().is_none());
    }

    #[test]
    fn test_short_frame_has_no_ethernet_view() {
        let packet = CapturedPacket {
            data: vec![0u8; 8],
            ts: 0.0,
            iface: "eth0".to_string(),
            link: LinkLayer::Ethernet,
        };
        assert!(packet.ethernet().is_none());
    }

    #[test]
    fn test_ts_bytes_round_trip_format() {
        let packet = CapturedPacket {
            data: Vec::new(),
            ts: 1686086875.268219,
            iface: String::new(),
            link: LinkLayer::Other(0),
        };
        assert_eq!(packet.ts_bytes(), b"1686086875.268219".to_vec());
    }
}
