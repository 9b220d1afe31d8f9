//! Shared record-store key names, field names, and retention constants.
//!
//! These are the contract between every monitor writing to the store and the
//! reporting tools reading from it. Renaming anything here is a data
//! migration.

use netmond_types::MacAddress;

/// Prefix of per-packet hash records: `pkt_<hash>`.
pub const PACKET_KEY_PREFIX: &str = "pkt_";

/// Prefix of per-device hash records: `mac_<macaddr>`.
pub const DEVICE_KEY_PREFIX: &str = "mac_";

/// Prefix of per-device packet indexes: `macpkts_<macaddr>`.
pub const DEVICE_PACKETS_KEY_PREFIX: &str = "macpkts_";

/// Set of every MAC address ever sighted.
pub const MACS_SET_KEY: &str = "macs";

/// Hash of interface name to the timestamp it last yielded a packet.
pub const INTERFACES_KEY: &str = "interfaces";

/// Hash of worker name to the timestamp of its last processed packet.
pub const HEARTBEATS_KEY: &str = "heartbeats";

/// Prefix of anomaly issue sets: `unhandled:pkts:<category>`.
pub const ISSUE_SET_PREFIX: &str = "unhandled:pkts:";

/// Retention applied to raw packet records: 28 days.
///
/// Device records, indexes, and heartbeats are kept forever; only the
/// bulky raw captures age out.
pub const PACKET_TTL_SECS: i64 = 28 * 24 * 60 * 60;

pub const FIELD_LAST_SEEN: &str = "last_seen";
pub const FIELD_FIRST_SEEN: &str = "first_seen";
pub const FIELD_LAST_SEEN_BY: &str = "last_seen_by";
pub const FIELD_LAST_SEEN_FROM: &str = "last_seen_from";
pub const FIELD_LAST_SNIFFED_ON: &str = "last_sniffed_on";
pub const FIELD_RAW_BYTES: &str = "raw_bytes";
pub const FIELD_NUM_SIGHTINGS: &str = "num_sightings";

/// Key of the raw packet record for a fingerprint hash.
pub fn packet_key(hash: &str) -> String {
    format!("{}{}", PACKET_KEY_PREFIX, hash)
}

/// Key of the device record for a MAC address.
pub fn device_key(mac: &MacAddress) -> String {
    format!("{}{}", DEVICE_KEY_PREFIX, mac)
}

/// Key of the device-to-packet index for a MAC address.
pub fn device_packets_key(mac: &MacAddress) -> String {
    format!("{}{}", DEVICE_PACKETS_KEY_PREFIX, mac)
}

/// Field recording when a specific worker last saw something.
pub fn last_seen_by_field(worker_name: &str) -> String {
    format!("{}_{}", FIELD_LAST_SEEN_BY, worker_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_packet_ttl_is_28_days() {
        assert_eq!(PACKET_TTL_SECS, 2_419_200);
    }

    #[test]
    fn test_key_builders() {
        let mac: MacAddress = "00:0D:F7:12:CA:FE".parse().unwrap();
        assert_eq!(packet_key("abc123"), "pkt_abc123");
        assert_eq!(device_key(&mac), "mac_00:0d:f7:12:ca:fe");
        assert_eq!(device_packets_key(&mac), "macpkts_00:0d:f7:12:ca:fe");
        assert_eq!(last_seen_by_field("dnsmond"), "last_seen_by_dnsmond");
    }
}
