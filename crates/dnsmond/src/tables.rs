//! DNS-monitor key and field names in the shared record store.

/// Worker name: heartbeats, `last_seen_by` fields, secret lookup.
pub const WORKER_NAME: &str = "dnsmond";

/// Capture filter selecting DNS traffic.
pub const WANTED_PACKETS: &str = "udp port 53";

/// Set of every IPv4 address ever sighted.
pub const IPV4S_SET_KEY: &str = "ipv4s";

/// Prefix of per-address hash records: `ipv4_<addr>`.
pub const IPV4_KEY_PREFIX: &str = "ipv4_";

/// Set of every DNS question ever sighted, as question keys.
pub const DNS_QUERIES_SET_KEY: &str = "dns_queries";

/// Prefix of per-question hash records: `dnsq:<name>:<class>:<type>`.
pub const DNS_QUERY_KEY_PREFIX: &str = "dnsq:";

/// Prefix of per-question packet indexes: `dnsq_pkts:<name>:<class>:<type>`.
pub const DNS_QUERY_PACKETS_KEY_PREFIX: &str = "dnsq_pkts:";

pub const FIELD_IPV4: &str = "ipv4";
pub const FIELD_MAC: &str = "mac";
pub const FIELD_LAST_SEEN_IN: &str = "last_seen_in";
pub const FIELD_LAST_DNS_QUERY: &str = "last_dns_query";
pub const FIELD_LAST_DNS_QUERY_SEEN: &str = "last_dns_query_seen";

/// Key of the address record for an IPv4 source.
pub fn ipv4_key(addr: &str) -> String {
    format!("{}{}", IPV4_KEY_PREFIX, addr)
}

/// Key of the question record for a question key.
pub fn dns_query_key(question: &str) -> String {
    format!("{}{}", DNS_QUERY_KEY_PREFIX, question)
}

/// Key of the question-to-packet index for a question key.
pub fn dns_query_packets_key(question: &str) -> String {
    format!("{}{}", DNS_QUERY_PACKETS_KEY_PREFIX, question)
}

/// Field recording when a specific device last asked a question.
pub fn last_seen_from_field(mac: &str) -> String {
    format!("last_seen_from_{}", mac)
}

/// Field recording when a specific device first asked a question.
pub fn first_seen_from_field(mac: &str) -> String {
    format!("first_seen_from_{}", mac)
}
