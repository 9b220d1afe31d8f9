//! DNS query monitor.
//!
//! For every IPv4 packet it records the source MAC-to-address pairing, and
//! for every DNS question it records the question itself: who asked it, when
//! it was first and last asked, how often, and which raw packets carried it.
//! Responses are deliberately ignored; on a local network the questions are
//! the interesting part, the answers are public data.

use crate::tables;
use netmond_core::error::{NetmondError, Result};
use netmond_core::packet::CapturedPacket;
use netmond_core::tables as core_tables;
use netmond_core::worker::{PacketContext, PacketWorker};
use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;

/// Compression-pointer hops allowed while decoding one name.
const MAX_NAME_JUMPS: usize = 16;

/// The DNS monitor worker.
#[derive(Debug, Default)]
pub struct DnsMonitorWorker;

impl DnsMonitorWorker {
    pub fn new() -> Self {
        Self
    }

    /// Records the source MAC-to-IPv4 pairing for any IPv4 packet.
    fn record_ipv4_sighting(&self, ctx: &mut PacketContext<'_>, src_ip: &str) {
        ctx.batch.hset(
            ctx.mac_key,
            vec![(
                tables::FIELD_IPV4.to_string(),
                src_ip.as_bytes().to_vec(),
            )],
        );

        let mut fields = ctx.common_fields.to_vec();
        fields.push((
            tables::FIELD_MAC.to_string(),
            ctx.mac.to_string().into_bytes(),
        ));
        ctx.batch.hset(tables::ipv4_key(src_ip), fields);
        ctx.batch.sadd(tables::IPV4S_SET_KEY, src_ip.as_bytes());
    }

    /// Records one sighted question and points the asking device at it.
    fn record_question(&self, ctx: &mut PacketContext<'_>, question: &Question) -> String {
        let ts = ctx.packet.ts_bytes();
        let mac = ctx.mac.to_string();
        let qkey = question.key();
        let dnsq_key = tables::dns_query_key(&qkey);

        ctx.batch.hset(
            &dnsq_key,
            vec![
                (core_tables::FIELD_LAST_SEEN.to_string(), ts.clone()),
                (
                    core_tables::FIELD_LAST_SEEN_FROM.to_string(),
                    mac.clone().into_bytes(),
                ),
                (tables::last_seen_from_field(&mac), ts.clone()),
                (
                    tables::FIELD_LAST_SEEN_IN.to_string(),
                    ctx.packet_hash.as_bytes().to_vec(),
                ),
            ],
        );
        ctx.batch
            .hset_nx(&dnsq_key, core_tables::FIELD_FIRST_SEEN, ts.clone());
        ctx.batch
            .hset_nx(&dnsq_key, tables::first_seen_from_field(&mac), ts.clone());
        ctx.batch
            .hincr_by(&dnsq_key, core_tables::FIELD_NUM_SIGHTINGS, 1);
        ctx.batch
            .sadd(tables::DNS_QUERIES_SET_KEY, qkey.as_bytes());
        ctx.batch.hset(
            tables::dns_query_packets_key(&qkey),
            vec![(ctx.packet_hash.to_string(), ts.clone())],
        );
        ctx.batch.hset(
            ctx.mac_key,
            vec![
                (
                    tables::FIELD_LAST_DNS_QUERY.to_string(),
                    qkey.clone().into_bytes(),
                ),
                (tables::FIELD_LAST_DNS_QUERY_SEEN.to_string(), ts),
            ],
        );

        qkey
    }
}

impl PacketWorker for DnsMonitorWorker {
    fn name(&self) -> &str {
        tables::WORKER_NAME
    }

    fn wanted_packets(&self) -> &str {
        tables::WANTED_PACKETS
    }

    fn process_packet(&mut self, ctx: &mut PacketContext<'_>) -> Result<Option<String>> {
        let packet = ctx.packet;
        let Some(ipv4) = ipv4_layer(packet) else {
            return Ok(None);
        };
        let src_ip = ipv4.get_source().to_string();
        self.record_ipv4_sighting(ctx, &src_ip);

        if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
            return Ok(None);
        }
        let Some(udp) = UdpPacket::new(ipv4.payload()) else {
            return Err(NetmondError::worker(
                tables::WORKER_NAME,
                "truncated UDP datagram",
            ));
        };

        let Some(question) = parse_query(udp.payload())
            .map_err(|reason| NetmondError::worker(tables::WORKER_NAME, reason))?
        else {
            return Ok(None);
        };

        let qkey = self.record_question(ctx, &question);
        Ok(Some(format!("DNS query from {}: {}", ctx.mac, qkey)))
    }
}

fn ipv4_layer(packet: &CapturedPacket) -> Option<Ipv4Packet<'_>> {
    let ether = packet.ethernet()?;
    if ether.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }
    // The payload slice outlives the header view.
    let offset = 14;
    Ipv4Packet::new(&packet.data[offset..])
}

/// One decoded question section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question name, absolute, with the trailing dot.
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    /// The store key of this question: `<name>:<class>:<type>`.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.name,
            class_name(self.qclass),
            type_name(self.qtype)
        )
    }
}

/// Decodes the first question of a DNS message.
///
/// `Ok(None)` for responses. Errors on messages too short to carry the
/// header or the question they announce.
fn parse_query(payload: &[u8]) -> std::result::Result<Option<Question>, String> {
    if payload.len() < 12 {
        return Err("truncated DNS header".to_string());
    }
    let flags = u16::from_be_bytes([payload[2], payload[3]]);
    if flags & 0x8000 != 0 {
        return Ok(None); // response
    }
    let qdcount = u16::from_be_bytes([payload[4], payload[5]]);
    if qdcount == 0 {
        return Err("DNS query without question".to_string());
    }

    let (name, offset) =
        parse_name(payload, 12).ok_or_else(|| "truncated DNS question name".to_string())?;
    let fixed = payload
        .get(offset..offset + 4)
        .ok_or_else(|| "truncated DNS question".to_string())?;
    let qtype = u16::from_be_bytes([fixed[0], fixed[1]]);
    let qclass = u16::from_be_bytes([fixed[2], fixed[3]]);

    Ok(Some(Question { name, qtype, qclass }))
}

/// Decodes a possibly-compressed DNS name starting at `offset`.
///
/// Returns the dotted name and the offset just past its encoding at the
/// original position.
fn parse_name(payload: &[u8], mut offset: usize) -> Option<(String, usize)> {
    let mut name = String::new();
    let mut end = None;
    let mut jumps = 0;

    loop {
        let len = *payload.get(offset)? as usize;
        if len == 0 {
            offset += 1;
            break;
        }
        if len & 0xc0 == 0xc0 {
            let low = *payload.get(offset + 1)? as usize;
            if end.is_none() {
                end = Some(offset + 2);
            }
            offset = ((len & 0x3f) << 8) | low;
            jumps += 1;
            if jumps > MAX_NAME_JUMPS {
                return None;
            }
            continue;
        }
        let label = payload.get(offset + 1..offset + 1 + len)?;
        name.push_str(&String::from_utf8_lossy(label));
        name.push('.');
        offset += 1 + len;
    }

    if name.is_empty() {
        name.push('.');
    }
    Some((name, end.unwrap_or(offset)))
}

fn class_name(qclass: u16) -> String {
    match qclass {
        1 => "IN".to_string(),
        3 => "CH".to_string(),
        4 => "HS".to_string(),
        other => other.to_string(),
    }
}

fn type_name(qtype: u16) -> String {
    match qtype {
        1 => "A".to_string(),
        2 => "NS".to_string(),
        5 => "CNAME".to_string(),
        6 => "SOA".to_string(),
        12 => "PTR".to_string(),
        15 => "MX".to_string(),
        16 => "TXT".to_string(),
        28 => "AAAA".to_string(),
        33 => "SRV".to_string(),
        65 => "HTTPS".to_string(),
        255 => "ANY".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query_message(name_wire: &[u8], qtype: u16, qclass: u16) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice(&12345u16.to_be_bytes()); // id
        message.extend_from_slice(&[0x01, 0x00]); // rd=1, query
        message.extend_from_slice(&1u16.to_be_bytes()); // qdcount
        message.extend_from_slice(&[0u8; 6]); // an/ns/ar counts
        message.extend_from_slice(name_wire);
        message.extend_from_slice(&qtype.to_be_bytes());
        message.extend_from_slice(&qclass.to_be_bytes());
        message
    }

    const NX_EXAMPLE_COM: &[u8] = b"\x02nx\x07example\x03com\x00";

    #[test]
    fn test_parse_basic_query() {
        let message = query_message(NX_EXAMPLE_COM, 1, 1);
        let question = parse_query(&message).unwrap().unwrap();
        assert_eq!(question.name, "nx.example.com.");
        assert_eq!(question.key(), "nx.example.com.:IN:A");
    }

    #[test]
    fn test_responses_are_ignored() {
        let mut message = query_message(NX_EXAMPLE_COM, 1, 1);
        message[2] |= 0x80; // qr=1
        assert_eq!(parse_query(&message).unwrap(), None);
    }

    #[test]
    fn test_truncated_header_is_an_error() {
        assert!(parse_query(&[0x30, 0x39, 0x01]).is_err());
    }

    #[test]
    fn test_truncated_question_is_an_error() {
        let mut message = query_message(NX_EXAMPLE_COM, 1, 1);
        message.truncate(message.len() - 3);
        assert!(parse_query(&message).is_err());
    }

    #[test]
    fn test_unusual_qtype_and_qclass_use_numbers() {
        let message = query_message(NX_EXAMPLE_COM, 64, 254);
        let question = parse_query(&message).unwrap().unwrap();
        assert_eq!(question.key(), "nx.example.com.:254:64");
    }

    #[test]
    fn test_root_name() {
        let message = query_message(b"\x00", 2, 1);
        let question = parse_query(&message).unwrap().unwrap();
        assert_eq!(question.key(), ".:IN:NS");
    }

    #[test]
    fn test_compressed_name() {
        // Question name is a pointer back to a name embedded at offset 12.
        let mut message = Vec::new();
        message.extend_from_slice(&12345u16.to_be_bytes());
        message.extend_from_slice(&[0x01, 0x00]);
        message.extend_from_slice(&1u16.to_be_bytes());
        message.extend_from_slice(&[0u8; 6]);

        let name_at = message.len(); // 12
        message.extend_from_slice(NX_EXAMPLE_COM);

        let (name, end) = parse_name(&message, name_at).unwrap();
        assert_eq!(name, "nx.example.com.");

        // Build "www" + pointer to "nx.example.com." at offset 12.
        let mut compressed = message[..end].to_vec();
        let question_at = compressed.len();
        compressed.push(3);
        compressed.extend_from_slice(b"www");
        compressed.extend_from_slice(&[0xc0, name_at as u8]);

        let (name, after) = parse_name(&compressed, question_at).unwrap();
        assert_eq!(name, "www.nx.example.com.");
        assert_eq!(after, compressed.len());
    }

    #[test]
    fn test_pointer_loop_is_rejected() {
        let mut message = vec![0u8; 12];
        message.extend_from_slice(&[0xc0, 12]); // points at itself
        assert!(parse_name(&message, 12).is_none());
    }
}
