//! The monitor-extension seam.
//!
//! A [`PacketWorker`] is what turns the generic capture/record framework into
//! a specific monitor daemon: it names itself, narrows the capture with a
//! filter expression, and appends protocol-specific operations to the batch
//! for each packet whose generic records have already been staged.

use crate::error::Result;
use crate::packet::CapturedPacket;
use crate::store::Batch;
use netmond_types::MacAddress;

/// Per-packet state handed to a worker callback.
///
/// Only constructed for packets with a link-layer view, after the raw packet
/// record and the device sighting have been appended to `batch`.
pub struct PacketContext<'a> {
    /// The packet being processed.
    pub packet: &'a CapturedPacket,
    /// The packet's batch. Everything the worker appends lands in the same
    /// single submission as the generic records.
    pub batch: &'a mut Batch,
    /// The liveness fields already written to the packet and device records:
    /// `last_seen`, `last_seen_by`, `last_seen_by_<worker>`.
    pub common_fields: &'a [(String, Vec<u8>)],
    /// Source MAC address of the packet.
    pub mac: MacAddress,
    /// Store key of the source device's record.
    pub mac_key: &'a str,
    /// The packet's fingerprint hash.
    pub packet_hash: &'a str,
    /// Store key of the packet's raw record.
    pub packet_key: &'a str,
}

/// A protocol-specific monitor plugged into the capture/record framework.
pub trait PacketWorker: Send {
    /// Worker name, lowercase. Used for heartbeats, `last_seen_by` fields,
    /// and secret lookup.
    fn name(&self) -> &str;

    /// The capture filter (BPF syntax) selecting this worker's packets.
    fn wanted_packets(&self) -> &str;

    /// Called once per captured packet with a link-layer view.
    ///
    /// Appends protocol operations to `ctx.batch`. A returned string is
    /// logged by the supervisor. An error is logged and isolated to this
    /// packet; the batch staged so far is still submitted.
    fn process_packet(&mut self, ctx: &mut PacketContext<'_>) -> Result<Option<String>>;
}
