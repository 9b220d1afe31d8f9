//! Per-packet record staging and submission.
//!
//! [`process_packet`] is the one entry point the capture loop calls for each
//! packet. It stages the generic records (raw packet, device sighting), hands
//! over to the worker for protocol records, then appends the guaranteed tail:
//! anomaly issue memberships, the raw-record TTL, and the worker heartbeat.
//! The tail and the single submission happen even when staging or the worker
//! callback fails, so a monitor that is discarding every packet still
//! heartbeats and still surfaces its problem categories.

use crate::fingerprint::{fingerprint, Fingerprint};
use crate::packet::CapturedPacket;
use crate::store::{Batch, RecordStore};
use crate::tables;
use crate::worker::{PacketContext, PacketWorker};
use crate::error::Result;

/// Processes one captured packet end to end.
///
/// Exactly one store submission per call. On success, yields the worker's
/// optional display message. Errors from staging and from submission are both
/// reported; when both fail, the submission error wins since it means the
/// guaranteed tail was lost too.
pub async fn process_packet<S, W>(
    store: &mut S,
    worker: &mut W,
    packet: &CapturedPacket,
) -> Result<Option<String>>
where
    S: RecordStore,
    W: PacketWorker + ?Sized,
{
    let fp = fingerprint(packet);
    let packet_key = tables::packet_key(&fp.hash);
    let mut batch = Batch::new();

    let staged = stage_records(&mut batch, worker, packet, &fp, &packet_key);

    if let Some(anomaly) = fp.anomaly {
        batch.sadd(anomaly.issue_set(), fp.hash.as_bytes());
    }
    batch.expire(&packet_key, tables::PACKET_TTL_SECS);
    batch.hset(
        tables::HEARTBEATS_KEY,
        vec![(worker.name().to_string(), packet.ts_bytes())],
    );

    store.submit(batch).await?;
    staged
}

/// Stages the generic records and runs the worker callback.
fn stage_records<W>(
    batch: &mut Batch,
    worker: &mut W,
    packet: &CapturedPacket,
    fp: &Fingerprint,
    packet_key: &str,
) -> Result<Option<String>>
where
    W: PacketWorker + ?Sized,
{
    let ts = packet.ts_bytes();
    let name = worker.name().to_string();

    let common_fields: Vec<(String, Vec<u8>)> = vec![
        (tables::FIELD_LAST_SEEN.to_string(), ts.clone()),
        (
            tables::FIELD_LAST_SEEN_BY.to_string(),
            name.clone().into_bytes(),
        ),
        (tables::last_seen_by_field(&name), ts.clone()),
    ];

    let mac = packet.source_mac();

    // Raw packet record.
    let mut fields = common_fields.clone();
    if let Some(mac) = &mac {
        fields.push((
            tables::FIELD_LAST_SEEN_FROM.to_string(),
            mac.to_string().into_bytes(),
        ));
    }
    fields.push((
        tables::FIELD_LAST_SNIFFED_ON.to_string(),
        packet.iface.clone().into_bytes(),
    ));
    fields.push((tables::FIELD_RAW_BYTES.to_string(), packet.data.clone()));

    batch.hset(packet_key, fields);
    batch.hset_nx(packet_key, tables::FIELD_FIRST_SEEN, ts.clone());
    batch.hincr_by(packet_key, tables::FIELD_NUM_SIGHTINGS, 1);
    batch.hset(
        tables::INTERFACES_KEY,
        vec![(packet.iface.clone(), ts.clone())],
    );

    // Without a link layer there is no device to attribute the packet to and
    // nothing for the worker to parse.
    let Some(mac) = mac else {
        return Ok(None);
    };

    // Device sighting.
    let mac_key = tables::device_key(&mac);
    batch.sadd(tables::MACS_SET_KEY, mac.to_string().into_bytes());
    batch.hset(&mac_key, common_fields.clone());
    batch.hset_nx(&mac_key, tables::FIELD_FIRST_SEEN, ts.clone());
    batch.hset(
        tables::device_packets_key(&mac),
        vec![(fp.hash.clone(), ts)],
    );

    let mut ctx = PacketContext {
        packet,
        batch,
        common_fields: &common_fields,
        mac,
        mac_key: &mac_key,
        packet_hash: &fp.hash,
        packet_key,
    };
    worker.process_packet(&mut ctx)
}
