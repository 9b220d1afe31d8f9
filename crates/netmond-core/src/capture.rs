//! Live capture plumbing.
//!
//! Each capture interface gets its own blocking reader thread feeding a
//! single bounded channel; the consumer side processes packets strictly
//! sequentially. The channel applies backpressure rather than buffering
//! unboundedly when the store is slow.

use crate::config::CaptureConfig;
use crate::error::{NetmondError, Result};
use crate::packet::{CapturedPacket, LinkLayer};
use pcap::{Capture, Device, Linktype};
use std::thread;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Packets buffered between the reader threads and the processing loop.
const CHANNEL_DEPTH: usize = 1024;

/// Poll timeout for each capture handle, in milliseconds. Keeps the reader
/// threads responsive to shutdown without busy-waiting.
const POLL_TIMEOUT_MS: i32 = 1000;

/// Receiving end of the merged capture stream.
///
/// Dropping the source closes the channel, which stops the reader threads at
/// their next poll.
pub struct PacketSource {
    rx: mpsc::Receiver<CapturedPacket>,
}

impl PacketSource {
    /// Wraps an externally fed channel. The supervisor tests drive the
    /// processing loop through this without touching a real device.
    pub fn from_receiver(rx: mpsc::Receiver<CapturedPacket>) -> Self {
        Self { rx }
    }

    /// Next captured packet, or `None` when every reader thread has exited.
    pub async fn recv(&mut self) -> Option<CapturedPacket> {
        self.rx.recv().await
    }
}

/// Opens every configured interface and starts its reader thread.
///
/// An empty interface list means all non-loopback interfaces on the host.
pub fn start_capture(config: &CaptureConfig, filter: &str) -> Result<PacketSource> {
    let mut names = if config.interfaces.is_empty() {
        default_interfaces()?
    } else {
        config.interfaces.clone()
    };
    names.sort();

    if names.is_empty() {
        return Err(NetmondError::CaptureStopped(
            "no usable capture interfaces".to_string(),
        ));
    }
    info!(interfaces = %names.join(", "), "listening on");

    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    for name in names {
        let cap = open_device(&name, config, filter)?;
        let tx = tx.clone();
        thread::Builder::new()
            .name(format!("capture-{}", name))
            .spawn(move || run_capture(cap, name, tx))?;
    }

    Ok(PacketSource { rx })
}

fn default_interfaces() -> Result<Vec<String>> {
    let devices = Device::list()?;
    Ok(devices
        .into_iter()
        .filter(|dev| !dev.flags.is_loopback())
        .map(|dev| dev.name)
        .collect())
}

fn open_device(name: &str, config: &CaptureConfig, filter: &str) -> Result<Capture<pcap::Active>> {
    let mut cap = Capture::from_device(name)?
        .promisc(config.promiscuous)
        .snaplen(config.snaplen)
        .timeout(POLL_TIMEOUT_MS)
        .open()?;
    cap.filter(filter, true)?;
    Ok(cap)
}

fn run_capture(mut cap: Capture<pcap::Active>, iface: String, tx: mpsc::Sender<CapturedPacket>) {
    let datalink = cap.get_datalink();
    let link = if datalink == Linktype::ETHERNET {
        LinkLayer::Ethernet
    } else {
        warn!(iface = %iface, linktype = datalink.0, "interface does not use ethernet framing");
        LinkLayer::Other(datalink.0)
    };

    loop {
        match cap.next_packet() {
            Ok(captured) => {
                let packet = CapturedPacket {
                    data: captured.data.to_vec(),
                    ts: packet_timestamp(
                        captured.header.ts.tv_sec as i64,
                        captured.header.ts.tv_usec as i64,
                    ),
                    iface: iface.clone(),
                    link,
                };
                // Send fails only when the consumer is gone.
                if tx.blocking_send(packet).is_err() {
                    break;
                }
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => {
                error!(iface = %iface, error = %e, "capture read failed");
                break;
            }
        }
    }
}

/// Converts a capture-header timeval into fractional epoch seconds.
fn packet_timestamp(tv_sec: i64, tv_usec: i64) -> f64 {
    tv_sec as f64 + tv_usec as f64 / 1e6
}
