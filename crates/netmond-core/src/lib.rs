//! Shared framework for the netmond packet-monitoring daemons.
//!
//! A monitor daemon is a [`worker::PacketWorker`] plugged into this crate's
//! pipeline: the capture facility ([`capture`]) feeds packets one at a time
//! to the record stage ([`record`]), which fingerprints each packet
//! ([`fingerprint`]), stages the generic raw-packet and device records, runs
//! the worker's protocol-specific callback, and submits everything as one
//! batch to the shared record store ([`store`]). The supervisor
//! ([`supervisor`]) owns the loop and the SIGHUP checkpoint/restart protocol.

pub mod capture;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod packet;
pub mod record;
pub mod secrets;
pub mod store;
pub mod supervisor;
pub mod tables;
pub mod worker;

pub use capture::{start_capture, PacketSource};
pub use config::{CaptureConfig, MonitorConfig, RedisConfig};
pub use error::{NetmondError, Result};
pub use fingerprint::{fingerprint, Anomaly, Fingerprint};
pub use logging::init_logging;
pub use packet::{CapturedPacket, LinkLayer};
pub use record::process_packet;
pub use secrets::load_secret;
pub use store::{Batch, MemoryStore, RecordStore, RedisStore, StoreOp};
pub use supervisor::{reexec, Checkpoint, Invocation, RestartSignal, RestartState, Supervisor};
pub use worker::{PacketContext, PacketWorker};
