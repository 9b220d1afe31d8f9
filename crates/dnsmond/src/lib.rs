//! DNS query monitoring daemon.
//!
//! `dnsmond` plugs a DNS-aware [`netmond_core::worker::PacketWorker`] into
//! the netmond capture/record framework: it watches `udp port 53`, and for
//! every question sighted it records who asked what, when, and how often in
//! the shared record store.

pub mod dns_mon;
pub mod tables;

pub use dns_mon::DnsMonitorWorker;
