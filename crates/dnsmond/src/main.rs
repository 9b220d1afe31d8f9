//! DNS Query Monitoring Daemon
//!
//! Main entry point for the dnsmond daemon. Captures DNS traffic and records
//! device and question sightings to the shared record store. On SIGHUP the
//! daemon checkpoints and re-executes itself in place.

use clap::Parser;
use dnsmond::{tables, DnsMonitorWorker};
use netmond_core::error::NetmondError;
use netmond_core::{
    init_logging, load_secret, reexec, Invocation, MonitorConfig, RedisStore, Supervisor,
};
use std::path::PathBuf;
use tracing::info;

/// DNS query monitoring daemon
#[derive(Parser, Debug)]
#[command(name = "dnsmond")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the daemon configuration file
    #[arg(short, long, default_value = "/etc/netmond/dnsmond.conf")]
    config: PathBuf,

    /// Record store host override
    #[arg(long)]
    redis_host: Option<String>,

    /// Record store port override
    #[arg(long)]
    redis_port: Option<u16>,

    /// Capture interface; repeatable. Default is all non-loopback interfaces
    #[arg(short, long = "interface")]
    interfaces: Vec<String>,

    /// Capture filter override (BPF syntax)
    #[arg(long)]
    filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    // Captured before anything can touch the binary on disk; a restart
    // replays exactly this command line.
    let invocation = Invocation::capture();

    let args = Args::parse();
    let mut config = MonitorConfig::load_or_default(&args.config)?;
    if let Some(host) = args.redis_host {
        config.redis.host = host;
    }
    if let Some(port) = args.redis_port {
        config.redis.port = port;
    }
    if !args.interfaces.is_empty() {
        config.capture.interfaces = args.interfaces;
    }
    if args.filter.is_some() {
        config.capture.filter = args.filter;
    }
    config.validate()?;

    if config.redis.password.is_none() {
        match load_secret(tables::WORKER_NAME, "redis.password") {
            Ok(password) => config.redis.password = Some(password.trim().to_string()),
            // An unauthenticated store is a valid deployment.
            Err(NetmondError::SecretNotFound(_)) => {}
            Err(e) => return Err(Box::new(e) as Box<dyn std::error::Error>),
        }
    }

    info!("dnsmond: starting DNS query monitor");
    let store = RedisStore::connect(&config.redis).await?;
    let supervisor = Supervisor::new(store, DnsMonitorWorker::new(), config);

    // run() returning Ok means a restart was requested.
    supervisor.run().await?;
    reexec(&invocation)?;
    Ok(())
}
