//! The monitor main loop and its checkpoint/restart protocol.
//!
//! A monitor runs until told to restart. The first SIGHUP marks a restart as
//! pending; the loop honors it at the next checkpoint, between packets, so
//! the in-flight packet's batch is never torn. A second SIGHUP while pending
//! forces the restart immediately, abandoning any in-flight work. Restarting
//! means re-executing the original command line in place, so a monitor picks
//! up new code and configuration without supervision from the outside.

use crate::capture::{start_capture, PacketSource};
use crate::config::MonitorConfig;
use crate::error::{NetmondError, Result};
use crate::record::process_packet;
use crate::store::RecordStore;
use crate::worker::PacketWorker;
use std::ffi::OsString;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

/// Where the loop stands in the restart protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartState {
    /// No restart requested.
    Running,
    /// Restart requested, honored at the next checkpoint.
    RestartPending,
    /// Restart forced, in-flight work is being abandoned.
    Restarting,
}

/// Outcome of the between-packets checkpoint check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    RestartRequested,
}

/// SIGHUP-driven restart request shared between the signal task and the loop.
pub struct RestartSignal {
    pending: AtomicBool,
    forcing: AtomicBool,
    forced: Notify,
}

impl RestartSignal {
    fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            forcing: AtomicBool::new(false),
            forced: Notify::new(),
        }
    }

    /// Installs the SIGHUP listener on the current runtime.
    pub fn install() -> Result<Arc<Self>> {
        let this = Arc::new(Self::new());
        let mut hangups = signal(SignalKind::hangup())?;
        let listener = Arc::clone(&this);
        tokio::spawn(async move {
            while hangups.recv().await.is_some() {
                listener.hangup();
            }
        });
        Ok(this)
    }

    /// Registers one received SIGHUP.
    pub fn hangup(&self) {
        if self.pending.swap(true, Ordering::SeqCst) {
            info!("received second SIGHUP, forcing restart now");
            self.forcing.store(true, Ordering::SeqCst);
            self.forced.notify_one();
        } else {
            info!("received SIGHUP, will restart at next checkpoint");
        }
    }

    pub fn state(&self) -> RestartState {
        if self.forcing.load(Ordering::SeqCst) {
            RestartState::Restarting
        } else if self.pending.load(Ordering::SeqCst) {
            RestartState::RestartPending
        } else {
            RestartState::Running
        }
    }

    /// The between-packets checkpoint check.
    pub fn checkpoint(&self) -> Checkpoint {
        if self.pending.load(Ordering::SeqCst) {
            Checkpoint::RestartRequested
        } else {
            Checkpoint::Continue
        }
    }

    /// Resolves when a forced restart is demanded.
    pub async fn forced(&self) {
        self.forced.notified().await;
    }
}

/// Drives one worker over the capture stream until a restart is requested.
pub struct Supervisor<S, W> {
    store: S,
    worker: W,
    config: MonitorConfig,
}

impl<S, W> Supervisor<S, W>
where
    S: RecordStore,
    W: PacketWorker,
{
    pub fn new(store: S, worker: W, config: MonitorConfig) -> Self {
        Self {
            store,
            worker,
            config,
        }
    }

    /// Runs the monitor. Returns `Ok(())` when a restart was requested; the
    /// caller is expected to re-exec. Any other return is a hard failure.
    pub async fn run(mut self) -> Result<()> {
        info!("Hi, I'm {}", self.worker.name());

        let filter = self
            .config
            .capture
            .filter
            .clone()
            .unwrap_or_else(|| self.worker.wanted_packets().to_string());
        info!(filter = %filter, "monitoring packets matching");

        // The listener goes in before any device is opened, so a hangup
        // during slow capture setup is queued instead of killing the process.
        let restart = RestartSignal::install()?;
        let mut source = start_capture(&self.config.capture, &filter)?;
        self.drive(&mut source, &restart).await
    }

    async fn drive(&mut self, source: &mut PacketSource, restart: &RestartSignal) -> Result<()> {
        loop {
            let packet = tokio::select! {
                biased;
                _ = restart.forced() => break,
                packet = source.recv() => match packet {
                    Some(packet) => packet,
                    None => {
                        return Err(NetmondError::CaptureStopped(
                            "capture stream ended".to_string(),
                        ))
                    }
                },
            };

            let result = tokio::select! {
                biased;
                _ = restart.forced() => break,
                result = process_packet(&mut self.store, &mut self.worker, &packet) => result,
            };

            match result {
                Ok(Some(message)) => info!(worker = self.worker.name(), "{}", message),
                Ok(None) => {}
                // Failures are isolated to their packet.
                Err(e) => error!(error = %e, "packet processing failed"),
            }

            // Checkpoint: between packets is the only safe restart point.
            if restart.checkpoint() == Checkpoint::RestartRequested {
                break;
            }
        }

        info!("going down for restart");
        Ok(())
    }
}

/// The process invocation vector, captured at startup and replayed verbatim
/// to restart.
///
/// Captured before anything else runs: by restart time the binary on disk
/// may have been replaced, and resolving the executable then (for example
/// through `/proc/self/exe`) would point at the deleted old image instead of
/// the path it was launched by.
#[derive(Debug, Clone)]
pub struct Invocation {
    argv: Vec<OsString>,
}

impl Invocation {
    /// Captures the current process's argv, including argv[0].
    pub fn capture() -> Self {
        Self {
            argv: std::env::args_os().collect(),
        }
    }

    pub fn new(argv: Vec<OsString>) -> Self {
        Self { argv }
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }
}

/// Replaces the current process with a fresh run of the captured command
/// line. Only returns on failure.
pub fn reexec(invocation: &Invocation) -> Result<()> {
    let Some((exe, args)) = invocation.argv().split_first() else {
        return Err(NetmondError::Config(
            "empty invocation vector".to_string(),
        ));
    };
    info!("restarting NOW...");
    std::io::stdout().flush()?;
    std::io::stderr().flush()?;

    let err = Command::new(exe).args(args).exec();
    Err(NetmondError::Io(err))
}
