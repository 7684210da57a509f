//! Signal handling for graceful shutdown
//!
//! A shutdown request is a `watch` value that only moves forward: `Running`,
//! then `Draining` on the first CTRL-C/SIGTERM (no new files are started),
//! then `Aborting` on the second (in-flight downloads are cancelled). Course
//! tasks read it between files, so a request made before a task starts is
//! still seen.

use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How far shutdown has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ShutdownStage {
    #[default]
    Running,
    /// Finish the file in flight, start nothing new
    Draining,
    /// Cancel everything now
    Aborting,
}

/// Sending half of a shutdown request
pub type ShutdownSender = watch::Sender<ShutdownStage>;

/// Receiving half of a shutdown request
pub type ShutdownReceiver = watch::Receiver<ShutdownStage>;

/// Signal handler for graceful shutdown coordination
pub struct SignalHandler {
    shutdown_tx: ShutdownSender,
}

impl SignalHandler {
    /// Create a new signal handler that advances the given shutdown flag
    pub fn new(shutdown_tx: ShutdownSender) -> Self {
        Self { shutdown_tx }
    }

    /// Setup signal handling for graceful shutdown (CTRL-C, SIGTERM)
    ///
    /// The first signal drains, the second aborts. Unix listeners are
    /// registered before this returns, so no signal delivered afterwards is
    /// lost. Returns a handle to the background task that monitors signals.
    pub fn setup(&self) -> JoinHandle<()> {
        let shutdown_tx = self.shutdown_tx.clone();
        let mut signals = Signals::install();

        tokio::spawn(async move {
            signals.next().await;
            info!("Received shutdown signal, finishing in-flight downloads (signal again to abort)");
            request_shutdown(&shutdown_tx);

            signals.next().await;
            warn!("Received second shutdown signal, aborting in-flight downloads");
            request_abort(&shutdown_tx);
        })
    }
}

/// CTRL-C and SIGTERM listeners, kept alive across repeated signals
struct Signals {
    #[cfg(unix)]
    interrupt: Option<signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<signal::unix::Signal>,
}

impl Signals {
    #[cfg(unix)]
    fn install() -> Self {
        use signal::unix::{signal, SignalKind};

        let listen = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Failed to install {} handler: {}", name, e);
                None
            }
        };

        Self {
            interrupt: listen(SignalKind::interrupt(), "Ctrl+C"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    /// Wait for the next CTRL-C or SIGTERM
    #[cfg(unix)]
    async fn next(&mut self) {
        async fn recv(stream: &mut Option<signal::unix::Signal>) {
            match stream {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        }

        tokio::select! {
            _ = recv(&mut self.interrupt) => {},
            _ = recv(&mut self.terminate) => {},
        }
    }

    #[cfg(not(unix))]
    async fn next(&mut self) {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Create a shutdown flag, initially `Running`
pub fn create_shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(ShutdownStage::Running)
}

/// Ask every holder of a receiver to stop starting new work
pub fn request_shutdown(shutdown_tx: &ShutdownSender) {
    advance(shutdown_tx, ShutdownStage::Draining);
}

/// Ask every holder of a receiver to cancel work in flight
pub fn request_abort(shutdown_tx: &ShutdownSender) {
    advance(shutdown_tx, ShutdownStage::Aborting);
}

/// Whether shutdown has been requested
pub fn shutdown_requested(shutdown_rx: &ShutdownReceiver) -> bool {
    *shutdown_rx.borrow() >= ShutdownStage::Draining
}

/// Whether in-flight work should be cancelled
pub fn abort_requested(shutdown_rx: &ShutdownReceiver) -> bool {
    *shutdown_rx.borrow() == ShutdownStage::Aborting
}

// send_if_modified succeeds even when no receiver is alive yet
fn advance(shutdown_tx: &ShutdownSender, stage: ShutdownStage) {
    shutdown_tx.send_if_modified(|current| {
        if *current < stage {
            *current = stage;
            true
        } else {
            false
        }
    });
}
