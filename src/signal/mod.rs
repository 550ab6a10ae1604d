//! Signal handling for graceful shutdown (SIGINT/SIGTERM)
//!
//! On the first SIGINT or SIGTERM the shared cancellation flag is set; the
//! process runner sees it on its next poll and terminates the launcher
//! (SIGTERM, then SIGKILL after the grace period).
//!
//! On a second signal the process exits immediately with
//! [`EXIT_CODE_CANCELLED`].

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tracing::warn;

/// Exit code for cancelled submissions (128 + SIGINT)
pub const EXIT_CODE_CANCELLED: i32 = 130;

/// Signal handler state
#[derive(Debug)]
pub struct SignalState {
    /// Shared with the process runner
    cancel_requested: Arc<AtomicBool>,
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new() -> Self {
        Self::with_flag(Arc::new(AtomicBool::new(false)))
    }

    /// Use an existing cancellation flag, e.g. [`SystemRunner::cancellation_flag`].
    ///
    /// [`SystemRunner::cancellation_flag`]: crate::process::SystemRunner::cancellation_flag
    pub fn with_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            cancel_requested: flag,
            signal_count: AtomicU8::new(0),
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// The flag set on the first signal.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_requested)
    }

    /// Record a signal and return what to do about it.
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);

        match count {
            0 => {
                self.cancel_requested.store(true, Ordering::SeqCst);
                SignalAction::InitiateCancellation
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

impl Default for SignalState {
    fn default() -> Self {
        Self::new()
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: terminate the launcher and report
    InitiateCancellation,
    /// Second signal: exit now
    ImmediateExit,
    Ignore,
}

/// Installs the process-wide SIGINT/SIGTERM handler.
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self {
            state: Arc::new(SignalState::with_flag(flag)),
        }
    }

    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Install the handler. Must be called at most once per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::InitiateCancellation => {
                warn!("received interrupt, terminating launcher (repeat to exit immediately)");
            }
            SignalAction::ImmediateExit => {
                warn!("received second interrupt, exiting");
                std::process::exit(EXIT_CODE_CANCELLED);
            }
            SignalAction::Ignore => {}
        })
    }
}
