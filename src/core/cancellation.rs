use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Stopped,
    TimedOut,
}

const REASON_NONE: u8 = 0;
const REASON_STOPPED: u8 = 1;
const REASON_TIMED_OUT: u8 = 2;

/// Cooperative cancellation handle shared by every suspension point of a run.
///
/// Cloning shares the same token. [`child`](Self::child) creates a handle
/// that is cancelled with its parent but can also be cancelled on its own,
/// which is how a failed parallel join stops its sibling branches.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    token: CancellationToken,
    reason: Arc<AtomicU8>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(AtomicU8::new(REASON_NONE)),
        }
    }

    /// Cancels the run as a user stop.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Stopped);
    }

    pub fn cancel_with(&self, reason: CancelReason) {
        let code = match reason {
            CancelReason::Stopped => REASON_STOPPED,
            CancelReason::TimedOut => REASON_TIMED_OUT,
        };
        // First reason wins.
        let _ = self
            .reason
            .compare_exchange(REASON_NONE, code, Ordering::AcqRel, Ordering::Acquire);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        match self.reason.load(Ordering::Acquire) {
            REASON_STOPPED => Some(CancelReason::Stopped),
            REASON_TIMED_OUT => Some(CancelReason::TimedOut),
            _ if self.token.is_cancelled() => Some(CancelReason::Stopped),
            _ => None,
        }
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A handle cancelled together with this one. Its own reason is
    /// independent of the parent's.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            reason: Arc::new(AtomicU8::new(REASON_NONE)),
        }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}
