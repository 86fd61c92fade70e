//! Cooperative cancellation for orchestration runs.
//!
//! A [`CancellationSignal`] is cheap to clone; every clone observes the same
//! flag. The orchestrator checks it before each role step, and the bundled
//! HTTP client races its request against [`CancellationSignal::cancelled`].
//!
//! ```
//! use agency::cancellation::CancellationSignal;
//!
//! let signal = CancellationSignal::new();
//! let handle = signal.clone();
//! assert!(!signal.is_cancelled());
//!
//! handle.cancel();
//! assert!(signal.is_cancelled());
//! ```

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancellationSignal {
    state: Arc<watch::Sender<bool>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}
