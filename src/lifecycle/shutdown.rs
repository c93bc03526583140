//! External stop requests for a running orchestrator.

use tokio_util::sync::CancellationToken;

/// Handle used to request that a running orchestrator stop.
///
/// Clones share one root token. Every supervised task group is derived from
/// it, so triggering the handle cancels whatever group is currently running.
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Wrap a token owned by the embedding application (e.g. one with a deadline task attached).
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the shutdown signal has been triggered.
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    /// Token for a new scope that is cancelled with this handle but can also
    /// be cancelled on its own.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
