//! Handle to a launched session task.

use matchloop_protocol::SessionId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::RegistryError;

/// A running session's tick loop.
///
/// Dropping a `SessionTask` detaches it: the session keeps ticking until
/// its game ends or the registry shuts down.
#[derive(Debug)]
pub struct SessionTask {
    session_id: SessionId,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SessionTask {
    pub(crate) fn new(session_id: SessionId, cancel: CancellationToken, join: JoinHandle<()>) -> Self {
        Self {
            session_id,
            cancel,
            join,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Asks the session to stop at its next tick boundary. The current
    /// round is stopped, players are released and the game is destroyed,
    /// exactly as after a final game over.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the task to end.
    pub async fn join(self) -> Result<(), RegistryError> {
        let session_id = self.session_id;
        self.join.await.map_err(|e| {
            tracing::error!(%session_id, error = %e, "session task failed");
            RegistryError::TaskFailed {
                session: session_id,
                reason: e.to_string(),
            }
        })
    }

    /// [`cancel`](Self::cancel), then [`join`](Self::join).
    pub async fn stop(self) -> Result<(), RegistryError> {
        self.cancel();
        self.join().await
    }
}
