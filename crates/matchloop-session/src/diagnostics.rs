//! Out-of-band error reporting for session tasks.
//!
//! Errors raised inside a session task (a failing `init`, a rejected join
//! event) have no caller to return to. They are handed to a
//! [`Diagnostics`] sink instead.

use std::error::Error;

/// Receives `(label, error)` pairs from running sessions.
///
/// Implementations must not panic: a sink that fails would take the
/// reporting session task down with it.
pub trait Diagnostics: Send + Sync + 'static {
    /// Report an error. `label` names the step that failed
    /// (`"init"`, `"start"`, `"player_join"`, ...).
    fn report(&self, label: &str, error: &dyn Error);
}

/// The default sink: one `tracing` error event per report.
///
/// Session tasks run inside a span carrying `session_id`, so the event is
/// attributed to the right session without repeating it here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, label: &str, error: &dyn Error) {
        tracing::error!(label, error = %error, "session error");
    }
}
