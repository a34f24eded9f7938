//! Session configuration.

use serde::{Deserialize, Serialize};

/// Bounds for a session's staging queues.
///
/// `None` means unbounded: producers are never refused, and a slow tick
/// loop simply accumulates a backlog. Set a capacity to turn that backlog
/// into [`SessionError::QueueFull`](crate::SessionError::QueueFull) at the
/// producer instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum staged player inputs.
    pub input_capacity: Option<usize>,

    /// Maximum staged events.
    pub event_capacity: Option<usize>,
}

impl SessionConfig {
    /// Both queues bounded to the given sizes.
    pub fn bounded(input_capacity: usize, event_capacity: usize) -> Self {
        Self {
            input_capacity: Some(input_capacity),
            event_capacity: Some(event_capacity),
        }
    }
}
