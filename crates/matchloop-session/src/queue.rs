//! Staging queues: many producers, one draining session task.
//!
//! Thin wrappers over Tokio's mpsc channels. The sending side is shared by
//! every thread that submits work; the receiving side is owned by the
//! session and only ever polled without blocking.

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Which of a session's two queues an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Input,
    Event,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Event => write!(f, "event"),
        }
    }
}

/// Why a push was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushError {
    Full,
    Closed,
}

/// Producer side of a staging queue.
pub(crate) enum StageSender<T> {
    Unbounded(mpsc::UnboundedSender<T>),
    Bounded(mpsc::Sender<T>),
}

impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Unbounded(tx) => Self::Unbounded(tx.clone()),
            Self::Bounded(tx) => Self::Bounded(tx.clone()),
        }
    }
}

impl<T> StageSender<T> {
    /// Appends an item without blocking.
    pub(crate) fn push(&self, item: T) -> Result<(), PushError> {
        match self {
            Self::Unbounded(tx) => tx.send(item).map_err(|_| PushError::Closed),
            Self::Bounded(tx) => tx.try_send(item).map_err(|e| match e {
                TrySendError::Full(_) => PushError::Full,
                TrySendError::Closed(_) => PushError::Closed,
            }),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        match self {
            Self::Unbounded(tx) => tx.is_closed(),
            Self::Bounded(tx) => tx.is_closed(),
        }
    }
}

/// Consumer side of a staging queue.
pub(crate) enum StageReceiver<T> {
    Unbounded(mpsc::UnboundedReceiver<T>),
    Bounded(mpsc::Receiver<T>),
}

impl<T> StageReceiver<T> {
    /// Pops the oldest item, or `None` if the queue is empty right now.
    ///
    /// An item whose send is still in flight counts as "not there yet";
    /// it will be picked up by a later drain.
    pub(crate) fn try_pop(&mut self) -> Option<T> {
        match self {
            Self::Unbounded(rx) => rx.try_recv().ok(),
            Self::Bounded(rx) => rx.try_recv().ok(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Unbounded(rx) => rx.len(),
            Self::Bounded(rx) => rx.len(),
        }
    }
}

/// Creates a staging queue. `None` is unbounded; a zero capacity is
/// treated as one.
pub(crate) fn stage_queue<T>(capacity: Option<usize>) -> (StageSender<T>, StageReceiver<T>) {
    match capacity {
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (StageSender::Unbounded(tx), StageReceiver::Unbounded(rx))
        }
        Some(cap) => {
            let (tx, rx) = mpsc::channel(cap.max(1));
            (StageSender::Bounded(tx), StageReceiver::Bounded(rx))
        }
    }
}
