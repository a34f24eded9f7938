//! The scalar state every session carries.

use matchloop_protocol::{SessionId, TemplateId};
use serde::{Deserialize, Serialize};

/// Identity and timing of a session.
///
/// `stage` and the three times are owned by the game: the framework never
/// interprets them and the setters do no validation. Only the session's own
/// task gets `&mut SessionMeta`, so no locking is involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    session_id: SessionId,
    template_id: TemplateId,
    stage: i32,
    start_time: i64,
    cur_time: i64,
    end_time: i64,
}

impl SessionMeta {
    /// A fresh, unregistered session of the given template.
    pub fn new(template_id: TemplateId) -> Self {
        Self {
            session_id: SessionId::UNASSIGNED,
            template_id,
            stage: 0,
            start_time: 0,
            cur_time: 0,
            end_time: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub(crate) fn assign_id(&mut self, session_id: SessionId) {
        self.session_id = session_id;
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    pub fn stage(&self) -> i32 {
        self.stage
    }

    pub fn set_stage(&mut self, stage: i32) {
        self.stage = stage;
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn set_start_time(&mut self, start_time: i64) {
        self.start_time = start_time;
    }

    pub fn cur_time(&self) -> i64 {
        self.cur_time
    }

    pub fn set_cur_time(&mut self, cur_time: i64) {
        self.cur_time = cur_time;
    }

    /// Adds `delta` to the current time and returns the new value.
    ///
    /// Saturates instead of overflowing.
    pub fn advance_cur_time(&mut self, delta: i64) -> i64 {
        self.cur_time = self.cur_time.saturating_add(delta);
        self.cur_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn set_end_time(&mut self, end_time: i64) {
        self.end_time = end_time;
    }
}
