use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::api::ProfileApi;

pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveState {
    Idle,
    /// Edited at `since`; saved once the quiet period has passed.
    Dirty { since: Instant },
    Saving,
    /// Last attempt failed. The next edit schedules another.
    Error,
}

/// Trailing-edge debounced background save. Time is passed in so callers
/// (and tests) own the clock.
#[derive(Debug, Clone)]
pub struct Autosaver {
    state: AutosaveState,
    delay: Duration,
    pending: Option<Value>,
}

impl Default for Autosaver {
    fn default() -> Self {
        Self::new(AUTOSAVE_DELAY)
    }
}

impl Autosaver {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: AutosaveState::Idle,
            delay,
            pending: None,
        }
    }

    pub fn state(&self) -> AutosaveState {
        self.state
    }

    /// Records an edit. Each edit restarts the quiet period and replaces
    /// the payload, so only the latest snapshot is sent.
    pub fn mark_dirty(&mut self, payload: Value, now: Instant) {
        self.pending = Some(payload);
        self.state = AutosaveState::Dirty { since: now };
    }

    /// When the pending save fires, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            AutosaveState::Dirty { since } => Some(since + self.delay),
            _ => None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Takes the payload to send if the quiet period is over.
    pub fn begin_save(&mut self, now: Instant) -> Option<Value> {
        if !self.is_due(now) {
            return None;
        }
        let payload = self.pending.take()?;
        self.state = AutosaveState::Saving;
        Some(payload)
    }

    pub fn finish_save<E: std::fmt::Display>(&mut self, result: Result<Value, E>) {
        // An edit made while saving already moved the state back to Dirty
        if self.state != AutosaveState::Saving {
            return;
        }
        match result {
            Ok(_) => {
                debug!("Profile draft autosaved");
                self.state = AutosaveState::Idle;
            }
            Err(e) => {
                warn!("Auto-save failed, will retry on next change: {}", e);
                self.state = AutosaveState::Error;
            }
        }
    }

    /// Sends the pending draft when due. Returns whether a request was made.
    pub fn poll<A: ProfileApi>(&mut self, api: &A, now: Instant) -> bool {
        match self.begin_save(now) {
            Some(payload) => {
                let result = api.update_professional_profile(&payload);
                self.finish_save(result);
                true
            }
            None => false,
        }
    }

    /// Drops any scheduled save, e.g. before an explicit submit.
    pub fn cancel(&mut self) {
        self.pending = None;
        if matches!(self.state, AutosaveState::Dirty { .. }) {
            self.state = AutosaveState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::profile::ProfileUploads;
    use crate::error::ApiError;
    use crate::models::ProfessionalProfile;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakeProfile {
        fail: Cell<bool>,
        saved: RefCell<Vec<Value>>,
    }

    impl ProfileApi for FakeProfile {
        fn professional_profile(&self) -> Result<ProfessionalProfile, ApiError> {
            Ok(ProfessionalProfile::default())
        }

        fn update_professional_profile(&self, payload: &Value) -> Result<Value, ApiError> {
            self.saved.borrow_mut().push(payload.clone());
            if self.fail.get() {
                return Err(ApiError::Status { status: 500, body: String::new() });
            }
            Ok(payload.clone())
        }

        fn submit_professional_profile(
            &self,
            _profile: &ProfessionalProfile,
            _uploads: &ProfileUploads,
        ) -> Result<Value, ApiError> {
            unreachable!()
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_waits_for_quiet_period() {
        let api = FakeProfile::default();
        let start = Instant::now();
        let mut saver = Autosaver::default();

        saver.mark_dirty(json!({"full_name": "A"}), start);
        assert!(!saver.poll(&api, start + ms(1999)));
        assert!(saver.poll(&api, start + ms(2000)));
        assert_eq!(saver.state(), AutosaveState::Idle);
        assert_eq!(api.saved.borrow().len(), 1);
    }

    #[test]
    fn test_edits_restart_timer_and_only_last_is_sent() {
        let api = FakeProfile::default();
        let start = Instant::now();
        let mut saver = Autosaver::default();

        saver.mark_dirty(json!({"full_name": "A"}), start);
        saver.mark_dirty(json!({"full_name": "Am"}), start + ms(1500));
        assert!(!saver.poll(&api, start + ms(2500)));
        assert!(saver.poll(&api, start + ms(3500)));
        assert!(!saver.poll(&api, start + ms(9000)));

        assert_eq!(api.saved.borrow().as_slice(), [json!({"full_name": "Am"})]);
    }

    #[test]
    fn test_failure_is_silent_and_next_edit_retries() {
        let api = FakeProfile::default();
        api.fail.set(true);
        let start = Instant::now();
        let mut saver = Autosaver::default();

        saver.mark_dirty(json!({"full_name": "A"}), start);
        assert!(saver.poll(&api, start + ms(2000)));
        assert_eq!(saver.state(), AutosaveState::Error);
        assert!(!saver.poll(&api, start + ms(10_000)));

        api.fail.set(false);
        saver.mark_dirty(json!({"full_name": "Ab"}), start + ms(11_000));
        assert!(saver.poll(&api, start + ms(13_000)));
        assert_eq!(saver.state(), AutosaveState::Idle);
    }

    #[test]
    fn test_edit_during_save_keeps_dirty() {
        let start = Instant::now();
        let mut saver = Autosaver::default();
        saver.mark_dirty(json!({"full_name": "A"}), start);
        let payload = saver.begin_save(start + ms(2000));
        assert!(payload.is_some());
        assert_eq!(saver.state(), AutosaveState::Saving);

        saver.mark_dirty(json!({"full_name": "B"}), start + ms(2100));
        saver.finish_save::<ApiError>(Ok(json!({})));
        assert_eq!(saver.deadline(), Some(start + ms(4100)));
    }

    #[test]
    fn test_cancel_drops_pending_save() {
        let api = FakeProfile::default();
        let start = Instant::now();
        let mut saver = Autosaver::default();
        saver.mark_dirty(json!({}), start);
        saver.cancel();
        assert!(!saver.poll(&api, start + ms(5000)));
        assert_eq!(saver.state(), AutosaveState::Idle);
    }
}
