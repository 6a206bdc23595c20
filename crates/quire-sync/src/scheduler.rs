//! Debounced save scheduling.
//!
//! One slot per saved field. Each slot owns the deadline, the payload and
//! the change version captured when the save was scheduled. Scheduling a
//! field replaces its slot in one step, so a superseded payload can never
//! fire. The scheduler holds no timers itself: the session sleeps until
//! [`SaveScheduler::next_deadline`] and then takes the due saves.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::config::SyncConfig;
use crate::store::NotePatch;

/// A debounced field of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveField {
    Content,
    Title,
}

impl SaveField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Title => "title",
        }
    }
}

impl std::fmt::Display for SaveField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A save waiting for its quiet period to elapse.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub field: SaveField,
    pub patch: NotePatch,
    /// Change version captured at schedule time.
    pub version: u64,
    pub deadline: Instant,
}

#[derive(Debug)]
pub struct SaveScheduler {
    content_delay: Duration,
    title_delay: Duration,
    content: Option<PendingSave>,
    title: Option<PendingSave>,
}

impl SaveScheduler {
    pub fn new(content_delay: Duration, title_delay: Duration) -> Self {
        Self {
            content_delay,
            title_delay,
            content: None,
            title: None,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.content_debounce(), config.title_debounce())
    }

    fn delay(&self, field: SaveField) -> Duration {
        match field {
            SaveField::Content => self.content_delay,
            SaveField::Title => self.title_delay,
        }
    }

    fn slot_mut(&mut self, field: SaveField) -> &mut Option<PendingSave> {
        match field {
            SaveField::Content => &mut self.content,
            SaveField::Title => &mut self.title,
        }
    }

    /// Replace the pending save for `field`. Returns the superseded save.
    pub fn schedule(
        &mut self,
        field: SaveField,
        patch: NotePatch,
        version: u64,
        now: Instant,
    ) -> Option<PendingSave> {
        let deadline = now + self.delay(field);
        let replaced = self.slot_mut(field).replace(PendingSave {
            field,
            patch,
            version,
            deadline,
        });
        trace!(
            subsystem = "sync",
            component = "scheduler",
            field = field.as_str(),
            save_version = version,
            superseded = replaced.is_some(),
            "Save scheduled"
        );
        replaced
    }

    pub fn cancel(&mut self, field: SaveField) -> Option<PendingSave> {
        self.slot_mut(field).take()
    }

    /// Drop every pending save. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let content = self.content.take();
        let title = self.title.take();
        usize::from(content.is_some()) + usize::from(title.is_some())
    }

    pub fn pending(&self, field: SaveField) -> Option<&PendingSave> {
        match field {
            SaveField::Content => self.content.as_ref(),
            SaveField::Title => self.title.as_ref(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.content.is_none() && self.title.is_none()
    }

    /// Earliest deadline among pending saves.
    pub fn next_deadline(&self) -> Option<Instant> {
        [&self.content, &self.title]
            .into_iter()
            .flatten()
            .map(|p| p.deadline)
            .min()
    }

    /// Remove and return saves whose deadline has passed, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<PendingSave> {
        let mut due: Vec<PendingSave> = [&mut self.content, &mut self.title]
            .into_iter()
            .filter(|slot| matches!(slot, Some(p) if p.deadline <= now))
            .filter_map(Option::take)
            .collect();
        due.sort_by_key(|p| p.deadline);
        due
    }

    /// Remove and return every pending save regardless of deadline.
    pub fn take_all(&mut self) -> Vec<PendingSave> {
        let mut all: Vec<PendingSave> = [self.content.take(), self.title.take()]
            .into_iter()
            .flatten()
            .collect();
        all.sort_by_key(|p| p.deadline);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> SaveScheduler {
        SaveScheduler::new(Duration::from_millis(800), Duration::from_millis(600))
    }

    #[test]
    fn test_reschedule_replaces_payload_and_deadline() {
        let mut s = scheduler();
        let t0 = Instant::now();
        assert!(s
            .schedule(SaveField::Content, NotePatch::title("a"), 1, t0)
            .is_none());

        let t1 = t0 + Duration::from_millis(500);
        let replaced = s
            .schedule(SaveField::Content, NotePatch::title("b"), 2, t1)
            .unwrap();
        assert_eq!(replaced.version, 1);

        assert!(s.take_due(t0 + Duration::from_millis(800)).is_empty());
        let due = s.take_due(t1 + Duration::from_millis(800));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].version, 2);
        assert_eq!(due[0].patch, NotePatch::title("b"));
        assert!(s.is_idle());
    }

    #[test]
    fn test_fields_are_independent() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.schedule(SaveField::Content, NotePatch::default(), 1, t0);
        s.schedule(SaveField::Title, NotePatch::title("t"), 2, t0);

        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(600)));
        let due = s.take_due(t0 + Duration::from_millis(600));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].field, SaveField::Title);
        assert!(s.pending(SaveField::Content).is_some());
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(800)));
    }

    #[test]
    fn test_cancel_all_and_take_all() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.schedule(SaveField::Content, NotePatch::default(), 1, t0);
        s.schedule(SaveField::Title, NotePatch::title("t"), 2, t0);

        let all = s.take_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].field, SaveField::Title);

        s.schedule(SaveField::Title, NotePatch::title("t"), 3, t0);
        assert_eq!(s.cancel_all(), 1);
        assert_eq!(s.next_deadline(), None);
    }
}
