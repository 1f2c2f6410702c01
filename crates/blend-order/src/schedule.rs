//! Cancellable one-shot deadlines, polled by the host loop.

use std::time::{Duration, Instant};

/// A task due at some future instant, fired at most once per schedule.
///
/// Nothing runs in the background: the owner calls [`poll`](Self::poll)
/// with the current time and acts when it returns `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredTask {
    deadline: Option<Instant>,
}

impl DeferredTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the task `delay` after `now`, unless it is already pending.
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        if self.deadline.is_none() {
            self.deadline = Some(now + delay);
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Cancels any pending deadline and schedules a fresh one.
    pub fn reschedule(&mut self, now: Instant, delay: Duration) {
        self.cancel();
        self.schedule(now, delay);
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` once when the deadline has passed, clearing it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(2);

    #[test]
    fn fires_once_after_deadline() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new();
        task.schedule(t0, DELAY);
        assert!(!task.poll(t0 + Duration::from_millis(1999)));
        assert!(task.poll(t0 + DELAY));
        assert!(!task.poll(t0 + DELAY * 2), "task fired twice");
    }

    #[test]
    fn reschedule_pushes_deadline_back() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new();
        task.schedule(t0, DELAY);
        task.reschedule(t0 + Duration::from_secs(1), DELAY);
        assert!(!task.poll(t0 + DELAY));
        assert!(task.poll(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn schedule_keeps_existing_deadline() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new();
        task.schedule(t0, DELAY);
        task.schedule(t0 + Duration::from_secs(1), DELAY);
        assert_eq!(task.deadline(), Some(t0 + DELAY));
    }

    #[test]
    fn cancelled_task_never_fires() {
        let t0 = Instant::now();
        let mut task = DeferredTask::new();
        task.schedule(t0, DELAY);
        task.cancel();
        assert!(!task.is_pending());
        assert!(!task.poll(t0 + DELAY * 10));
    }
}
