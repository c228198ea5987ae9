//! Cancellable one-shot timers.
//!
//! Components never sleep themselves. They ask a [`Scheduler`] for a timer
//! and later receive a [`TimerFired`] through the event loop, which they
//! match against the id they are still waiting for. A timer that fires after
//! being cancelled is therefore ignored by its owner.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Which component a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    Reconnect,
    SimulationStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub id: TimerId,
    pub purpose: TimerPurpose,
}

pub trait Scheduler: Send {
    fn schedule(&mut self, delay: Duration, purpose: TimerPurpose) -> TimerId;

    /// Returns false when the timer already fired or was never scheduled.
    fn cancel(&mut self, id: TimerId) -> bool;
}

/// Production scheduler: each timer is a tokio task delivering into a channel.
pub struct TokioScheduler {
    fired_tx: mpsc::UnboundedSender<TimerFired>,
    timers: HashMap<TimerId, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new(fired_tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            fired_tx,
            timers: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, purpose: TimerPurpose) -> TimerId {
        self.timers.retain(|_, handle| !handle.is_finished());

        let id = TimerId(self.next_id);
        self.next_id += 1;
        let tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TimerFired { id, purpose });
        });
        self.timers.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }
}

/// Virtual-clock scheduler for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerId, (Duration, TimerPurpose)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_of(&self, purpose: TimerPurpose) -> usize {
        self.pending.values().filter(|(_, p)| *p == purpose).count()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Move the clock forward and return every timer that came due, ordered
    /// by deadline then creation.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerFired> {
        self.now += by;
        let mut due: Vec<(Duration, TimerId, TimerPurpose)> = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= self.now)
            .map(|(id, (deadline, purpose))| (*deadline, *id, *purpose))
            .collect();
        due.sort_by_key(|(deadline, id, _)| (*deadline, *id));
        for (_, id, _) in &due {
            self.pending.remove(id);
        }
        due.into_iter()
            .map(|(_, id, purpose)| TimerFired { id, purpose })
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, purpose: TimerPurpose) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, (self.now + delay, purpose));
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.pending.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_timers_fire_in_deadline_order() {
        let mut s = ManualScheduler::new();
        let late = s.schedule(Duration::from_secs(5), TimerPurpose::Reconnect);
        let early = s.schedule(Duration::from_secs(1), TimerPurpose::SimulationStep);

        assert!(s.advance(Duration::from_millis(500)).is_empty());
        let fired = s.advance(Duration::from_secs(10));
        let ids: Vec<TimerId> = fired.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![early, late]);
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn test_manual_cancel() {
        let mut s = ManualScheduler::new();
        let id = s.schedule(Duration::from_secs(1), TimerPurpose::Reconnect);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.advance(Duration::from_secs(2)).is_empty());
    }

    #[tokio::test]
    async fn test_tokio_timer_delivers_and_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = TokioScheduler::new(tx);
        let cancelled = s.schedule(Duration::from_millis(20), TimerPurpose::Reconnect);
        let kept = s.schedule(Duration::from_millis(40), TimerPurpose::SimulationStep);
        assert!(s.cancel(cancelled));

        let fired = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timer should fire")
            .expect("channel open");
        assert_eq!(fired.id, kept);
        assert_eq!(fired.purpose, TimerPurpose::SimulationStep);
    }
}
