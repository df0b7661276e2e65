//! Deferred note actions keyed to the wall clock.

use crate::audio::NoteEvent;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeferredAction {
    /// A melody note that still has to pass the spacing gate, scaled by
    /// `spacing_factor`, when it fires.
    PlayNote { velocity: f32, spacing_factor: f64 },
    /// A fully specified note handed to the audio clock as soon as it falls
    /// inside the look-ahead window.
    Trigger(NoteEvent),
}

#[derive(Clone, Copy, Debug)]
pub struct Due {
    pub fire_at_ms: f64,
    pub action: DeferredAction,
}

#[derive(Debug)]
struct Entry {
    fire_at_ms: f64,
    seq: u64,
    session: u64,
    action: DeferredAction,
}

// Reversed so the max-heap pops the earliest entry; `seq` keeps ties FIFO.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at_ms
            .total_cmp(&self.fire_at_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// Min-ordered queue of actions tagged with the session that scheduled them.
/// Switching sessions forgets everything queued so far, and draining skips
/// any entry whose session is not current.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
    session: u64,
}

impl DeferredQueue {
    pub fn new(session: u64) -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
            session,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Switch sessions and forget everything queued so far.
    pub fn set_session(&mut self, session: u64) {
        self.session = session;
        self.heap.clear();
    }

    pub fn push(&mut self, fire_at_ms: f64, action: DeferredAction) {
        self.seq += 1;
        self.heap.push(Entry {
            fire_at_ms,
            seq: self.seq,
            session: self.session,
            action,
        });
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove and return, in fire order, every gated note due at `now_ms` and
    /// every trigger due before `now_ms + lookahead_ms`.
    pub fn drain_due(&mut self, now_ms: f64, lookahead_ms: f64) -> SmallVec<[Due; 8]> {
        let horizon = now_ms + lookahead_ms;
        let mut due = SmallVec::new();
        let mut early: SmallVec<[Entry; 4]> = SmallVec::new();
        while self.heap.peek().is_some_and(|e| e.fire_at_ms <= horizon) {
            let Some(entry) = self.heap.pop() else { break };
            if entry.session != self.session {
                continue;
            }
            match entry.action {
                DeferredAction::PlayNote { .. } if entry.fire_at_ms > now_ms => early.push(entry),
                action => due.push(Due {
                    fire_at_ms: entry.fire_at_ms,
                    action,
                }),
            }
        }
        self.heap.extend(early);
        due
    }
}
