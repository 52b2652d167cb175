//! The pending batch of the batched delivery path, as an explicit state machine.
//!
//! ```text
//!            enqueue (len < max)                 enqueue (len < max)
//!   Idle ───────────────────────▶ Pending ◀───────────────────────┐
//!    ▲                              │  └──────────────────────────┘
//!    │   timer fires / len == max   │
//!    └──────────────────────────────┘   (events handed out for delivery)
//! ```
//!
//! The machine never touches the network or the runtime. It tells its owner
//! when to arm a timer and hands back the events to send.

use crate::scheduler::TimerHandle;
use events::{AnalyticsEvent, MAX_BATCH_EVENTS};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
enum BatchState {
    Idle,
    Pending {
        events: Vec<AnalyticsEvent>,
        /// When the armed timer is due; fixed by the first event of the batch.
        deadline: Instant,
        /// Distinguishes this batch's timer from timers of earlier batches.
        generation: u64,
        timer: Option<TimerHandle>,
    },
}

/// What the owner has to do after an enqueue.
#[derive(Debug)]
pub(crate) enum Enqueued {
    /// The event opened a new batch: arm a timer for `generation` after `delay`.
    Arm { generation: u64, delay: Duration },
    /// The event joined the pending batch; its timer is already armed.
    Queued,
    /// The batch reached its size limit and must be delivered now.
    Flush(Vec<AnalyticsEvent>),
}

#[derive(Debug)]
pub(crate) struct BatchQueue {
    state: BatchState,
    max_size: usize,
    delay: Duration,
    next_generation: u64,
}

impl BatchQueue {
    /// `max_size` is clamped to `1..=MAX_BATCH_EVENTS`, the range the batch
    /// endpoint accepts.
    pub(crate) fn new(max_size: usize, delay: Duration) -> Self {
        Self {
            state: BatchState::Idle,
            max_size: max_size.clamp(1, MAX_BATCH_EVENTS),
            delay,
            next_generation: 0,
        }
    }

    pub(crate) fn enqueue(&mut self, event: AnalyticsEvent, now: Instant) -> Enqueued {
        if let BatchState::Pending { events, .. } = &mut self.state {
            events.push(event);
            let full = events.len() >= self.max_size;
            return if full {
                Enqueued::Flush(self.take().unwrap_or_default())
            } else {
                Enqueued::Queued
            };
        }

        if self.max_size == 1 {
            return Enqueued::Flush(vec![event]);
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.state = BatchState::Pending {
            events: vec![event],
            deadline: now + self.delay,
            generation,
            timer: None,
        };
        Enqueued::Arm {
            generation,
            delay: self.delay,
        }
    }

    /// Stores the timer armed for `generation`.
    ///
    /// If that batch is already gone (flushed by size, or the timer fired before
    /// this call) the handle is cancelled instead.
    pub(crate) fn attach_timer(&mut self, generation: u64, handle: TimerHandle) {
        match &mut self.state {
            BatchState::Pending {
                generation: current,
                timer,
                ..
            } if *current == generation && timer.is_none() => *timer = Some(handle),
            _ => handle.cancel(),
        }
    }

    /// Called when the timer of `generation` fires. Stale timers are ignored.
    pub(crate) fn fire(&mut self, generation: u64) -> Option<Vec<AnalyticsEvent>> {
        match &self.state {
            BatchState::Pending { generation: current, .. } if *current == generation => self.take(),
            _ => None,
        }
    }

    /// Empties the pending batch, cancelling its timer. `None` when idle.
    pub(crate) fn take(&mut self) -> Option<Vec<AnalyticsEvent>> {
        match std::mem::replace(&mut self.state, BatchState::Idle) {
            BatchState::Idle => None,
            BatchState::Pending { events, timer, .. } => {
                if let Some(timer) = timer {
                    timer.cancel();
                }
                Some(events)
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.state {
            BatchState::Idle => 0,
            BatchState::Pending { events, .. } => events.len(),
        }
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        match &self.state {
            BatchState::Idle => None,
            BatchState::Pending { deadline, .. } => Some(*deadline),
        }
    }
}
