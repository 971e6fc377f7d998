use std::collections::BinaryHeap;

use tracing::trace;

pub const CYCLES_PER_FRAME: u64 = 4_920_115;
pub const VBLANK_START_CYCLE: u64 = 4_489_019;
const GS_VBLANK_DELAY: u64 = 65_622;

// Longest stretch the core runs without the driver checking for events.
const MAX_RUN: u64 = 32;

/// Orders the recurring video events against the core's cycle count.
#[derive(Debug)]
pub struct Scheduler {
    pub cycle: u64,
    pending: BinaryHeap<PendingEvent>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Event {
    Run(u64),
    VBlankStart,
    GsVBlank,
    VBlankEnd,
}

#[derive(Eq, PartialEq, Debug)]
struct PendingEvent {
    event: Event,
    period: u64,
    cycle: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new()
    }
}

impl Scheduler {
    pub fn new() -> Scheduler {
        let mut pending = BinaryHeap::new();
        pending.push(PendingEvent {
            event: Event::VBlankStart,
            period: CYCLES_PER_FRAME,
            cycle: VBLANK_START_CYCLE,
        });
        pending.push(PendingEvent {
            event: Event::GsVBlank,
            period: CYCLES_PER_FRAME,
            cycle: VBLANK_START_CYCLE + GS_VBLANK_DELAY,
        });
        pending.push(PendingEvent {
            event: Event::VBlankEnd,
            period: CYCLES_PER_FRAME,
            cycle: CYCLES_PER_FRAME,
        });
        Scheduler { cycle: 0, pending }
    }

    /// The next due event, or how long the core may run before one is due.
    pub fn next_event(&mut self) -> Event {
        let Some(next) = self.pending.peek() else {
            return Event::Run(MAX_RUN);
        };
        if next.cycle > self.cycle {
            return Event::Run((next.cycle - self.cycle).min(MAX_RUN));
        }
        let Some(due) = self.pending.pop() else {
            return Event::Run(MAX_RUN);
        };
        trace!("{:?} at cycle {}", due.event, self.cycle);
        self.pending.push(PendingEvent {
            cycle: due.cycle + due.period,
            ..due
        });
        due.event
    }

    pub fn tick(&mut self, cycles: u64) {
        self.cycle += cycles;
    }
}

impl Ord for PendingEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.cycle.cmp(&self.cycle)
    }
}

impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
