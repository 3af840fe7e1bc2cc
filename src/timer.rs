//! Tick & Timer Registry (C1)
//!
//! A fixed table of 16 software timers, driven from a 1 ms periodic
//! interrupt (§4.1). Sixteen is load-bearing (§9 "Timer table size"): the
//! external MAC alone needs several concurrent timers (RX1/RX2 windows,
//! duty-cycle, join backoff) and the link controller adds a few more of
//! its own (join interval, send-waiting deadline, retry backoff,
//! provisioning deadlines).

use heapless::Vec;

/// Number of timer slots in the table (§9 "Timer table size").
pub const TIMER_SLOTS: usize = 16;

/// Minimum reload value `set` will accept; smaller requests are clamped
/// up to this (§4.1 "clamps reload to ≥ 10 ms").
pub const MIN_RELOAD_MS: u32 = 10;

/// Opaque handle identifying a timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(usize);

#[derive(Clone, Copy)]
struct TimerSlot<C> {
    timestamp: u32,
    reload_ms: u32,
    started: bool,
    occupied: bool,
    context: C,
}

impl<C: Copy> TimerSlot<C> {
    const fn empty(default_context: C) -> Self {
        Self {
            timestamp: 0,
            reload_ms: MIN_RELOAD_MS,
            started: false,
            occupied: false,
            context: default_context,
        }
    }
}

/// One expired timer, captured and handed back to the caller outside the
/// critical section (§4.1 "atomically capture the callback+context, clear
/// `started`, then invoke the callback outside the critical section").
///
/// This module only captures *which* timer fired and its `context`; the
/// caller supplies the dispatch (a match on `TimerId`/`context`), since a
/// fixed-size table of trait-object callbacks would need an allocator.
pub struct Expired<C> {
    /// Which slot expired
    pub id: TimerId,
    /// The context the slot was armed with
    pub context: C,
}

/// Fixed-size table of software timers (§3 `TimerSlot`, §4.1).
///
/// `C` is whatever small `Copy` context the caller wants handed back on
/// expiry (e.g. an enum naming which deadline this is).
pub struct TimerRegistry<C: Copy, const N: usize = TIMER_SLOTS> {
    slots: [TimerSlot<C>; N],
}

impl<C: Copy, const N: usize> TimerRegistry<C, N> {
    /// Create an empty timer table. `default_context` fills unused slots;
    /// it is never observed since `occupied` gates every read.
    pub fn new(default_context: C) -> Self {
        Self {
            slots: [TimerSlot::empty(default_context); N],
        }
    }

    /// Assign `reload_ms` (clamped to `MIN_RELOAD_MS`) and `context` to a
    /// timer, allocating the first free slot if `id` is `None`. Leaves the
    /// slot stopped. Returns `None` if the table is full.
    pub fn set(&mut self, id: Option<TimerId>, reload_ms: u32, context: C) -> Option<TimerId> {
        let reload_ms = reload_ms.max(MIN_RELOAD_MS);
        let index = match id {
            Some(TimerId(i)) => i,
            None => self.slots.iter().position(|s| !s.occupied)?,
        };
        let slot = self.slots.get_mut(index)?;
        slot.reload_ms = reload_ms;
        slot.context = context;
        slot.occupied = true;
        slot.started = false;
        Some(TimerId(index))
    }

    /// Stamp `now` and mark the slot started. If the slot isn't tracked
    /// yet, no-ops (call `set` first). Returns `false` (logs) if the id is
    /// out of range.
    pub fn start(&mut self, id: TimerId, now: u32) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot) if slot.occupied => {
                slot.timestamp = now;
                slot.started = true;
                true
            }
            _ => {
                crate::log::warn!("timer::start on unknown or full table");
                false
            }
        }
    }

    /// Clear `started` on a slot.
    pub fn stop(&mut self, id: TimerId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.started = false;
        }
    }

    /// Scan every started slot and collect those whose reload has elapsed
    /// as of `now` (unsigned-wraparound-safe via `wrapping_sub`, §4.1
    /// "`elapsed(past)` handles wrap via unsigned subtraction semantics").
    /// Clears `started` on each before returning so a slot cannot fire
    /// twice; the caller is expected to invoke whatever `context` implies
    /// outside of whatever lock guarded this call.
    pub fn tick(&mut self, now: u32) -> Vec<Expired<C>, N> {
        let mut expired = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.occupied && slot.started && now.wrapping_sub(slot.timestamp) >= slot.reload_ms
            {
                slot.started = false;
                let _ = expired.push(Expired {
                    id: TimerId(index),
                    context: slot.context,
                });
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Debug)]
    enum Ctx {
        None,
        JoinInterval,
        SendWaiting,
    }

    #[test]
    fn reload_is_clamped_to_minimum() {
        let mut table: TimerRegistry<Ctx> = TimerRegistry::new(Ctx::None);
        let id = table.set(None, 1, Ctx::JoinInterval).unwrap();
        table.start(id, 0);
        assert!(table.tick(MIN_RELOAD_MS - 1).is_empty());
        assert_eq!(table.tick(MIN_RELOAD_MS).len(), 1);
    }

    #[test]
    fn fires_exactly_once() {
        let mut table: TimerRegistry<Ctx> = TimerRegistry::new(Ctx::None);
        let id = table.set(None, 100, Ctx::SendWaiting).unwrap();
        table.start(id, 0);
        assert_eq!(table.tick(100).len(), 1);
        assert!(table.tick(200).is_empty());
    }

    #[test]
    fn stop_prevents_firing() {
        let mut table: TimerRegistry<Ctx> = TimerRegistry::new(Ctx::None);
        let id = table.set(None, 100, Ctx::SendWaiting).unwrap();
        table.start(id, 0);
        table.stop(id);
        assert!(table.tick(1_000).is_empty());
    }

    #[test]
    fn table_exhaustion_returns_none() {
        let mut table: TimerRegistry<Ctx, 2> = TimerRegistry::new(Ctx::None);
        assert!(table.set(None, 50, Ctx::JoinInterval).is_some());
        assert!(table.set(None, 50, Ctx::SendWaiting).is_some());
        assert!(table.set(None, 50, Ctx::JoinInterval).is_none());
    }

    #[test]
    fn elapsed_handles_wraparound() {
        let mut table: TimerRegistry<Ctx> = TimerRegistry::new(Ctx::None);
        let id = table.set(None, 100, Ctx::SendWaiting).unwrap();
        table.start(id, u32::MAX - 10);
        assert_eq!(table.tick(90).len(), 1);
    }
}
