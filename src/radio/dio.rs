//! DIO Dispatcher (C3) — routes hardware interrupts to the active radio
//!
//! §4.2: a GPIO rising edge on either chip's DIO1 posts that pin's id into
//! a bounded FIFO from ISR context; a worker dequeues ids and services
//! them. DIO is level-high until software clears the chip's IRQ-status
//! register, so the worker must read-then-clear before it can go idle,
//! and the inactive chip can still fire (a stray wake) — the dispatcher
//! is told which pin fired, not which chip is "active", and must not
//! assume the two coincide.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::InputPin;

use critical_section::Mutex;
use core::cell::RefCell;
use heapless::Deque;

use crate::radio::traits::Transceiver;

/// Maximum number of pending DIO edges the queue holds before the oldest
/// is dropped (§4.2 "RadioState.dioQueue", §8 "a DIO queue overflow of
/// more than 200 pending edges must not deadlock; oldest-drop is
/// acceptable").
pub const DIO_QUEUE_DEPTH: usize = 200;

/// Maximum read-clear-reprocess iterations the worker runs per dequeued
/// edge before giving up and returning to idle (§4.2 step 2).
const MAX_SERVICE_ITERATIONS: usize = 10;

/// Which chip's DIO1 line posted the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinId {
    /// Sub-GHz transceiver
    SubGhz,
    /// 2.4 GHz ISM transceiver
    Ism2400,
}

/// ISR-safe bounded FIFO of pending DIO edges.
///
/// `post` is meant to be called from interrupt context; `pop` from the
/// DIO worker's cooperative task. Both go through a `critical_section`
/// guard the same way the pack's no_std crates protect shared queues from
/// concurrent ISR/task access.
pub struct DioQueue {
    inner: Mutex<RefCell<Deque<PinId, DIO_QUEUE_DEPTH>>>,
}

impl DioQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Post a pin id from ISR context. Drops the oldest entry instead of
    /// blocking or panicking when the queue is full (§8).
    pub fn post(&self, pin: PinId) {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow_ref_mut(cs);
            if queue.is_full() {
                queue.pop_front();
                crate::log::warn!("dio queue overflow, dropping oldest edge");
            }
            let _ = queue.push_back(pin);
        });
    }

    /// Dequeue the oldest pending pin id, if any.
    pub fn pop(&self) -> Option<PinId> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop_front())
    }
}

impl Default for DioQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Service one dequeued edge against both transceivers (§4.2 step 2).
///
/// `active` identifies which chip the radio selector currently considers
/// "the" radio; `on_active_process` is invoked once per iteration while
/// servicing — wired by the caller to the LoRaMAC service's `process()`
/// plus whatever link-status bookkeeping that implies (§4.5's callback
/// handling), since this module only owns the chip-level dispatch, not
/// the MAC boundary.
pub fn service<T, U, D, F>(
    queue: &DioQueue,
    active: PinId,
    sub_ghz: &mut T,
    ism2400: &mut U,
    delay: &mut D,
    mut on_active_process: F,
) where
    T: Transceiver,
    U: Transceiver,
    D: DelayMs<u32>,
    F: FnMut(),
{
    let Some(pin) = queue.pop() else {
        return;
    };

    for _ in 0..MAX_SERVICE_ITERATIONS {
        let sub_high = sub_ghz.dio1_pin().is_high().unwrap_or(false);
        let ism_high = ism2400.dio1_pin().is_high().unwrap_or(false);

        // A stray edge on the chip that isn't "active" belongs to no one's
        // process() call, so the dispatcher clears and parks it here. The
        // active chip's IRQ flags are read-then-cleared inside
        // `on_active_process` itself (the MAC boundary owns that chip).
        if pin == PinId::SubGhz && sub_high && active != PinId::SubGhz {
            crate::log::warn!("unexpected DIO on inactive sub-GHz chip");
            let _ = sub_ghz.clear_irq();
            let _ = sub_ghz.set_standby();
        }
        if pin == PinId::Ism2400 && ism_high && active != PinId::Ism2400 {
            crate::log::warn!("unexpected DIO on inactive ISM2400 chip");
            let _ = ism2400.clear_irq();
            let _ = ism2400.set_standby();
        }

        on_active_process();
        delay.delay_ms(1);

        let sub_still_high = sub_ghz.dio1_pin().is_high().unwrap_or(false);
        let ism_still_high = ism2400.dio1_pin().is_high().unwrap_or(false);
        if !sub_still_high && !ism_still_high {
            break;
        }
        delay.delay_ms(4);
    }
}
