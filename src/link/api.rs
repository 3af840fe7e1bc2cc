//! Public API (C10) — thread-safe façade for the host application (§4.7)
//!
//! A single mutex serializes mutation of `LinkStatus`, the frame slots,
//! and the state variable (§4.7 "Ordering"): the DIO worker's callback
//! processing and the link task's periodic [`LinkApi::step`] both go
//! through here, the same `critical_section::Mutex<RefCell<_>>` shape
//! [`crate::radio::dio::DioQueue`] uses for its ISR/task boundary. Real
//! hardware has no blocking OS mutex below `critical_section`; the
//! documented 50 ms acquire timeout is preserved as `Error::MutexTimeout`
//! on a failed borrow, which in this cooperative single-core model only
//! happens on a reentrant call (a caller re-entering the façade from
//! inside its own callback, which is a host bug, not real contention).

use core::cell::RefCell;

use critical_section::Mutex;
use rand_core::{CryptoRng, RngCore};

use crate::error::{Error, Result};
use crate::mac::LoRaMacService;
use crate::radio::traits::Transceiver;

use super::controller::{LinkController, SleepPrep};
use super::state::State;

/// Downlink metadata returned alongside the payload by [`LinkApi::get_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxInfo {
    /// Application port the downlink arrived on
    pub fport: u8,
}

struct Inner<T, U, M, R> {
    controller: LinkController,
    sub_ghz: T,
    ism2400: U,
    mac: M,
    rng: R,
    hw_initialized: bool,
    stopped: bool,
}

/// Thread-safe façade over [`LinkController`] (§4.7). `T`/`U` are the
/// sub-GHz and ISM2400 transceivers, `M` the external MAC service, `R` the
/// host's CSPRNG (join data-rate/interval randomization, provisioning key
/// generation).
pub struct LinkApi<T, U, M, R> {
    inner: Mutex<RefCell<Inner<T, U, M, R>>>,
}

impl<T, U, M, R> LinkApi<T, U, M, R>
where
    T: Transceiver,
    U: Transceiver,
    M: LoRaMacService,
    R: RngCore + CryptoRng,
{
    /// Wrap an already-constructed controller and its collaborators behind
    /// the link mutex. Hardware bring-up is deferred to [`Self::hw_init`].
    pub fn new(controller: LinkController, sub_ghz: T, ism2400: U, mac: M, rng: R) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                controller,
                sub_ghz,
                ism2400,
                mac,
                rng,
                hw_initialized: false,
                stopped: true,
            })),
        }
    }

    fn with_inner<V>(&self, f: impl FnOnce(&mut Inner<T, U, M, R>) -> V) -> Result<V, T::Error, U::Error> {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut guard = cell.try_borrow_mut().map_err(|_| Error::MutexTimeout)?;
            Ok(f(&mut guard))
        })
    }

    /// Idempotent hardware bring-up: reset then initialize both
    /// transceivers. Safe to call repeatedly (§4.7 "idempotent hardware
    /// bring-up").
    pub fn hw_init(
        &self,
        delay: &mut impl embedded_hal::blocking::delay::DelayMs<u32>,
    ) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| {
            if inner.hw_initialized {
                return Ok(());
            }
            inner.sub_ghz.reset(delay).map_err(Error::SubGhzRadio)?;
            inner.sub_ghz.init(delay).map_err(Error::SubGhzRadio)?;
            inner.ism2400.reset(delay).map_err(Error::Ism2400Radio)?;
            inner.ism2400.init(delay).map_err(Error::Ism2400Radio)?;
            inner.hw_initialized = true;
            Ok(())
        })?
    }

    /// Arm (or re-arm) the link state machine. `wake_from_sleep` should be
    /// true only immediately after a deep-sleep wake with a valid
    /// preserved-state snapshot already restored into the controller.
    pub fn start(&self, wake_from_sleep: bool) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| {
            inner.stopped = false;
            inner.controller.request_start(wake_from_sleep);
        })
    }

    /// Halt the cooperative loop; subsequent [`Self::step`] calls no-op
    /// until [`Self::start`] is called again.
    pub fn stop(&self) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| inner.stopped = true)
    }

    /// Advance the state machine by one cooperative tick (§4.5, §5). A
    /// no-op if [`Self::stop`] was called and [`Self::start`] hasn't run
    /// since.
    pub fn step(&self, now_ms: u32) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| {
            if inner.stopped {
                return;
            }
            let Inner {
                controller, mac, rng, ..
            } = inner;
            controller.step(now_ms, mac, rng);
        })
    }

    /// Is the MAC idle and the state one of `{Waiting, JoinWait,
    /// ProvStart}` (§4.7)?
    pub fn is_busy(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_busy(&inner.mac))
    }

    /// Remaining dwell, in ms, until the next scheduled action;
    /// `u32::MAX` means nothing pending, `0` means run now (§4.7).
    pub fn waiting_time_ms(&self, now_ms: u32) -> Result<u32, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.waiting_time_ms(now_ms))
    }

    /// Begin deep-sleep preparation (§4.4). `deep` selects whether the
    /// host tears down RAM (requiring a full preserved-state restore on
    /// wake) or only clock-gates (host-level decision; this façade only
    /// flushes queued MAC commands before signalling it is safe).
    pub fn prepare_for_sleep(&self, deep: bool) -> Result<SleepPrep, T::Error, U::Error> {
        let _ = deep;
        self.with_inner(|inner| inner.controller.prepare_for_sleep(&inner.mac))
    }

    /// Current state, for a caller polling after [`Self::prepare_for_sleep`]
    /// returned [`SleepPrep::FlushMacCommandsFirst`].
    pub fn state(&self) -> Result<State, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.current_state())
    }

    /// Resume from sleep; resolved on the next [`Self::step`].
    pub fn resume_from_sleep(&self) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.resume_from_sleep())
    }

    /// Is a TX slot free and the device joined?
    pub fn is_tx_ready(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_tx_ready())
    }

    /// Queue `data` on `fport` for the next uplink.
    pub fn send_data(&self, fport: u8, data: &[u8]) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.send_data(fport, data).map_err(|_| Error::Tx))?
    }

    /// Is there downlink data waiting to be consumed?
    pub fn is_rx_ready(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_rx_ready())
    }

    /// Copy pending downlink data into `out`, filling `info`, and
    /// returning the number of bytes copied (0 if nothing was pending).
    pub fn get_data(&self, out: &mut [u8], info: &mut RxInfo) -> Result<usize, T::Error, U::Error> {
        self.with_inner(|inner| match inner.controller.take_data(out) {
            Some((len, fport)) => {
                info.fport = fport;
                len
            }
            None => 0,
        })
    }

    /// Has device provisioning completed at least once?
    pub fn is_provisioned(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_provisioned())
    }

    /// Is the device currently joined?
    pub fn is_joined(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_joined())
    }

    /// Has the last send attempt concluded?
    pub fn is_send_done(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_send_done())
    }

    /// Did the last concluded send succeed?
    pub fn is_send_success(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_send_success())
    }

    /// Is the 2.4 GHz ISM radio currently selected?
    pub fn is_ism2400(&self) -> Result<bool, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.is_ism2400())
    }

    /// Force the active data rate.
    pub fn set_datarate(&self, dr: i8) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.set_datarate(dr))
    }

    /// Record a battery percentage reading (0.0-100.0).
    pub fn set_battery_percent(&self, percent: f32) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.set_battery_percent(percent))
    }

    /// Record that the device runs from external power.
    pub fn set_ext_power(&self) -> Result<(), T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.set_ext_power())
    }

    /// Take the settings blob if provisioning just changed it (for the
    /// host to persist via [`crate::persistence`]).
    pub fn take_dirty_settings(&self) -> Result<Option<crate::config::device::LinkSettings>, T::Error, U::Error> {
        self.with_inner(|inner| inner.controller.take_dirty_settings())
    }
}
