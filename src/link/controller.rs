//! Link Controller (C8) — the cooperative state machine of §4.5.
//!
//! `LinkController` owns `LinkVars`, `LinkStatus`, the `tx`/`rx` frame
//! slots, and the provisioning attempt (§3 "Ownership"). It never touches
//! a radio directly: it drives the external [`LoRaMacService`] boundary
//! and is fed the host's RNG and millisecond clock on every `step`, the
//! same cooperative-pump shape as a device's own main loop calling into
//! its MAC layer.

use heapless::Vec;
use rand_core::{CryptoRng, RngCore};

use crate::config::device::{AESKey, LinkSettings};
use crate::config::link_config::LinkConfig;
use crate::crypto;
use crate::mac::{
    LoRaMacService, MacEvent, MacStatus, McpsIndicationEvent, McpsRequest, MibType, MibValue,
    MlmeConfirmKind, MlmeRequest, NetworkActivation, Region, SubGhzPlan, TxPossible,
};
use crate::provisioning::{self, ProvisioningContext, ProvisioningMaterial};

use super::frame::AppFrame;
use super::state::State;
use super::status::LinkStatus;
use super::vars::LinkVars;

fn deadline_elapsed(now_ms: u32, armed_at: u32, duration_ms: u32) -> bool {
    now_ms.wrapping_sub(armed_at) >= duration_ms
}

fn uniform_u32(rng: &mut impl RngCore, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    min + (rng.next_u32() % (max - min + 1))
}

fn uniform_i8(rng: &mut impl RngCore, min: i8, max: i8) -> i8 {
    if max <= min {
        return min;
    }
    let span = (max as i32 - min as i32) as u32 + 1;
    min + (rng.next_u32() % span) as i8
}

/// The link state machine (§4.5, §3 "Ownership": exclusively owns
/// `LinkVars`, `LinkStatus`, the frame slots, and the timer table — here
/// folded into `wait_armed_at`/`wait_duration_ms` since every waiting
/// state in this machine tracks exactly one deadline at a time).
pub struct LinkController {
    /// Current state-machine state
    pub state: State,
    /// Runtime counters and policy state (§3)
    pub vars: LinkVars,
    /// Status bit set (§3)
    pub status: LinkStatus,
    /// Uplink slot
    pub tx: AppFrame,
    /// Downlink slot
    pub rx: AppFrame,
    /// Persisted root-key settings (§3, §4.6)
    pub settings: LinkSettings,
    config: LinkConfig,
    region_plan: SubGhzPlan,
    requires_provisioning: bool,
    mainnet: bool,
    eprom_key: AESKey,
    enc_fixed_key: [u8; 16],
    provision_id: Vec<u8, 32>,
    provisioning: Option<ProvisioningContext>,
    pending_proprietary: Option<Vec<u8, 96>>,
    wake_from_sleep: bool,
    wait_armed_at: u32,
    wait_duration_ms: u32,
    last_txchk_ms: u32,
    flushing_before_sleep: bool,
    settings_dirty: bool,
}

/// What the caller must do before the device can actually sleep
/// (§4.4 "if any queued MAC command awaits transmission, send a
/// zero-length MAC-only frame first and wait 2 seconds").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepPrep {
    /// No MAC commands are queued; it is safe to snapshot and sleep now.
    ReadyNow,
    /// A blank MAC-only frame is in flight; wait for the controller to
    /// reach `State::Sleep` (poll `state()`) before snapshotting.
    FlushMacCommandsFirst,
}

impl LinkController {
    /// Build a fresh controller. `requires_provisioning` gates whether a
    /// cold boot (or settings with `provision_done == false`) enters
    /// `ProvStart` before `Join` (§4.5 `Init` step 5).
    pub fn new(
        settings: LinkSettings,
        config: LinkConfig,
        region_plan: SubGhzPlan,
        requires_provisioning: bool,
        provisioning_material: ProvisioningMaterial,
    ) -> Self {
        Self {
            state: State::Init,
            vars: LinkVars::new(config.link_fail_count),
            status: LinkStatus::empty(),
            tx: AppFrame::empty(),
            rx: AppFrame::empty(),
            settings,
            config,
            region_plan,
            requires_provisioning,
            mainnet: provisioning_material.mainnet,
            eprom_key: provisioning_material.eprom_key,
            enc_fixed_key: provisioning_material.enc_fixed_key,
            provision_id: provisioning_material.provision_id,
            provisioning: None,
            pending_proprietary: None,
            wake_from_sleep: false,
            wait_armed_at: 0,
            wait_duration_ms: 0,
            last_txchk_ms: 0,
            flushing_before_sleep: false,
            settings_dirty: false,
        }
    }

    /// Restore a controller from a preserved-state snapshot (§4.4). The
    /// caller is still responsible for handing `linkVars.macNvmContexts`
    /// back to the MAC via `mib_set(NvmContexts(..))` before the first
    /// `step`.
    pub fn resume(
        settings: LinkSettings,
        vars: LinkVars,
        config: LinkConfig,
        region_plan: SubGhzPlan,
        requires_provisioning: bool,
        provisioning_material: ProvisioningMaterial,
    ) -> Self {
        let mut ctrl = Self::new(
            settings,
            config,
            region_plan,
            requires_provisioning,
            provisioning_material,
        );
        ctrl.vars = vars;
        ctrl.wake_from_sleep = true;
        ctrl
    }

    /// Arm a (re)start. On the next `step`, the state machine enters
    /// `Init`, which honors `wake_from_sleep` per §4.5 step 3.
    pub fn request_start(&mut self, wake_from_sleep: bool) {
        self.wake_from_sleep = self.wake_from_sleep || wake_from_sleep;
        self.state = State::Init;
    }

    /// Current state (public API surface, §4.7 and test introspection).
    pub fn current_state(&self) -> State {
        self.state
    }

    /// Advance the state machine by one cooperative tick. Drains every
    /// pending MAC event first (§4.5 "MAC callbacks"), then runs whatever
    /// the current state's transition does.
    pub fn step(
        &mut self,
        now_ms: u32,
        mac: &mut impl LoRaMacService,
        rng: &mut (impl RngCore + CryptoRng),
    ) {
        while let Some(event) = mac.process() {
            self.apply_mac_event(event);
        }

        match self.state {
            State::Init => self.handle_init(mac),
            State::ProvStart => self.handle_prov_start(mac, rng, now_ms),
            State::ProvHello => self.handle_prov_hello(mac, now_ms),
            State::ProvAuth => self.handle_prov_auth(now_ms),
            State::ProvWait => self.handle_prov_wait(now_ms),
            State::Join => self.handle_join(mac, rng, now_ms),
            State::JoinWait => self.handle_join_wait(now_ms),
            State::Joined => self.state = State::Waiting,
            State::Send => self.handle_send(mac, now_ms),
            State::SendMac => self.handle_send_mac(mac, now_ms),
            State::SendWaiting => self.handle_send_waiting(now_ms),
            State::SendSuccess => self.handle_send_success(),
            State::SendFailure => self.handle_send_failure(now_ms),
            State::RetryWaiting => self.handle_retry_waiting(now_ms),
            State::Waiting => self.handle_waiting(now_ms, mac),
            State::Sleep => {}
            State::Wakeup => self.handle_wakeup(),
        }

        self.sync_derived_status();
    }

    fn sync_derived_status(&mut self) {
        if self.status.contains(LinkStatus::JOIN_PASS) && self.tx.is_free() {
            self.status.insert(LinkStatus::TX_RDY);
        } else {
            self.status.remove(LinkStatus::TX_RDY);
        }
    }

    fn apply_mac_event(&mut self, event: MacEvent) {
        match event {
            MacEvent::McpsConfirm { status } => {
                if status == MacStatus::Ok {
                    if !self.vars.tx_confirmed {
                        self.status.insert(LinkStatus::SEND_PASS);
                    }
                } else {
                    self.status.insert(LinkStatus::SEND_FAIL);
                }
            }
            MacEvent::McpsIndication(ind) => match ind {
                McpsIndicationEvent::AckReceived => {
                    if self.vars.tx_confirmed {
                        self.status.insert(LinkStatus::SEND_PASS);
                        self.vars.ack_count = self.vars.ack_count.wrapping_add(1);
                    }
                }
                McpsIndicationEvent::RxData { port, data } => {
                    // port 224 is reserved for compliance testing (§4.5).
                    if port != 224 {
                        let _ = self.rx.fill(port, &data);
                        self.status.insert(LinkStatus::RX_RDY);
                    }
                }
                McpsIndicationEvent::Rx1Timeout
                | McpsIndicationEvent::Rx2Timeout
                | McpsIndicationEvent::MicFail
                | McpsIndicationEvent::AddressFail => {
                    crate::log::debug!("mac indication ignored, no direct recovery action");
                }
                McpsIndicationEvent::Proprietary { payload } => {
                    self.pending_proprietary = Some(payload);
                }
            },
            MacEvent::MlmeConfirm { request, status } => {
                if request == MlmeConfirmKind::Join {
                    if status == MacStatus::Ok {
                        self.status.insert(LinkStatus::JOIN_PASS);
                    } else {
                        self.status.insert(LinkStatus::JOIN_FAIL);
                    }
                }
            }
        }
    }

    fn handle_init(&mut self, mac: &mut impl LoRaMacService) {
        if mac.deinitialize().is_err() {
            self.status.insert(LinkStatus::ERROR);
            crate::log::error!("mac deinitialize failed, fatal-looping in Init");
            return;
        }
        let region = if self.vars.using_ism2400 {
            Region::Ism2400
        } else {
            Region::SubGhz(self.region_plan)
        };
        if mac.initialize(region).is_err() {
            self.status.insert(LinkStatus::ERROR);
            crate::log::error!("mac initialize failed, fatal-looping in Init");
            return;
        }
        if mac.start().is_err() {
            self.status.insert(LinkStatus::ERROR);
            return;
        }

        if self.vars.using_ism2400 {
            self.vars.data_rate = self.config.ism2400_dr;
            let _ = mac.mib_set(MibValue::Adr(false));
        } else {
            self.vars.data_rate = self.config.default_dr;
            let _ = mac.mib_set(MibValue::Adr(self.config.adr_enabled));
        }
        let _ = mac.mib_set(MibValue::DataRate(self.vars.data_rate));
        let _ = mac.mib_set(MibValue::DefaultDataRate(self.vars.data_rate));
        let _ = mac.mib_set(MibValue::BatteryLevel(self.vars.battery_value));

        let wake_honored = self.wake_from_sleep;
        self.wake_from_sleep = false;
        if wake_honored {
            if let Some(MibValue::NetworkActivation(NetworkActivation::Otaa)) =
                mac.mib_get(MibType::NetworkActivation)
            {
                self.status.insert(LinkStatus::JOIN_PASS);
                self.tx.clear();
                self.rx.clear();
                self.state = State::Joined;
                return;
            }
        }

        let _ = mac.mib_set(MibValue::PublicNetwork(true));
        let rx_error_budget_ms = if self.vars.using_ism2400 { 50 } else { 60 };
        let _ = mac.mib_set(MibValue::SystemMaxRxError(rx_error_budget_ms));

        if self.vars.using_ism2400 {
            // ISM2400 uses only channel 0 (§4.5 step 4).
            let mask = [0x0001, 0, 0, 0, 0, 0];
            let _ = mac.mib_set(MibValue::ChannelsMask(mask));
            let _ = mac.mib_set(MibValue::ChannelsDefaultMask(mask));
        } else if self.region_plan == SubGhzPlan::Us915 {
            // US915 sub-band 2 (§4.5 step 4).
            let mask = [0xFF00, 0, 0, 0, 0x0001, 0];
            let _ = mac.mib_set(MibValue::ChannelsMask(mask));
            let _ = mac.mib_set(MibValue::ChannelsDefaultMask(mask));
        }

        self.status = LinkStatus::empty();
        self.tx.clear();
        self.rx.clear();

        if self.requires_provisioning && !self.settings.provision_done {
            self.status.insert(LinkStatus::DEV_PROV);
            self.state = State::ProvStart;
        } else {
            self.state = State::Join;
        }
    }

    fn handle_prov_start(
        &mut self,
        mac: &mut impl LoRaMacService,
        rng: &mut (impl RngCore + CryptoRng),
        now_ms: u32,
    ) {
        let ctx = provisioning::begin(rng, self.settings.dev_eui);
        let hello = provisioning::build_hello(&ctx, self.mainnet);
        self.provisioning = Some(ctx);

        let mut payload: Vec<u8, 96> = Vec::new();
        let _ = payload.extend_from_slice(&hello);
        let _ = mac.mlme_request(MlmeRequest::Proprietary { payload });

        self.wait_armed_at = now_ms;
        self.wait_duration_ms = self.config.prov_hello_timeout_ms;
        self.state = State::ProvHello;
    }

    fn handle_prov_hello(&mut self, mac: &mut impl LoRaMacService, now_ms: u32) {
        if let Some(payload) = self.pending_proprietary.take() {
            if let Some(ctx) = self.provisioning.as_mut() {
                match provisioning::parse_hello_resp(ctx, &payload) {
                    Ok(()) => {
                        let fixed_key = crypto::unwrap_fixed_key(&self.eprom_key, &self.enc_fixed_key);
                        let auth = provisioning::build_auth(ctx, &fixed_key, &self.provision_id);
                        let mut frame: Vec<u8, 96> = Vec::new();
                        let _ = frame.extend_from_slice(&auth);
                        let _ = mac.mlme_request(MlmeRequest::Proprietary { payload: frame });
                        self.wait_armed_at = now_ms;
                        self.wait_duration_ms = self.config.prov_auth_timeout_ms;
                        self.state = State::ProvAuth;
                        return;
                    }
                    Err(e) => {
                        crate::log::warn!("HELLO_RESP rejected: {:?}", e);
                        self.enter_prov_wait(now_ms);
                        return;
                    }
                }
            }
        }
        if deadline_elapsed(now_ms, self.wait_armed_at, self.wait_duration_ms) {
            crate::log::warn!("HELLO_RESP timed out");
            self.enter_prov_wait(now_ms);
        }
    }

    fn handle_prov_auth(&mut self, now_ms: u32) {
        if let Some(payload) = self.pending_proprietary.take() {
            if let Some(mut ctx) = self.provisioning.take() {
                let fixed_key = crypto::unwrap_fixed_key(&self.eprom_key, &self.enc_fixed_key);
                match provisioning::parse_auth_resp(&mut ctx, &payload, &fixed_key, &self.provision_id) {
                    Ok((assigned_dev_eui, assigned_join_eui)) => {
                        self.settings.dev_eui = assigned_dev_eui;
                        self.settings.join_eui = assigned_join_eui;
                        self.settings.app_key = ctx.app_key;
                        self.settings.nwk_key = ctx.nwk_key;
                        self.settings.provision_done = true;
                        self.settings_dirty = true;
                        self.status.remove(LinkStatus::DEV_PROV);
                        self.state = State::Join;
                        return;
                    }
                    Err(e) => {
                        crate::log::warn!("AUTH_RESP rejected: {:?}", e);
                        self.enter_prov_wait(now_ms);
                        return;
                    }
                }
            }
        }
        if deadline_elapsed(now_ms, self.wait_armed_at, self.wait_duration_ms) {
            crate::log::warn!("AUTH_RESP timed out");
            self.enter_prov_wait(now_ms);
        }
    }

    fn enter_prov_wait(&mut self, now_ms: u32) {
        self.provisioning = None;
        self.wait_armed_at = now_ms;
        self.wait_duration_ms = self.config.prov_retry_interval_ms;
        self.state = State::ProvWait;
    }

    fn handle_prov_wait(&mut self, now_ms: u32) {
        if deadline_elapsed(now_ms, self.wait_armed_at, self.wait_duration_ms) {
            self.state = State::ProvStart;
        }
    }

    fn handle_join(
        &mut self,
        mac: &mut impl LoRaMacService,
        rng: &mut (impl RngCore + CryptoRng),
        now_ms: u32,
    ) {
        let dr = if self.vars.using_ism2400 {
            self.config.ism2400_dr
        } else {
            uniform_i8(rng, self.config.join_dr_min, self.config.join_dr_max)
        };
        self.vars.data_rate = dr;

        let _ = mac.mib_set(MibValue::DevEui(self.settings.dev_eui));
        let _ = mac.mib_set(MibValue::JoinEui(self.settings.join_eui));
        let _ = mac.mib_set(MibValue::NwkKey(self.settings.nwk_key));
        let _ = mac.mib_set(MibValue::AppKey(self.settings.app_key));
        let _ = mac.mlme_request(MlmeRequest::Join { data_rate: dr });

        self.vars.join_interval =
            uniform_u32(rng, self.config.join_interval_min_ms, self.config.join_interval_max_ms);
        self.wait_armed_at = now_ms;
        self.wait_duration_ms = self.vars.join_interval;
        self.status.remove(LinkStatus::JOIN_PASS);
        self.status.remove(LinkStatus::JOIN_FAIL);
        self.state = State::JoinWait;
    }

    fn handle_join_wait(&mut self, now_ms: u32) {
        if self.status.contains(LinkStatus::JOIN_PASS) {
            self.vars.join_retry_times = 0;
            self.state = State::Joined;
            return;
        }
        if deadline_elapsed(now_ms, self.wait_armed_at, self.wait_duration_ms) {
            self.process_join_retry();
            self.state = State::Init;
        }
    }

    /// Dual-band round-robin fallback (§4.5 `ProcessJoinRetry`). Gated on
    /// `sw_radio_count != 0` per §9's open question: single-radio builds
    /// (the macro at 0) never flip bands, by design.
    fn process_join_retry(&mut self) {
        if self.config.sw_radio_count == 0 {
            return;
        }
        self.vars.join_retry_times += 1;
        if self.vars.join_retry_times >= self.config.sw_radio_count {
            self.vars.using_ism2400 = !self.vars.using_ism2400;
            self.vars.join_retry_times = 0;
        }
    }

    fn handle_waiting(&mut self, now_ms: u32, mac: &impl LoRaMacService) {
        if self.config.link_fail_count >= 0 && self.vars.fail_count >= self.config.link_fail_count {
            crate::log::warn!("link declared lost, rejoining");
            self.state = State::Init;
            return;
        }
        if now_ms.wrapping_sub(self.last_txchk_ms) >= self.config.txchk_interval_ms {
            self.last_txchk_ms = now_ms;
            if !self.tx.is_free() && !mac.is_busy() {
                self.state = State::Send;
            }
        }
    }

    fn handle_send(&mut self, mac: &mut impl LoRaMacService, now_ms: u32) {
        if let Err(status) = self.send_frame(mac) {
            crate::log::warn!("send rejected: {:?}", status);
            self.status.insert(LinkStatus::SEND_FAIL);
        }
        self.wait_armed_at = now_ms;
        self.wait_duration_ms = self.config.timeout_send_waiting_ms;
        self.state = State::SendWaiting;
    }

    fn handle_send_mac(&mut self, mac: &mut impl LoRaMacService, now_ms: u32) {
        let _ = mac.mcps_request(McpsRequest::Unconfirmed {
            f_port: 0,
            data: Vec::new(),
        });
        self.wait_armed_at = now_ms;
        self.wait_duration_ms = self.config.timeout_send_waiting_ms;
        self.state = State::SendWaiting;
    }

    fn send_frame(&mut self, mac: &mut impl LoRaMacService) -> Result<(), MacStatus> {
        if self.vars.using_ism2400 || !self.config.adr_enabled {
            let _ = mac.mib_set(MibValue::DataRate(self.vars.data_rate));
        }

        let size = self.tx.size.max(0) as usize;
        if matches!(mac.query_tx_possible(size), TxPossible::LengthError { .. }) {
            let _ = mac.mib_set(MibValue::DataRate(self.config.default_dr));
            if let TxPossible::LengthError { current_max } = mac.query_tx_possible(size) {
                return Err(MacStatus::LengthError { current_max });
            }
        }

        let mut data: Vec<u8, { crate::mac::MAX_PAYLOAD }> = Vec::new();
        data.extend_from_slice(&self.tx.buffer[..size])
            .map_err(|_| MacStatus::Error)?;

        let request = if self.vars.tx_confirmed {
            McpsRequest::Confirmed {
                f_port: self.tx.fport,
                data,
            }
        } else {
            McpsRequest::Unconfirmed {
                f_port: self.tx.fport,
                data,
            }
        };
        mac.mcps_request(request)
    }

    fn handle_send_waiting(&mut self, now_ms: u32) {
        if self.status.contains(LinkStatus::SEND_PASS) {
            self.state = State::SendSuccess;
        } else if self.status.contains(LinkStatus::SEND_FAIL) {
            self.state = State::SendFailure;
        } else if deadline_elapsed(now_ms, self.wait_armed_at, self.wait_duration_ms) {
            self.status.insert(LinkStatus::SEND_FAIL);
            self.state = State::SendFailure;
        }
    }

    fn handle_send_success(&mut self) {
        self.tx.clear();
        self.vars.fail_count = if self.config.link_fail_count < 0 { -1 } else { 0 };

        // §9 open question: the check runs *before* incrementing, so with
        // the default `unconfirmed_budget = 0` every uplink stays
        // confirmed. Preserved deliberately.
        if self.vars.unconfirmed_count >= self.config.unconfirmed_budget {
            self.vars.unconfirmed_count = 0;
            self.vars.tx_confirmed = true;
        } else {
            self.vars.unconfirmed_count += 1;
            self.vars.tx_confirmed = false;
        }

        self.status.remove(LinkStatus::SEND_PASS);
        self.status.remove(LinkStatus::SEND_FAIL);

        self.state = if self.flushing_before_sleep {
            self.flushing_before_sleep = false;
            State::Sleep
        } else {
            State::Waiting
        };
    }

    fn handle_send_failure(&mut self, now_ms: u32) {
        self.vars.nak_count = self.vars.nak_count.wrapping_add(1);
        self.vars.fail_count = if self.config.link_fail_count < 0 {
            -1
        } else {
            self.vars.fail_count + 1
        };
        self.tx.retry = self.tx.retry.saturating_add(1);

        let fail_gating_open =
            self.config.link_fail_count < 0 || self.vars.fail_count < self.config.link_fail_count;

        if self.flushing_before_sleep {
            self.flushing_before_sleep = false;
            self.state = State::Sleep;
            return;
        }

        if self.tx.retry <= self.config.max_noack_retry && fail_gating_open {
            self.status.remove(LinkStatus::SEND_PASS);
            self.status.remove(LinkStatus::SEND_FAIL);
            self.wait_armed_at = now_ms;
            self.wait_duration_ms = self.config.noack_retry_interval_ms;
            self.state = State::RetryWaiting;
        } else {
            self.tx.clear();
            self.state = State::Waiting;
        }
    }

    fn handle_retry_waiting(&mut self, now_ms: u32) {
        if deadline_elapsed(now_ms, self.wait_armed_at, self.wait_duration_ms) {
            self.state = State::Send;
        }
    }

    fn handle_wakeup(&mut self) {
        self.state = if self.status.contains(LinkStatus::JOIN_PASS) {
            State::Waiting
        } else {
            State::JoinWait
        };
    }

    /// Begin the deep-sleep sequence (§4.4). If MAC commands are queued,
    /// arms a blank MAC-only frame first and returns
    /// `FlushMacCommandsFirst` — the caller should keep calling `step`
    /// until `current_state() == State::Sleep` (budget ~2s per spec)
    /// before taking the preserved-state snapshot. Otherwise the
    /// controller is already in `State::Sleep` when this returns.
    pub fn prepare_for_sleep(&mut self, mac: &impl LoRaMacService) -> SleepPrep {
        if mac.query_mac_commands_size() > 0 {
            self.tx.size = 0;
            self.tx.fport = 0;
            self.flushing_before_sleep = true;
            self.state = State::SendMac;
            SleepPrep::FlushMacCommandsFirst
        } else {
            self.state = State::Sleep;
            SleepPrep::ReadyNow
        }
    }

    /// Resume from sleep; resolved on the next `step` to `Waiting` (if
    /// still joined) or `JoinWait` (§4.5 Sleep path).
    pub fn resume_from_sleep(&mut self) {
        self.state = State::Wakeup;
    }

    /// `is_busy()` is false exactly when the MAC is idle and the state is
    /// one of `{Waiting, JoinWait, ProvStart}` (§4.7).
    pub fn is_busy(&self, mac: &impl LoRaMacService) -> bool {
        !(!mac.is_busy()
            && matches!(self.state, State::Waiting | State::JoinWait | State::ProvStart))
    }

    /// Remaining dwell until the next scheduled action, in ms.
    /// `u32::MAX` means nothing pending; `0` means run now (§4.7).
    pub fn waiting_time_ms(&self, now_ms: u32) -> u32 {
        match self.state {
            State::JoinWait
            | State::SendWaiting
            | State::RetryWaiting
            | State::ProvHello
            | State::ProvAuth
            | State::ProvWait => {
                let elapsed = now_ms.wrapping_sub(self.wait_armed_at);
                self.wait_duration_ms.saturating_sub(elapsed)
            }
            State::Waiting => 0,
            _ => u32::MAX,
        }
    }

    /// Is a TX slot free and the device joined (§8 invariant:
    /// `tx.size == -1 <-> TX_RDY` after `JOIN_PASS`)?
    pub fn is_tx_ready(&self) -> bool {
        self.status.contains(LinkStatus::TX_RDY)
    }

    /// Queue `data` on `fport` for the next `Waiting` → `Send` transition.
    pub fn send_data(&mut self, fport: u8, data: &[u8]) -> Result<(), ()> {
        if !self.is_tx_ready() {
            return Err(());
        }
        self.tx.fill(fport, data)?;
        self.sync_derived_status();
        Ok(())
    }

    /// Is there downlink data waiting to be consumed?
    pub fn is_rx_ready(&self) -> bool {
        self.status.contains(LinkStatus::RX_RDY)
    }

    /// Copy the pending downlink into `out`, returning `(len, fport)` and
    /// freeing the slot. `None` if nothing is pending.
    pub fn take_data(&mut self, out: &mut [u8]) -> Option<(usize, u8)> {
        if !self.is_rx_ready() {
            return None;
        }
        let len = self.rx.size.max(0) as usize;
        let n = len.min(out.len());
        out[..n].copy_from_slice(&self.rx.buffer[..n]);
        let fport = self.rx.fport;
        self.rx.clear();
        self.status.remove(LinkStatus::RX_RDY);
        Some((n, fport))
    }

    /// Has device provisioning completed at least once?
    pub fn is_provisioned(&self) -> bool {
        self.settings.provision_done
    }

    /// Is the device currently joined?
    pub fn is_joined(&self) -> bool {
        self.status.contains(LinkStatus::JOIN_PASS)
    }

    /// Has the last send attempt concluded (success or failure)?
    pub fn is_send_done(&self) -> bool {
        self.status.contains(LinkStatus::SEND_PASS) || self.status.contains(LinkStatus::SEND_FAIL)
    }

    /// Did the last concluded send succeed?
    pub fn is_send_success(&self) -> bool {
        self.status.contains(LinkStatus::SEND_PASS)
    }

    /// Is the 2.4 GHz ISM radio currently selected?
    pub fn is_ism2400(&self) -> bool {
        self.vars.using_ism2400
    }

    /// Force the active data rate (host override, §4.7).
    pub fn set_datarate(&mut self, dr: i8) {
        self.vars.data_rate = dr;
    }

    /// Record a battery percentage reading (§4.5 "Battery callback").
    pub fn set_battery_percent(&mut self, percent: f32) {
        self.vars.battery_value = super::battery::battery_percent_to_encoding(percent);
    }

    /// Record that the device runs from external power.
    pub fn set_ext_power(&mut self) {
        self.vars.battery_value = super::battery::EXT_POWER_ENCODING;
    }

    /// Take the settings blob if provisioning just changed it, so the
    /// caller can persist it via [`crate::persistence`]. Returns `None`
    /// (and clears the dirty flag) otherwise.
    pub fn take_dirty_settings(&mut self) -> Option<LinkSettings> {
        if self.settings_dirty {
            self.settings_dirty = false;
            Some(self.settings)
        } else {
            None
        }
    }
}
