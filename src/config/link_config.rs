//! Build-time constants the link controller state machine is tuned by
//!
//! These were originally fixed constants (`SW_RADIO_COUNT`,
//! `LINK_FAIL_COUNT`, ...); gathering them into one struct with `Default`
//! lets a host application override them without editing the crate, while
//! `LinkConfig::default()` reproduces the documented defaults exactly.

/// Tunable policy constants for [`crate::link::LinkController`].
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Number of consecutive join attempts on one band before flipping to
    /// the other radio. `0` disables the round-robin fallback entirely
    /// (single-radio builds; see spec.md §9 open questions).
    pub sw_radio_count: u8,
    /// Consecutive send failures after which the link is declared lost and
    /// the controller re-joins. `-1` disables link-failure gating.
    pub link_fail_count: i32,
    /// Maximum number of automatic retries after a send failure before the
    /// frame is dropped.
    pub max_noack_retry: u8,
    /// Unconfirmed-uplink budget before the controller forces one
    /// confirmed uplink (§4.5 `SendSuccess`, §9 open questions: with the
    /// default `0` every uplink is confirmed).
    pub unconfirmed_budget: u16,
    /// Minimum dwell, in ms, between `tx.size >= 0` checks in the
    /// `Waiting` state.
    pub txchk_interval_ms: u32,
    /// Deadline, in ms, for a `SendWaiting` confirm/indication to arrive.
    pub timeout_send_waiting_ms: u32,
    /// Dwell, in ms, before a retried send is re-attempted.
    pub noack_retry_interval_ms: u32,
    /// Inclusive lower bound of the uniform-random join data rate on
    /// sub-GHz bands.
    pub join_dr_min: i8,
    /// Inclusive upper bound of the uniform-random join data rate on
    /// sub-GHz bands.
    pub join_dr_max: i8,
    /// Default data rate used when ADR is off and the band is sub-GHz.
    pub default_dr: i8,
    /// Fixed data rate used on the ISM2400 band.
    pub ism2400_dr: i8,
    /// Inclusive lower bound, in ms, of the uniform-random join interval.
    pub join_interval_min_ms: u32,
    /// Inclusive upper bound, in ms, of the uniform-random join interval.
    pub join_interval_max_ms: u32,
    /// Whether ADR is requested on sub-GHz bands (always off on ISM2400,
    /// §4.5 `Init`).
    pub adr_enabled: bool,
    /// Deadline, in ms, for a HELLO_RESP to arrive during provisioning.
    pub prov_hello_timeout_ms: u32,
    /// Deadline, in ms, for an AUTH_RESP to arrive during provisioning.
    pub prov_auth_timeout_ms: u32,
    /// Dwell, in ms, between a failed provisioning attempt and the next.
    pub prov_retry_interval_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            sw_radio_count: 2,
            link_fail_count: 10,
            max_noack_retry: 2,
            unconfirmed_budget: 0,
            txchk_interval_ms: 10_000,
            timeout_send_waiting_ms: 17_500,
            noack_retry_interval_ms: 20_000,
            join_dr_min: 0,
            join_dr_max: 4,
            default_dr: 3,
            ism2400_dr: 3,
            join_interval_min_ms: 90_000,
            join_interval_max_ms: 120_000,
            adr_enabled: true,
            prov_hello_timeout_ms: 5_000,
            prov_auth_timeout_ms: 5_000,
            prov_retry_interval_ms: 30_000,
        }
    }
}
