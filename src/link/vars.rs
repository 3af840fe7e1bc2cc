//! `LinkVars` — runtime counters and policy state (§3).

/// Runtime counters and policy state mutated by the link controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkVars {
    /// Confirmed uplinks acked since boot
    pub ack_count: u32,
    /// Send failures (nak'd or timed out) since boot
    pub nak_count: u32,
    /// Consecutive send failures; `-1` disables link-failure gating
    pub fail_count: i32,
    /// Randomized gap, in ms, before the next join attempt
    pub join_interval: u32,
    /// Consecutive radio attempts on one band before flipping (§4.5
    /// `ProcessJoinRetry`)
    pub join_retry_times: u8,
    /// LoRaMAC battery-level encoding (0=ext, 1=min, 254=max, 255=unmeasured)
    pub battery_value: u8,
    /// Active data-rate index
    pub data_rate: i8,
    /// Is the 2.4 GHz ISM radio currently selected?
    pub using_ism2400: bool,
    /// Current uplink confirmation policy
    pub tx_confirmed: bool,
    /// Unconfirmed frames sent since the last confirmed one, bounded by
    /// `LinkConfig::unconfirmed_budget`
    pub unconfirmed_count: u16,
}

impl LinkVars {
    /// Fresh counters for a cold boot: no acks/naks, link-failure gating
    /// enabled, confirmed-by-default (matches `tx_confirmed = true` so the
    /// very first uplink, before any ratcheting has run, is confirmed).
    pub fn new(link_fail_count: i32) -> Self {
        Self {
            ack_count: 0,
            nak_count: 0,
            fail_count: if link_fail_count < 0 { -1 } else { 0 },
            join_interval: 0,
            join_retry_times: 0,
            battery_value: 255,
            data_rate: 0,
            using_ism2400: false,
            tx_confirmed: true,
            unconfirmed_count: 0,
        }
    }
}
