//! Battery callback (§4.5 "Battery callback")
//!
//! The external MAC asks the application for a battery-level encoding on
//! `DevStatusReq`; the link controller answers from whatever value the
//! host last pushed in via [`battery_percent_to_encoding`] /
//! [`EXT_POWER_ENCODING`], stored as `LinkVars.batteryValue` (§3) and
//! surfaced to the MAC via `MibValue::BatteryLevel` (§6.1).

/// LoRaMAC battery-level encoding reported when the device runs from
/// external power (§4.5: "`SetExtPower()` → 0").
pub const EXT_POWER_ENCODING: u8 = 0;

/// Unmeasured/unavailable battery-level encoding (§3: "255=unmeasured").
pub const UNMEASURED_ENCODING: u8 = 255;

/// Map a battery percentage (0.0-100.0) to the LoRaMAC battery-level
/// encoding the external MAC expects on `DevStatusReq` (§4.5, §8):
/// `NaN → 255`, `≥100 → 254`, `≤0 → 1`, else a linear map into `[1, 254]`.
pub fn battery_percent_to_encoding(percent: f32) -> u8 {
    if percent.is_nan() {
        return UNMEASURED_ENCODING;
    }
    if percent >= 100.0 {
        return 254;
    }
    if percent <= 0.0 {
        return 1;
    }
    (1.0 + (percent / 100.0) * 253.0) as u8
}
