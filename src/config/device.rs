//! Device identity and persisted link settings
//!
//! This module provides the small value types shared across the crate
//! (`EUI64`, `AESKey`) and `LinkSettings`, the persisted root-key record
//! (§3/§4.6).

/// 64-bit Extended Unique Identifier (DevEUI / JoinEUI)
pub type EUI64 = [u8; 8];

/// AES-128 key (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AESKey {
    bytes: [u8; 16],
}

impl AESKey {
    /// Create a new AES key from raw bytes
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Get the raw bytes of the key
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }
}

/// Root-key settings: DevEUI, JoinEUI, NwkKey, AppKey, and whether the
/// device has completed provisioning.
///
/// Created at first boot from the chip's hardware MAC address and mutated
/// only by successful provisioning (§4.3) or a direct settings write.
/// Persisted via [`crate::persistence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Device EUI
    pub dev_eui: EUI64,
    /// Join (application) EUI
    pub join_eui: EUI64,
    /// Network root key
    pub nwk_key: AESKey,
    /// Application root key
    pub app_key: AESKey,
    /// Whether device provisioning has completed at least once
    pub provision_done: bool,
}

impl LinkSettings {
    /// Build the default settings for a fresh device: DevEUI synthesized
    /// from the hardware MAC address by inserting `FF FE` between bytes 3
    /// and 4, JoinEUI all-zero, NwkKey all `0x01`, AppKey all `0x02`,
    /// provisioning not yet done.
    ///
    /// Mirrors spec.md §4.6's persistence defaults and §8 scenario 1.
    pub fn default_from_mac(hw_mac: [u8; 6]) -> Self {
        let mut dev_eui = [0u8; 8];
        dev_eui[0] = hw_mac[0];
        dev_eui[1] = hw_mac[1];
        dev_eui[2] = hw_mac[2];
        dev_eui[3] = 0xFF;
        dev_eui[4] = 0xFE;
        dev_eui[5] = hw_mac[3];
        dev_eui[6] = hw_mac[4];
        dev_eui[7] = hw_mac[5];

        Self {
            dev_eui,
            join_eui: [0u8; 8],
            nwk_key: AESKey::new([0x01; 16]),
            app_key: AESKey::new([0x02; 16]),
            provision_done: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_eui_inserts_fffe_between_byte_3_and_4() {
        let settings = LinkSettings::default_from_mac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(
            settings.dev_eui,
            [0xAA, 0xBB, 0xCC, 0xFF, 0xFE, 0xDD, 0xEE, 0xFF]
        );
    }

    #[test]
    fn defaults_match_spec() {
        let settings = LinkSettings::default_from_mac([0; 6]);
        assert_eq!(settings.join_eui, [0u8; 8]);
        assert_eq!(*settings.nwk_key.as_bytes(), [0x01; 16]);
        assert_eq!(*settings.app_key.as_bytes(), [0x02; 16]);
        assert!(!settings.provision_done);
    }
}
