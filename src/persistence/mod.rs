//! Persistence (C9) — settings load/save with an XOR integrity tag (§4.6, §6.5)
//!
//! Namespace `"MatchX"`, key `"lora_data"` in whatever key/value NVM store
//! the host provides (flash, EEPROM, ...); this module only knows the blob
//! format, not the storage medium, the same split `preserved_state` draws
//! between snapshot and memory.

use crate::config::device::{AESKey, LinkSettings};

/// NVM namespace the settings blob lives under.
pub const NAMESPACE: &str = "MatchX";
/// NVM key the settings blob is stored at.
pub const KEY: &str = "lora_data";

const MAGIC: u32 = 0xA38D72F1;
const XOR_INIT: u8 = 0xAA;

const DEV_EUI_LEN: usize = 8;
const JOIN_EUI_LEN: usize = 8;
const KEY_LEN: usize = 16;

/// Wire size of the settings blob: `magic(4) + settings + xor(1)`.
pub const BLOB_LEN: usize = 4 + DEV_EUI_LEN + JOIN_EUI_LEN + KEY_LEN + KEY_LEN + 1 + 1;

fn xor_all(bytes: &[u8]) -> u8 {
    bytes.iter().fold(XOR_INIT, |acc, b| acc ^ b)
}

/// Serialize `settings` into `out`, choosing the trailing XOR byte so the
/// byte-wise XOR over the whole blob (accumulator seeded `0xAA`) is zero
/// (§4.6).
pub fn save(settings: &LinkSettings, out: &mut [u8; BLOB_LEN]) {
    out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    let mut off = 4;
    out[off..off + DEV_EUI_LEN].copy_from_slice(&settings.dev_eui);
    off += DEV_EUI_LEN;
    out[off..off + JOIN_EUI_LEN].copy_from_slice(&settings.join_eui);
    off += JOIN_EUI_LEN;
    out[off..off + KEY_LEN].copy_from_slice(settings.nwk_key.as_bytes());
    off += KEY_LEN;
    out[off..off + KEY_LEN].copy_from_slice(settings.app_key.as_bytes());
    off += KEY_LEN;
    out[off] = settings.provision_done as u8;
    off += 1;

    let xor = xor_all(&out[..off]);
    out[off] = xor;
}

/// Parse and integrity-check a settings blob. Falls back to
/// [`LinkSettings::default_from_mac`] if the magic is wrong or the XOR
/// over the whole blob is nonzero (§4.6 "corrupt -> reset to default").
pub fn load(blob: &[u8; BLOB_LEN], hw_mac: [u8; 6]) -> LinkSettings {
    if xor_all(blob) != 0 {
        return LinkSettings::default_from_mac(hw_mac);
    }

    let magic = u32::from_le_bytes(blob[0..4].try_into().unwrap());
    if magic != MAGIC {
        return LinkSettings::default_from_mac(hw_mac);
    }

    let mut off = 4;
    let mut dev_eui = [0u8; DEV_EUI_LEN];
    dev_eui.copy_from_slice(&blob[off..off + DEV_EUI_LEN]);
    off += DEV_EUI_LEN;
    let mut join_eui = [0u8; JOIN_EUI_LEN];
    join_eui.copy_from_slice(&blob[off..off + JOIN_EUI_LEN]);
    off += JOIN_EUI_LEN;
    let mut nwk_key = [0u8; KEY_LEN];
    nwk_key.copy_from_slice(&blob[off..off + KEY_LEN]);
    off += KEY_LEN;
    let mut app_key = [0u8; KEY_LEN];
    app_key.copy_from_slice(&blob[off..off + KEY_LEN]);
    off += KEY_LEN;
    let provision_done = blob[off] != 0;

    LinkSettings {
        dev_eui,
        join_eui,
        nwk_key: AESKey::new(nwk_key),
        app_key: AESKey::new(app_key),
        provision_done,
    }
}
