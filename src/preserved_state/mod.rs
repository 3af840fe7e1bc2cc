//! Preserved State (C7) — CRC-protected RTC-retained snapshot (§4.4, §6.4)
//!
//! `{ magic, macContexts, linkVars }` followed by a separate CRC-CCITT(IV
//! 0x1234) over the struct bytes. Stored in whatever RTC-retained memory
//! the host provides; this module only knows how to serialize, validate,
//! and restore the blob, kept separate from the storage medium itself.

use crc::{Algorithm, Crc};
use heapless::Vec;

use crate::link::LinkVars;
use crate::mac::MAX_NVM_CONTEXT;

const MAGIC: u32 = 0x48AD3F56;

/// Non-reflected CRC-CCITT with init `0x1234` and no xorout, matching the
/// bit-exact wire format the RTC-retained snapshot is validated against
/// (§3, §6.4) — this is *not* CRC-16/X-25 (`CRC_16_IBM_SDLC`), which
/// reflects input/output and uses a different init/xorout.
const CRC_CCITT_IV_1234: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x1234,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0x0000,
    residue: 0x0000,
};
const CRC: Crc<u16> = Crc::<u16>::new(&CRC_CCITT_IV_1234);

/// Size of the serialized body (everything the CRC covers), in bytes.
const BODY_LEN: usize = 4 + 2 + MAX_NVM_CONTEXT + LINK_VARS_LEN;
const LINK_VARS_LEN: usize = 4 + 4 + 4 + 4 + 1 + 1 + 1 + 1 + 2;

/// Total wire size: body + trailing `u16` CRC.
pub const BLOB_LEN: usize = BODY_LEN + 2;

/// A validated preserved-state snapshot (§3 `PreservedState`).
#[derive(Debug, Clone, PartialEq)]
pub struct PreservedState {
    /// Opaque NVM context blob handed back to the LoRaMAC service's
    /// NVM-restore entry point on wake.
    pub mac_contexts: Vec<u8, MAX_NVM_CONTEXT>,
    /// Link controller runtime counters, as they stood before sleep.
    pub link_vars: LinkVars,
}

fn pack_link_vars(v: &LinkVars, out: &mut [u8]) {
    out[0..4].copy_from_slice(&v.ack_count.to_le_bytes());
    out[4..8].copy_from_slice(&v.nak_count.to_le_bytes());
    out[8..12].copy_from_slice(&v.fail_count.to_le_bytes());
    out[12..16].copy_from_slice(&v.join_interval.to_le_bytes());
    out[16] = v.join_retry_times;
    out[17] = v.battery_value;
    out[18] = v.data_rate as u8;
    out[19] = (v.using_ism2400 as u8) | ((v.tx_confirmed as u8) << 1);
    out[20..22].copy_from_slice(&v.unconfirmed_count.to_le_bytes());
}

fn unpack_link_vars(bytes: &[u8]) -> LinkVars {
    LinkVars {
        ack_count: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
        nak_count: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        fail_count: i32::from_le_bytes(bytes[8..12].try_into().unwrap()),
        join_interval: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        join_retry_times: bytes[16],
        battery_value: bytes[17],
        data_rate: bytes[18] as i8,
        using_ism2400: bytes[19] & 0x01 != 0,
        tx_confirmed: bytes[19] & 0x02 != 0,
        unconfirmed_count: u16::from_le_bytes(bytes[20..22].try_into().unwrap()),
    }
}

/// Serialize `state` into `out` (must be at least [`BLOB_LEN`] bytes),
/// magic + payload + trailing CRC, ready to copy into RTC-retained memory
/// (§4.4 "shutdown ... boundary").
pub fn save(state: &PreservedState, out: &mut [u8; BLOB_LEN]) {
    out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    let ctx_len = state.mac_contexts.len() as u16;
    out[4..6].copy_from_slice(&ctx_len.to_le_bytes());
    let ctx_start = 6;
    out[ctx_start..ctx_start + state.mac_contexts.len()].copy_from_slice(&state.mac_contexts);
    let vars_start = ctx_start + MAX_NVM_CONTEXT;
    pack_link_vars(&state.link_vars, &mut out[vars_start..vars_start + LINK_VARS_LEN]);

    let crc = CRC.checksum(&out[..BODY_LEN]);
    out[BODY_LEN..BODY_LEN + 2].copy_from_slice(&crc.to_le_bytes());
}

/// Validate and parse a preserved-state blob read back from RTC-retained
/// memory. `None` if either the magic or the CRC doesn't match (§4.4
/// "valid after a deep-sleep wake iff both magic and CRC match"); the
/// caller falls back to treating this as a cold boot.
pub fn load(blob: &[u8; BLOB_LEN]) -> Option<PreservedState> {
    let magic = u32::from_le_bytes(blob[0..4].try_into().unwrap());
    if magic != MAGIC {
        return None;
    }

    let expected_crc = u16::from_le_bytes(blob[BODY_LEN..BODY_LEN + 2].try_into().unwrap());
    let actual_crc = CRC.checksum(&blob[..BODY_LEN]);
    if expected_crc != actual_crc {
        return None;
    }

    let ctx_len = u16::from_le_bytes(blob[4..6].try_into().unwrap()) as usize;
    if ctx_len > MAX_NVM_CONTEXT {
        return None;
    }
    let ctx_start = 6;
    let mut mac_contexts = Vec::new();
    mac_contexts
        .extend_from_slice(&blob[ctx_start..ctx_start + ctx_len])
        .ok()?;

    let vars_start = ctx_start + MAX_NVM_CONTEXT;
    let link_vars = unpack_link_vars(&blob[vars_start..vars_start + LINK_VARS_LEN]);

    Some(PreservedState {
        mac_contexts,
        link_vars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PreservedState {
        let mut mac_contexts = Vec::new();
        mac_contexts.extend_from_slice(&[0xAB; 40]).unwrap();
        PreservedState {
            mac_contexts,
            link_vars: LinkVars {
                ack_count: 7,
                nak_count: 2,
                fail_count: 1,
                join_interval: 100_000,
                join_retry_times: 1,
                battery_value: 180,
                data_rate: 3,
                using_ism2400: true,
                tx_confirmed: false,
                unconfirmed_count: 5,
            },
        }
    }

    #[test]
    fn round_trips() {
        let state = sample();
        let mut blob = [0u8; BLOB_LEN];
        save(&state, &mut blob);
        assert_eq!(load(&blob), Some(state));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let state = sample();
        let mut blob = [0u8; BLOB_LEN];
        save(&state, &mut blob);
        blob[0] ^= 0xFF;
        assert_eq!(load(&blob), None);
    }

    #[test]
    fn corrupted_byte_fails_crc() {
        let state = sample();
        let mut blob = [0u8; BLOB_LEN];
        save(&state, &mut blob);
        blob[10] ^= 0x01;
        assert_eq!(load(&blob), None);
    }
}
