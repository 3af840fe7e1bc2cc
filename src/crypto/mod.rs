//! Cryptographic primitives backing device provisioning (§4.3)
//!
//! Built directly on the `aes`/`cmac` crates: the verify code goes through
//! `cmac::Cmac` so subkey generation and padding are correct by
//! construction, rather than hand-rolling CMAC's subkey derivation.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use cmac::{Cmac, Mac};

use crate::config::device::{AESKey, EUI64};

/// Message direction, used to pick the `A[5]`/dir byte in counter-mode
/// encryption (§4.3 "Counter-mode encryption").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to server
    Up = 0,
    /// Server to device
    Down = 1,
}

/// Encrypt a single 16-byte block in place under `key` (ECB, one block).
///
/// Used both to derive provisioning keys (§4.3 "Key derivation") and to
/// unwrap the build-time fixed key (§4.3 "VerifyCode").
pub fn aes128_encrypt_block(key: &AESKey, block: &mut [u8; 16]) {
    let cipher = Aes128::new_from_slice(key.as_bytes()).expect("AES-128 key is exactly 16 bytes");
    cipher.encrypt_block(block.into());
}

/// `fixedKey = AES128(epromKey, encFixedKey)`
///
/// A keyed unwrap of a build-time constant, so the provisioning secret is
/// not stored in plaintext in firmware. `enc_fixed_key` is the ciphertext
/// constant baked into the build; `eprom_key` is the per-device unwrap key.
pub fn unwrap_fixed_key(eprom_key: &AESKey, enc_fixed_key: &[u8; 16]) -> AESKey {
    let mut block = *enc_fixed_key;
    aes128_encrypt_block(eprom_key, &mut block);
    AESKey::new(block)
}

/// `CMAC-AES128(key, data)`, the full 16-byte tag.
///
/// `CalVerifyCode` (§4.3) truncates the caller's use of this to 16 bytes,
/// which is already the native CMAC-AES128 tag size, so no truncation is
/// needed here.
pub fn cmac_aes128(key: &AESKey, data: &[u8]) -> [u8; 16] {
    let mut mac = Cmac::<Aes128>::new_from_slice(key.as_bytes())
        .expect("AES-128 key is exactly 16 bytes");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// `CalVerifyCode`: `CMAC-AES128(fixedKey, provisionId || nonce)`.
///
/// `provision_id` is the ASCII provisioning identifier (≤ 32 bytes per
/// §4.3); `nonce` is either the server nonce (device-side AUTH uplink) or
/// the device nonce (server-side AUTH_RESP), per which end is computing it.
pub fn verify_code(fixed_key: &AESKey, provision_id: &[u8], nonce: &[u8; 4]) -> [u8; 16] {
    let mut buf = heapless::Vec::<u8, 36>::new();
    let _ = buf.extend_from_slice(provision_id);
    let _ = buf.extend_from_slice(nonce);
    cmac_aes128(fixed_key, &buf)
}

/// Derive one of `{AppKey, NwkKey, ProvKey}` from the device EUI and a
/// 16-byte slice of the ECDH shared secret (§4.3 "Key derivation").
///
/// Per spec: zero a 16-byte buffer, fill it entirely with the label byte,
/// overwrite the first 8 bytes with `dev_eui`, then AES-128-encrypt the
/// block under `k_i`. The ciphertext is the derived key.
pub fn derive_key(dev_eui: EUI64, k_i: &AESKey, label: u8) -> AESKey {
    let mut block = [label; 16];
    block[..8].copy_from_slice(&dev_eui);
    aes128_encrypt_block(k_i, &mut block);
    AESKey::new(block)
}

/// LoRaWAN-style A-block counter-mode crypt, used for the AUTH uplink and
/// AUTH_RESP downlink payloads (§4.3 "Counter-mode encryption").
///
/// `A[16]` is the all-zero block with `A[0]=0x02, A[5]=dir, A[6..14]=devEui,
/// A[15]=counter` (counter starting at 1). Each 16-byte chunk of `buf` is
/// XORed with `AES128(key, A)`; the counter then increments. This is its
/// own inverse given matching `key`/`dev_eui`/`dir`.
pub fn counter_mode_crypt(key: &AESKey, dev_eui: EUI64, dir: Direction, buf: &mut [u8]) {
    let mut counter: u8 = 1;
    for chunk in buf.chunks_mut(16) {
        let mut a = [0u8; 16];
        a[0] = 0x02;
        a[5] = dir as u8;
        a[6..14].copy_from_slice(&dev_eui);
        a[15] = counter;

        let mut s = a;
        aes128_encrypt_block(key, &mut s);

        for (b, s_byte) in chunk.iter_mut().zip(s.iter()) {
            *b ^= s_byte;
        }
        counter = counter.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_mode_crypt_is_involutive() {
        let key = AESKey::new([0x2b; 16]);
        let dev_eui = [1, 2, 3, 4, 5, 6, 7, 8];
        let plaintext = b"provisioning round-trip payload";
        let mut buf = *plaintext;

        counter_mode_crypt(&key, dev_eui, Direction::Up, &mut buf);
        assert_ne!(&buf, plaintext);
        counter_mode_crypt(&key, dev_eui, Direction::Up, &mut buf);
        assert_eq!(&buf, plaintext);
    }

    #[test]
    fn counter_mode_crypt_direction_matters() {
        let key = AESKey::new([0x5a; 16]);
        let dev_eui = [0u8; 8];
        let mut up = *b"0123456789abcdef";
        let mut down = up;

        counter_mode_crypt(&key, dev_eui, Direction::Up, &mut up);
        counter_mode_crypt(&key, dev_eui, Direction::Down, &mut down);
        assert_ne!(up, down);
    }

    #[test]
    fn unwrap_fixed_key_changes_with_either_input() {
        let eprom_a = AESKey::new([0x01; 16]);
        let eprom_b = AESKey::new([0x02; 16]);
        let enc_const = [0xAA; 16];

        let key_a = unwrap_fixed_key(&eprom_a, &enc_const);
        let key_b = unwrap_fixed_key(&eprom_b, &enc_const);
        assert_ne!(key_a.as_bytes(), key_b.as_bytes());

        let mut other_const = enc_const;
        other_const[0] ^= 0xFF;
        let key_c = unwrap_fixed_key(&eprom_a, &other_const);
        assert_ne!(key_a.as_bytes(), key_c.as_bytes());
    }

    #[test]
    fn verify_code_is_deterministic() {
        let fixed_key = AESKey::new([0x10; 16]);
        let nonce = [0x01, 0x02, 0x03, 0x04];
        let a = verify_code(&fixed_key, b"TEST", &nonce);
        let b = verify_code(&fixed_key, b"TEST", &nonce);
        assert_eq!(a, b);
    }

    #[test]
    fn derived_keys_are_pairwise_distinct() {
        let dev_eui = [9, 8, 7, 6, 5, 4, 3, 2];
        let k1 = AESKey::new([0x11; 16]);
        let k2 = AESKey::new([0x22; 16]);
        let k3 = AESKey::new([0x33; 16]);

        let app_key = derive_key(dev_eui, &k1, 1);
        let nwk_key = derive_key(dev_eui, &k2, 2);
        let prov_key = derive_key(dev_eui, &k3, 3);

        assert_ne!(app_key.as_bytes(), nwk_key.as_bytes());
        assert_ne!(app_key.as_bytes(), prov_key.as_bytes());
        assert_ne!(nwk_key.as_bytes(), prov_key.as_bytes());
    }
}
