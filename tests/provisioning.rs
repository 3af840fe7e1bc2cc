//! Black-box coverage of the device-side provisioning framing from
//! outside the crate. The full ECDH round trip (both sides agreeing on a
//! shared secret) needs the peer's private scalar, which the module
//! rightly keeps private — that path is covered by the inline tests in
//! `src/provisioning/mod.rs`. This file exercises what a caller wiring
//! this crate into a host actually sees: frame shapes and the client-side
//! failure paths (timeout-shaped garbage, mismatched DevEUI, an explicit
//! reject).

use rand_core::{CryptoRng, RngCore};

use lora_link_controller::provisioning::{
    begin, build_auth, build_hello, parse_auth_resp, parse_hello_resp, AUTH_LEN,
    AUTH_REJECT_LEN, HELLO_LEN, HELLO_RESP_LEN, MSG_AUTH, MSG_AUTH_REJECT, MSG_HELLO,
    MSG_HELLO_RESP,
};
use lora_link_controller::config::AESKey;
use lora_link_controller::error::ProvisioningError;

struct TestRng(u64);

impl RngCore for TestRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
impl CryptoRng for TestRng {}

fn rng() -> TestRng {
    TestRng(0xC0FFEE1234567890)
}

#[test]
fn hello_frame_carries_dev_eui_and_mainnet_flag() {
    let dev_eui = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x01, 0x02];
    let ctx = begin(&mut rng(), dev_eui);

    let frame = build_hello(&ctx, true);
    assert_eq!(frame.len(), HELLO_LEN);
    assert_eq!(frame[0], MSG_HELLO);
    assert_eq!(&frame[1..9], &dev_eui);
    assert_eq!(frame[73] & 0x80, 0x80, "mainnet bit should be set");

    let frame_not_mainnet = build_hello(&ctx, false);
    assert_eq!(frame_not_mainnet[73] & 0x80, 0);
}

#[test]
fn hello_resp_with_wrong_length_is_rejected() {
    let dev_eui = [1; 8];
    let mut ctx = begin(&mut rng(), dev_eui);
    let short = [0u8; HELLO_RESP_LEN - 1];
    assert_eq!(
        parse_hello_resp(&mut ctx, &short),
        Err(ProvisioningError::HelloTimeout)
    );
}

#[test]
fn hello_resp_with_mismatched_dev_eui_is_rejected() {
    let dev_eui = [1; 8];
    let mut ctx = begin(&mut rng(), dev_eui);

    let mut frame = [0u8; HELLO_RESP_LEN];
    frame[0] = MSG_HELLO_RESP;
    frame[1..9].copy_from_slice(&[2; 8]); // wrong DevEUI

    assert_eq!(
        parse_hello_resp(&mut ctx, &frame),
        Err(ProvisioningError::DevEuiMismatch)
    );
}

#[test]
fn auth_frame_has_correct_shape() {
    let dev_eui = [3; 8];
    let mut ctx = begin(&mut rng(), dev_eui);
    ctx.server_nonce = [9, 9, 9, 9];
    let fixed_key = AESKey::new([0x55; 16]);

    let frame = build_auth(&ctx, &fixed_key, b"DEVICE-1");
    assert_eq!(frame.len(), AUTH_LEN);
    assert_eq!(frame[0], MSG_AUTH);
    assert_eq!(&frame[1..9], &dev_eui);
}

#[test]
fn explicit_auth_reject_is_surfaced_as_rejected() {
    let dev_eui = [4; 8];
    let mut ctx = begin(&mut rng(), dev_eui);
    let fixed_key = AESKey::new([0x11; 16]);

    let mut reject = [0u8; AUTH_REJECT_LEN];
    reject[0] = MSG_AUTH_REJECT;

    assert_eq!(
        parse_auth_resp(&mut ctx, &reject, &fixed_key, b"DEVICE-1"),
        Err(ProvisioningError::Rejected)
    );
}
