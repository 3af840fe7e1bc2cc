//! Device Provisioning (C6) — ECDH handshake + CMAC verify codes (§4.3)
//!
//! A four-message handshake with a server, framed as LoRaWAN *proprietary*
//! uplinks/downlinks rather than Join/Data frames (the external MAC's
//! [`crate::mac::MlmeRequest::Proprietary`] / [`crate::mac::McpsIndicationEvent::Proprietary`]
//! carry the raw bytes this module builds and parses). On success the
//! derived EUIs/keys become the new [`crate::config::LinkSettings`].

use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{EncodedPoint, PublicKey, SecretKey};
use rand_core::{CryptoRng, RngCore};

use crate::config::device::{AESKey, EUI64};
use crate::crypto::{self, Direction};
use crate::error::ProvisioningError;

/// `0x01 HELLO` uplink (§6.3).
pub const MSG_HELLO: u8 = 0x01;
/// `0x81 HELLO_RESP` downlink.
pub const MSG_HELLO_RESP: u8 = 0x81;
/// `0x11 AUTH` uplink.
pub const MSG_AUTH: u8 = 0x11;
/// `0x91 AUTH_ACCEPT` downlink.
pub const MSG_AUTH_ACCEPT: u8 = 0x91;
/// `0x92 AUTH_REJECT` downlink.
pub const MSG_AUTH_REJECT: u8 = 0x92;

/// Wire length of the HELLO uplink.
pub const HELLO_LEN: usize = 74;
/// Wire length of the HELLO_RESP downlink.
pub const HELLO_RESP_LEN: usize = 77;
/// Wire length of the AUTH uplink.
pub const AUTH_LEN: usize = 61;
/// Wire length of the AUTH_ACCEPT downlink.
pub const AUTH_ACCEPT_LEN: usize = 41;
/// Wire length of the AUTH_REJECT downlink.
pub const AUTH_REJECT_LEN: usize = 9;

const PROVISION_ID_MAX: usize = 32;

/// MIB label bytes for `DeriveKey` (§4.3): AppKey=1, NwkKey=2, ProvKey=3.
const LABEL_APP_KEY: u8 = 1;
const LABEL_NWK_KEY: u8 = 2;
const LABEL_PROV_KEY: u8 = 3;

/// Build-time material the link controller needs to drive a provisioning
/// attempt: the per-device key-unwrap key and ciphertext constant for
/// [`crate::crypto::unwrap_fixed_key`], the provisioning identifier sent
/// in the AUTH uplink, and whether this device joins the mainnet server.
#[derive(Clone)]
pub struct ProvisioningMaterial {
    /// Per-device key used to unwrap `enc_fixed_key` into the CMAC fixed key
    pub eprom_key: AESKey,
    /// Build-time ciphertext constant unwrapped into the CMAC fixed key
    pub enc_fixed_key: [u8; 16],
    /// ASCII provisioning identifier (≤ 32 bytes), sent in the AUTH uplink
    pub provision_id: heapless::Vec<u8, 32>,
    /// Mainnet flag carried in the HELLO uplink's trailing byte
    pub mainnet: bool,
}

/// Per-attempt provisioning state (§3 `ProvisioningContext`).
///
/// Created at provisioning start, destroyed on success (keys migrated
/// into `LinkSettings`) or abandonment (timeout).
pub struct ProvisioningContext {
    /// The device's own EUI, used as AAD in every encrypted frame
    pub dev_eui: EUI64,
    /// Our ECDH private scalar (P-256)
    ecdh_priv_key: [u8; 32],
    /// Our ECDH public key, uncompressed coordinates (no SEC1 tag byte)
    pub ecdh_pub_key: [u8; 64],
    /// The server's ECDH public key, once HELLO_RESP arrives
    pub server_pub_key: [u8; 64],
    /// `ECDH(privKey, serverPubKey)` as raw point coordinates (§4.3: this
    /// is *not* the x-only shared secret an ECDH primitive normally
    /// returns — see [`shared_point`] for why)
    pub shared_secret: [u8; 64],
    /// Server-chosen nonce, echoed back in the AUTH uplink
    pub server_nonce: [u8; 4],
    /// Our own nonce, echoed back (encrypted) in AUTH_RESP
    pub dev_nonce: [u8; 4],
    /// Derived application session key
    pub app_key: AESKey,
    /// Derived network session key
    pub nwk_key: AESKey,
    /// Derived provisioning-transport key
    pub prov_key: AESKey,
    /// EUI the server assigned us, once AUTH_ACCEPT arrives
    pub assigned_dev_eui: EUI64,
    /// Join EUI the server assigned us
    pub assigned_join_eui: EUI64,
}

/// Generate a fresh ECDH keypair and nonce, starting a new attempt
/// (§4.3 "Init").
pub fn begin<R: RngCore + CryptoRng>(rng: &mut R, dev_eui: EUI64) -> ProvisioningContext {
    let secret = SecretKey::random(rng);
    let pub_key = raw_public_key(&secret);
    let mut dev_nonce = [0u8; 4];
    rng.fill_bytes(&mut dev_nonce);

    let mut priv_key = [0u8; 32];
    priv_key.copy_from_slice(secret.to_bytes().as_slice());

    ProvisioningContext {
        dev_eui,
        ecdh_priv_key: priv_key,
        ecdh_pub_key: pub_key,
        server_pub_key: [0u8; 64],
        shared_secret: [0u8; 64],
        server_nonce: [0u8; 4],
        dev_nonce,
        app_key: AESKey::new([0u8; 16]),
        nwk_key: AESKey::new([0u8; 16]),
        prov_key: AESKey::new([0u8; 16]),
        assigned_dev_eui: [0u8; 8],
        assigned_join_eui: [0u8; 8],
    }
}

/// Build the HELLO uplink: `0x01 | devEui(8) | pubKey(64) | version/mainnet(1)`.
///
/// The wire format names two fields (`0x01 (version)` and `mainnetFlag`)
/// but the frame totals 74 bytes, one short of fitting both as separate
/// bytes — they share the trailing byte: the low 7 bits carry the fixed
/// version (`0x01`), bit 7 carries the mainnet flag (§6.3).
pub fn build_hello(ctx: &ProvisioningContext, mainnet: bool) -> [u8; HELLO_LEN] {
    let mut frame = [0u8; HELLO_LEN];
    frame[0] = MSG_HELLO;
    frame[1..9].copy_from_slice(&ctx.dev_eui);
    frame[9..73].copy_from_slice(&ctx.ecdh_pub_key);
    frame[73] = 0x01 | if mainnet { 0x80 } else { 0x00 };
    frame
}

/// Parse the HELLO_RESP downlink, verify the echoed DevEUI, derive the
/// session keys from the ECDH shared secret, and record the server's
/// nonce/public key in `ctx` (§4.3).
pub fn parse_hello_resp(
    ctx: &mut ProvisioningContext,
    frame: &[u8],
) -> Result<(), ProvisioningError> {
    if frame.len() != HELLO_RESP_LEN || frame[0] != MSG_HELLO_RESP {
        return Err(ProvisioningError::HelloTimeout);
    }
    if frame[1..9] != ctx.dev_eui {
        return Err(ProvisioningError::DevEuiMismatch);
    }

    ctx.server_pub_key.copy_from_slice(&frame[9..73]);
    ctx.server_nonce.copy_from_slice(&frame[73..77]);

    let secret =
        SecretKey::from_bytes(&ctx.ecdh_priv_key).map_err(|_| ProvisioningError::DevEuiMismatch)?;
    ctx.shared_secret =
        shared_point(&secret, &ctx.server_pub_key).ok_or(ProvisioningError::DevEuiMismatch)?;

    derive_session_keys(ctx);
    Ok(())
}

fn derive_session_keys(ctx: &mut ProvisioningContext) {
    // §4.3: K1 = secret[0..16], K2 = secret[32..48], K3 = secret[16..24] || secret[48..56]
    let k1 = AESKey::new(slice_to_16(&ctx.shared_secret[0..16]));
    let k2 = AESKey::new(slice_to_16(&ctx.shared_secret[32..48]));
    let mut k3_bytes = [0u8; 16];
    k3_bytes[0..8].copy_from_slice(&ctx.shared_secret[16..24]);
    k3_bytes[8..16].copy_from_slice(&ctx.shared_secret[48..56]);
    let k3 = AESKey::new(k3_bytes);

    ctx.app_key = crypto::derive_key(ctx.dev_eui, &k1, LABEL_APP_KEY);
    ctx.nwk_key = crypto::derive_key(ctx.dev_eui, &k2, LABEL_NWK_KEY);
    ctx.prov_key = crypto::derive_key(ctx.dev_eui, &k3, LABEL_PROV_KEY);
}

fn slice_to_16(bytes: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(bytes);
    out
}

/// Build the AUTH uplink: `0x11 | devEui(8) | encPayload(52)`, where the
/// plaintext payload is `provisionIdHash(32) | verifyCode(16) | devNonce(4)`
/// and the verify code binds `provision_id` to the server's nonce.
///
/// `provision_id` (≤ 32 ASCII bytes) is zero-padded into the 32-byte
/// "hash" slot; no hash function is named anywhere in the handshake
/// (see DESIGN.md) so the slot is treated as a fixed-width carrier for
/// the identifier itself rather than a digest.
pub fn build_auth(ctx: &ProvisioningContext, fixed_key: &AESKey, provision_id: &[u8]) -> [u8; AUTH_LEN] {
    let mut payload = [0u8; 52];
    let id_len = provision_id.len().min(PROVISION_ID_MAX);
    payload[0..id_len].copy_from_slice(&provision_id[..id_len]);

    let verify_code = crypto::verify_code(fixed_key, provision_id, &ctx.server_nonce);
    payload[32..48].copy_from_slice(&verify_code);
    payload[48..52].copy_from_slice(&ctx.dev_nonce);

    crypto::counter_mode_crypt(&ctx.prov_key, ctx.dev_eui, Direction::Up, &mut payload);

    let mut frame = [0u8; AUTH_LEN];
    frame[0] = MSG_AUTH;
    frame[1..9].copy_from_slice(&ctx.dev_eui);
    frame[9..61].copy_from_slice(&payload);
    frame
}

/// Parse an AUTH_RESP downlink (accept or reject form). On accept,
/// decrypts the payload, checks the verify code against `devNonce`, and
/// returns the assigned EUIs; a mismatch or the explicit reject form
/// both fail provisioning (§4.3, §7 "Provisioning verify-code mismatch").
pub fn parse_auth_resp(
    ctx: &mut ProvisioningContext,
    frame: &[u8],
    fixed_key: &AESKey,
    provision_id: &[u8],
) -> Result<(EUI64, EUI64), ProvisioningError> {
    if frame.len() == AUTH_REJECT_LEN && frame[0] == MSG_AUTH_REJECT {
        return Err(ProvisioningError::Rejected);
    }
    if frame.len() != AUTH_ACCEPT_LEN || frame[0] != MSG_AUTH_ACCEPT {
        return Err(ProvisioningError::AuthTimeout);
    }
    if frame[1..9] != ctx.dev_eui {
        return Err(ProvisioningError::DevEuiMismatch);
    }

    let mut payload = [0u8; 32];
    payload.copy_from_slice(&frame[9..41]);
    crypto::counter_mode_crypt(&ctx.prov_key, ctx.dev_eui, Direction::Down, &mut payload);

    ctx.assigned_dev_eui.copy_from_slice(&payload[0..8]);
    ctx.assigned_join_eui.copy_from_slice(&payload[8..16]);
    let received_code = slice_to_16(&payload[16..32]);

    let expected_code = crypto::verify_code(fixed_key, provision_id, &ctx.dev_nonce);
    if received_code != expected_code {
        return Err(ProvisioningError::VerifyCodeMismatch);
    }

    Ok((ctx.assigned_dev_eui, ctx.assigned_join_eui))
}

fn raw_public_key(secret: &SecretKey) -> [u8; 64] {
    let encoded = secret.public_key().to_encoded_point(false);
    let mut raw = [0u8; 64];
    raw.copy_from_slice(&encoded.as_bytes()[1..65]);
    raw
}

fn decode_public_key(raw: &[u8; 64]) -> Option<PublicKey> {
    let mut tagged = [0u8; 65];
    tagged[0] = 0x04;
    tagged[1..].copy_from_slice(raw);
    let point = EncodedPoint::from_bytes(tagged).ok()?;
    PublicKey::from_encoded_point(&point).into()
}

/// `ECDH(privKey, peerPubKey)` as the *full point* coordinates, not the
/// x-only output a standard ECDH primitive returns.
///
/// The wire format's `sharedSecret[64]` is twice the width of a P-256
/// x-only shared secret, so this computes the raw scalar-multiplication result
/// `d * Q` and returns its uncompressed affine coordinates directly
/// rather than routing through `p256::ecdh::diffie_hellman`.
fn shared_point(secret: &SecretKey, peer_raw: &[u8; 64]) -> Option<[u8; 64]> {
    let peer = decode_public_key(peer_raw)?;
    let product = p256::ProjectivePoint::from(peer.as_affine()) * *secret.to_nonzero_scalar();
    let encoded = product.to_affine().to_encoded_point(false);
    let mut out = [0u8; 64];
    out.copy_from_slice(&encoded.as_bytes()[1..65]);
    Some(out)
}
