//! # lora-link-controller
//!
//! A `no_std` dual-radio LoRaWAN link layer for an end device: the
//! cooperative state machine that sequences Init -> (Provisioning) ->
//! Join -> Joined/Send/Retry -> Waiting -> Sleep/Wake, driving an
//! external LoRaMAC service and two radio transceivers (a sub-GHz part
//! for EU868/US915/AS923 and a 2.4 GHz ISM part) while coordinating with
//! interrupt-driven radio DIO events and a periodic millisecond tick.
//!
//! The LoRaMAC protocol engine itself (frame assembly, MIC, ADR,
//! region-specific channel plans) is consumed as an external collaborator
//! through the [`mac::LoRaMacService`] trait, not reimplemented here; see
//! that module's docs for the request/confirm/indication boundary this
//! crate drives.
//!
//! ## Layout
//!
//! - [`link`]: the Link Controller state machine ([`link::LinkController`])
//!   and its thread-safe façade ([`link::api::LinkApi`])
//! - [`mac`]: the external LoRaMAC service boundary (trait only)
//! - [`radio`]: the `Transceiver` HAL trait, two concrete chip drivers, the
//!   DIO dispatcher, and the radio selector
//! - [`provisioning`]: the ECDH device-provisioning handshake
//! - [`crypto`]: AES/CMAC primitives backing provisioning
//! - [`preserved_state`]: CRC-protected MAC-context/link-vars snapshot for
//!   deep sleep
//! - [`persistence`]: XOR-protected root-key settings blob
//! - [`timer`]: the fixed-size software timer table
//! - [`config`]: device identity, persisted settings, and tunable
//!   state-machine constants
//! - [`error`]: the crate-wide error type
//! - [`log`]: the `defmt`-or-nothing logging facade
//!
//! ## Example
//!
//! ```rust,no_run
//! use lora_link_controller::config::{LinkConfig, LinkSettings};
//! use lora_link_controller::link::LinkController;
//! use lora_link_controller::mac::SubGhzPlan;
//! use lora_link_controller::provisioning::ProvisioningMaterial;
//!
//! let settings = LinkSettings::default_from_mac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
//! let material = ProvisioningMaterial {
//!     eprom_key: lora_link_controller::config::AESKey::new([0; 16]),
//!     enc_fixed_key: [0; 16],
//!     provision_id: Default::default(),
//!     mainnet: false,
//! };
//! let mut controller = LinkController::new(
//!     settings,
//!     LinkConfig::default(),
//!     SubGhzPlan::Eu868,
//!     false,
//!     material,
//! );
//! controller.request_start(false);
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Device identity, persisted settings, and tunable state-machine constants
pub mod config;
/// AES/CMAC primitives backing device provisioning
pub mod crypto;
/// Crate-wide error type
pub mod error;
/// The Link Controller (C8) and its thread-safe façade
pub mod link;
/// Logging facade: `defmt` when enabled, no-op otherwise
pub mod log;
/// The external LoRaMAC service boundary (consumed, not implemented)
pub mod mac;
/// Persistence (C9): XOR-protected settings blob
pub mod persistence;
/// Preserved State (C7): CRC-protected deep-sleep snapshot
pub mod preserved_state;
/// Device Provisioning (C6): ECDH handshake + CMAC verify codes
pub mod provisioning;
/// Radio HAL, DIO dispatcher, and radio selector (C2-C4)
pub mod radio;
/// Tick & Timer Registry (C1)
pub mod timer;

pub use error::{Error, ProvisioningError, Result};
