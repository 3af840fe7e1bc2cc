//! Radio hardware abstraction layer
//!
//! - [`traits`]: the `Transceiver` capability trait both chip families
//!   implement (§9 REDESIGN FLAGS)
//! - [`subghz`]: SX126x-class sub-GHz driver (EU868/US915/AS923)
//! - [`ism2400`]: SX1280-class 2.4 GHz ISM driver
//! - [`dio`]: DIO Dispatcher (C3) — bounded-FIFO edge routing
//! - [`selector`]: Radio Selector (C4) — which chip is "active"

/// Common `Transceiver` trait and wire-level config types
pub mod traits;

/// SX126x-class sub-GHz radio driver
pub mod subghz;

/// SX1280-class 2.4 GHz ISM radio driver
pub mod ism2400;

/// DIO Dispatcher: bounded-FIFO edge routing to the active radio
pub mod dio;

/// Radio Selector: which chip is "the active radio"
pub mod selector;

pub use dio::{DioQueue, PinId};
pub use ism2400::Ism2400Transceiver;
pub use selector::ActiveRadio;
pub use subghz::SubGhzTransceiver;
pub use traits::{ModulationParams, RxConfig, Transceiver, TxConfig};
