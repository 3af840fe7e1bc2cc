//! Device identity, persisted settings, and tunable policy constants

/// Device identity (`EUI64`, `AESKey`) and persisted root-key settings
pub mod device;

/// Tunable state-machine constants (`LinkConfig`)
pub mod link_config;

pub use device::{AESKey, LinkSettings, EUI64};
pub use link_config::LinkConfig;
