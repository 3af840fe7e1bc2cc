//! The Link Controller (C8) and its supporting value types (§3, §4.5).

/// Thread-safe façade over [`LinkController`] (C10, §4.7)
pub mod api;
mod battery;
mod controller;
mod frame;
mod state;
mod status;
mod vars;

pub use api::{LinkApi, RxInfo};
pub use battery::{battery_percent_to_encoding, EXT_POWER_ENCODING, UNMEASURED_ENCODING};
pub use controller::{LinkController, SleepPrep};
pub use frame::{AppFrame, SLOT_EMPTY};
pub use state::State;
pub use status::LinkStatus;
pub use vars::LinkVars;
