//! The external LoRaMAC service boundary (§6.1)
//!
//! The LoRaMAC protocol engine itself — frame assembly, MIC, ADR,
//! region-specific channel plans — is explicitly out of scope (spec.md §1):
//! "It is consumed as a service whose request/confirm/indication boundary
//! is fixed by the LoRaWAN specification." This module defines that
//! boundary as a trait so the link controller (§4.5) has something concrete
//! to drive and test against, without reimplementing the protocol.

use heapless::Vec;

use crate::config::device::{AESKey, EUI64};

/// Maximum application payload the external MAC will carry in one frame
/// (spec.md §3 `AppFrame`).
pub const MAX_PAYLOAD: usize = 242;

/// Opaque NVM context blob handed back and forth across sleep (§4.4/§6.4).
pub const MAX_NVM_CONTEXT: usize = 512;

/// Status codes returned by the external MAC on requests (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacStatus {
    /// Request accepted / operation succeeded
    Ok,
    /// The MAC is busy servicing a prior request
    Busy,
    /// Duty-cycle restrictions prevent the request right now
    DutyCycleRestricted,
    /// Requested payload does not fit at the current data rate
    LengthError {
        /// Maximum payload size the MAC would currently accept
        current_max: u8,
    },
    /// Generic MAC-layer error
    Error,
}

/// Region configuration the external MAC is initialized with (§4.5 `Init`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// A sub-GHz regional plan (EU868 / US915 / AS923)
    SubGhz(SubGhzPlan),
    /// The 2.4 GHz ISM band plan (SX1280-class radios)
    Ism2400,
}

/// Sub-GHz regional plan selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubGhzPlan {
    /// European 868 MHz plan
    Eu868,
    /// US 915 MHz plan (sub-band channel masking applies, §4.5 step 4)
    Us915,
    /// Asian 923 MHz plan
    As923,
}

/// Network activation state the external MAC reports (§4.4, §4.5 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkActivation {
    /// Not activated
    None,
    /// Activated by personalization
    Abp,
    /// Activated over the air
    Otaa,
}

/// Typed MIB accessor values (§6.1 `mib_get`/`mib_set`).
#[derive(Debug, Clone, PartialEq)]
pub enum MibValue {
    /// Public-network LoRaWAN sync word
    PublicNetwork(bool),
    /// Adaptive data rate enabled
    Adr(bool),
    /// Active data rate index
    DataRate(i8),
    /// Default data rate index (used before ADR converges)
    DefaultDataRate(i8),
    /// Device EUI
    DevEui(EUI64),
    /// Join EUI
    JoinEui(EUI64),
    /// Network root key
    NwkKey(AESKey),
    /// Application root key
    AppKey(AESKey),
    /// Enabled-channel bitmask
    ChannelsMask([u16; 6]),
    /// Default enabled-channel bitmask
    ChannelsDefaultMask([u16; 6]),
    /// Acceptable RX timing-error budget, in ms
    SystemMaxRxError(u32),
    /// Opaque NVM context blob, restored verbatim across sleep (§4.4)
    NvmContexts(Vec<u8, MAX_NVM_CONTEXT>),
    /// Current activation state
    NetworkActivation(NetworkActivation),
    /// Battery-level encoding reported on `DevStatusReq` (§4.5 battery
    /// callback): 0=ext power, 1=min, 254=max, 255=unmeasured.
    BatteryLevel(u8),
}

/// Discriminant-only selector for `mib_get`, so callers don't need a dummy
/// value to identify which field they want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MibType {
    /// See [`MibValue::PublicNetwork`]
    PublicNetwork,
    /// See [`MibValue::Adr`]
    Adr,
    /// See [`MibValue::DataRate`]
    DataRate,
    /// See [`MibValue::DefaultDataRate`]
    DefaultDataRate,
    /// See [`MibValue::DevEui`]
    DevEui,
    /// See [`MibValue::JoinEui`]
    JoinEui,
    /// See [`MibValue::NwkKey`]
    NwkKey,
    /// See [`MibValue::AppKey`]
    AppKey,
    /// See [`MibValue::ChannelsMask`]
    ChannelsMask,
    /// See [`MibValue::ChannelsDefaultMask`]
    ChannelsDefaultMask,
    /// See [`MibValue::SystemMaxRxError`]
    SystemMaxRxError,
    /// See [`MibValue::NvmContexts`]
    NvmContexts,
    /// See [`MibValue::NetworkActivation`]
    NetworkActivation,
    /// See [`MibValue::BatteryLevel`]
    BatteryLevel,
}

/// `mlme_request` variants (§6.1).
#[derive(Debug, Clone, PartialEq)]
pub enum MlmeRequest {
    /// OTAA join request, at the given data rate
    Join {
        /// Data rate index to join at
        data_rate: i8,
    },
    /// Request the network's epoch time
    DeviceTime,
    /// Request an uplink/downlink link-margin check
    LinkCheck,
    /// Proprietary frame, used by the provisioning handshake (§4.3) since
    /// provisioning messages are framed as proprietary LoRaWAN frames
    /// rather than Join or Data frames.
    Proprietary {
        /// Raw frame payload
        payload: Vec<u8, 96>,
    },
}

/// `mcps_request` variants (§6.1).
#[derive(Debug, Clone, PartialEq)]
pub enum McpsRequest {
    /// Unconfirmed uplink
    Unconfirmed {
        /// Application port
        f_port: u8,
        /// Payload bytes
        data: Vec<u8, MAX_PAYLOAD>,
    },
    /// Confirmed uplink (network ACKs it)
    Confirmed {
        /// Application port
        f_port: u8,
        /// Payload bytes
        data: Vec<u8, MAX_PAYLOAD>,
    },
}

/// Outcome of `query_tx_possible` (§6.1, §7 `MacStatus::LengthError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPossible {
    /// The requested size fits at the current data rate
    Ok,
    /// It doesn't; `current_max` is what would currently fit
    LengthError {
        /// Maximum payload size the MAC would currently accept
        current_max: u8,
    },
}

/// One asynchronous confirm/indication delivered by [`LoRaMacService::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum MacEvent {
    /// MCPS-Confirm: the network (n)acked our last uplink
    McpsConfirm {
        /// Whether the confirmed send succeeded
        status: MacStatus,
    },
    /// MCPS-Indication: something the network sent us
    McpsIndication(McpsIndicationEvent),
    /// MLME-Confirm: completion of an `mlme_request`
    MlmeConfirm {
        /// Which request this confirms
        request: MlmeConfirmKind,
        /// Result status
        status: MacStatus,
    },
}

/// Which `mlme_request` an `MlmeConfirm` event completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlmeConfirmKind {
    /// Completes an OTAA `Join` request
    Join,
    /// Completes a `DeviceTime` request
    DeviceTime,
    /// Completes a `LinkCheck` request
    LinkCheck,
    /// Completes a `Proprietary` request
    Proprietary,
}

/// Indication-side MCPS events (§4.5 "MAC callbacks").
#[derive(Debug, Clone, PartialEq)]
pub enum McpsIndicationEvent {
    /// The network acknowledged a confirmed uplink
    AckReceived,
    /// Downlink application data arrived
    RxData {
        /// Application port (224 is reserved for compliance testing and
        /// must not be surfaced to the application, §4.5)
        port: u8,
        /// Payload bytes
        data: Vec<u8, MAX_PAYLOAD>,
    },
    /// RX1 window closed with nothing received
    Rx1Timeout,
    /// RX2 window closed with nothing received
    Rx2Timeout,
    /// Received frame failed its MIC check
    MicFail,
    /// Received frame's address didn't match ours
    AddressFail,
    /// Proprietary downlink payload (used by the provisioning handshake)
    Proprietary {
        /// Raw frame payload
        payload: Vec<u8, 96>,
    },
}

/// The external LoRaMAC service boundary the link controller drives.
///
/// A concrete implementation wraps the actual protocol engine (out of
/// scope here); the `MockMacService` in this crate's `tests/mock.rs`
/// stands in for it in tests.
pub trait LoRaMacService {
    /// Error type for transport-level failures underneath the MAC
    type Error;

    /// De-initialize then initialize the MAC for the given region
    /// (§4.5 `Init` step 1).
    fn initialize(&mut self, region: Region) -> Result<(), Self::Error>;

    /// Tear down the MAC instance.
    fn deinitialize(&mut self) -> Result<(), Self::Error>;

    /// Start MAC operation after initialization.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Non-blocking pump; drains and returns at most one pending event per
    /// call so the caller's cooperative loop never blocks (§5).
    fn process(&mut self) -> Option<MacEvent>;

    /// Read one typed MIB field.
    fn mib_get(&self, mib: MibType) -> Option<MibValue>;

    /// Write one typed MIB field.
    fn mib_set(&mut self, value: MibValue) -> Result<(), MacStatus>;

    /// Issue a management request (Join, DeviceTime, LinkCheck,
    /// Proprietary).
    fn mlme_request(&mut self, req: MlmeRequest) -> Result<(), MacStatus>;

    /// Issue a data request (Confirmed/Unconfirmed uplink).
    fn mcps_request(&mut self, req: McpsRequest) -> Result<(), MacStatus>;

    /// Would a `size`-byte payload fit at the current data rate?
    fn query_tx_possible(&self, size: usize) -> TxPossible;

    /// Is the MAC mid-transaction (join, send, RX window)?
    fn is_busy(&self) -> bool;

    /// Size, in bytes, of MAC commands queued for piggy-back on the next
    /// uplink (§4.4 "if any queued MAC command awaits transmission").
    fn query_mac_commands_size(&self) -> usize;
}
