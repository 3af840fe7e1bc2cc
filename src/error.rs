//! Crate-wide error type
//!
//! The link controller is generic over two radio transceivers (sub-GHz and
//! ISM2400), so its error type carries both of their associated error types
//! plus the MAC-service and provisioning failure modes.

use crate::mac::MacStatus;

/// Error returned by the link controller and its collaborators.
///
/// `E1` is the sub-GHz transceiver's error type, `E2` the ISM2400
/// transceiver's.
#[derive(Debug)]
pub enum Error<E1, E2> {
    /// Sub-GHz radio transport error
    SubGhzRadio(E1),
    /// ISM2400 radio transport error
    Ism2400Radio(E2),
    /// Radio transport timed out waiting on BUSY
    RadioTimeout,
    /// The external LoRaMAC service returned an error status
    Mac(MacStatus),
    /// Join procedure failed (exhausted retries or the MAC reported failure)
    Join,
    /// Transmission failed or was rejected
    Tx,
    /// Invalid state for the requested operation
    InvalidState,
    /// Buffer too small for the requested operation
    BufferTooSmall,
    /// Invalid parameter
    InvalidParam,
    /// Device provisioning failed (timeout or verify-code mismatch)
    Provisioning(ProvisioningError),
    /// Preserved-state or settings blob failed its integrity check
    Corrupt,
    /// The link mutex could not be acquired
    MutexTimeout,
}

/// Reason a device-provisioning attempt was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningError {
    /// No HELLO_RESP arrived before the deadline
    HelloTimeout,
    /// HELLO_RESP echoed a DevEUI that does not match ours
    DevEuiMismatch,
    /// No AUTH_RESP arrived before the deadline
    AuthTimeout,
    /// The server rejected the AUTH uplink (0x92 AUTH_REJECT)
    Rejected,
    /// AUTH_RESP's verify code did not match our own computation
    VerifyCodeMismatch,
}

impl<E1, E2> From<ProvisioningError> for Error<E1, E2> {
    fn from(e: ProvisioningError) -> Self {
        Error::Provisioning(e)
    }
}

impl<E1, E2> From<MacStatus> for Error<E1, E2> {
    fn from(status: MacStatus) -> Self {
        Error::Mac(status)
    }
}

/// Result type for the link controller
pub type Result<T, E1, E2> = core::result::Result<T, Error<E1, E2>>;
