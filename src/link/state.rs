//! The link controller's state enum (§4.5).

/// States of the cooperative link state machine (§4.5).
///
/// Initial: [`State::Init`]. There is no terminal state — teardown is
/// driven externally by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// (Re-)initialize the external MAC for the currently selected region
    Init,
    /// Generate an ECDH keypair and send the HELLO uplink
    ProvStart,
    /// Await HELLO_RESP, then send the AUTH uplink
    ProvHello,
    /// Await AUTH_RESP
    ProvAuth,
    /// Dwell between a failed provisioning attempt and the next try
    ProvWait,
    /// Build and issue the OTAA join request
    Join,
    /// Await `MLME_JOIN` confirm or the randomized join interval
    JoinWait,
    /// Joined and idle; transitions to `Send` or back to `Init` from here
    Joined,
    /// Issue a confirmed/unconfirmed uplink request
    Send,
    /// Issue a blank MAC-only uplink (piggy-backed MAC commands only)
    SendMac,
    /// Await MCPS confirm/indication or the send-waiting timeout
    SendWaiting,
    /// Apply the bookkeeping for a successful send
    SendSuccess,
    /// Apply the bookkeeping for a failed send
    SendFailure,
    /// Dwell before a retried send is re-attempted
    RetryWaiting,
    /// The dwell state between operations
    Waiting,
    /// Preparing for / parked in deep sleep
    Sleep,
    /// Resuming from sleep
    Wakeup,
}
