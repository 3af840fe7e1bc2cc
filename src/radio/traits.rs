//! The `Transceiver` capability trait
//!
//! A high-level `transmit`/`receive` surface tied to one chip family
//! isn't enough here: the link controller needs to drive two unrelated
//! chip families (a sub-GHz part and a 2.4 GHz ISM part) through the
//! same DIO-dispatch and radio-selector machinery (§4.2), so the trait
//! is pushed down to the primitive register/command/buffer operations
//! both families share, and the state machine builds transmit/receive on
//! top of it the same way for either radio.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::InputPin;

/// Primitive operations a LoRa transceiver exposes over SPI, common to
/// both the sub-GHz and ISM2400 chip families this crate drives.
///
/// An implementation owns its SPI bus, NSS/reset/busy/DIO1 pins, and
/// whatever settling delays its datasheet calls for; the DIO dispatcher
/// (§4.2) and radio selector (§4.2) only ever see this trait.
pub trait Transceiver {
    /// SPI/GPIO transport error type
    type Error;
    /// Busy-pin type (driven low by the chip while it is processing a
    /// command; the HAL polls this instead of fixed delays where possible)
    type BusyPin: InputPin;
    /// DIO1 interrupt pin type (asserted on TxDone/RxDone/Timeout/error)
    type Dio1Pin: InputPin;

    /// Bring the chip out of reset and into a known (standby) state.
    fn init(&mut self, delay: &mut impl DelayMs<u32>) -> Result<(), Self::Error>;

    /// Pulse the hardware reset line.
    fn reset(&mut self, delay: &mut impl DelayMs<u32>) -> Result<(), Self::Error>;

    /// Send an opcode-prefixed command with no expected response payload.
    fn write_command(&mut self, opcode: u8, params: &[u8]) -> Result<(), Self::Error>;

    /// Send an opcode-prefixed command and read back its response payload.
    fn read_command(&mut self, opcode: u8, response: &mut [u8]) -> Result<(), Self::Error>;

    /// Write one register.
    fn write_register(&mut self, addr: u16, value: &[u8]) -> Result<(), Self::Error>;

    /// Read one register.
    fn read_register(&mut self, addr: u16, value: &mut [u8]) -> Result<(), Self::Error>;

    /// Write into the chip's internal TX/RX data buffer at `offset`.
    fn write_buffer(&mut self, offset: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read from the chip's internal TX/RX data buffer at `offset`.
    fn read_buffer(&mut self, offset: u8, data: &mut [u8]) -> Result<(), Self::Error>;

    /// Borrow the busy pin (callers poll this instead of fixed delays
    /// wherever the datasheet allows it).
    fn busy_pin(&mut self) -> &mut Self::BusyPin;

    /// Borrow the DIO1 interrupt pin.
    fn dio1_pin(&mut self) -> &mut Self::Dio1Pin;

    /// Has the chip latched a hardware error since the last clear?
    fn is_error(&mut self) -> Result<bool, Self::Error>;

    /// Put the chip in standby (ready, low current, register contents
    /// retained).
    fn set_standby(&mut self) -> Result<(), Self::Error>;

    /// Put the chip in its lowest-power sleep mode.
    fn set_sleep(&mut self) -> Result<(), Self::Error>;

    /// Read the chip's raw IRQ status bitmask (DIO1 cause).
    fn irq_status(&mut self) -> Result<u16, Self::Error>;

    /// Clear all latched IRQ flags (deasserts DIO1).
    fn clear_irq(&mut self) -> Result<(), Self::Error>;

    /// Set frequency, output power, and LoRa modulation, then start
    /// transmitting whatever is already loaded into the TX buffer (§4.5
    /// `Send`/`SendWaiting`, driven by the radio selector's active chip).
    fn configure_tx(&mut self, config: TxConfig) -> Result<(), Self::Error>;

    /// Set frequency and LoRa modulation, then arm reception with the
    /// given timeout (§4.5 RX1/RX2 windows).
    fn configure_rx(&mut self, config: RxConfig) -> Result<(), Self::Error>;
}

/// Radio modulation parameters shared by both chip families' configuration
/// commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationParams {
    /// Spreading factor (7-12)
    pub spreading_factor: u8,
    /// Bandwidth in Hz
    pub bandwidth: u32,
    /// Coding rate (4/5, 4/6, 4/7, 4/8)
    pub coding_rate: u8,
}

/// Transmit configuration passed down to a [`Transceiver`] implementation
/// by the radio selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TxConfig {
    /// Frequency in Hz
    pub frequency: u32,
    /// Output power in dBm
    pub power: i8,
    /// Modulation parameters
    pub modulation: ModulationParams,
}

/// Receive configuration passed down to a [`Transceiver`] implementation
/// by the radio selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxConfig {
    /// Frequency in Hz
    pub frequency: u32,
    /// Timeout in milliseconds
    pub timeout_ms: u32,
    /// Modulation parameters
    pub modulation: ModulationParams,
}
