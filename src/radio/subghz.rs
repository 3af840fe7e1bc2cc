//! Sub-GHz transceiver driver (SX126x-class part)
//!
//! Implements [`Transceiver`] over the register/opcode map of an
//! SX126x-class sub-GHz LoRa transceiver, used for the EU868/US915/AS923
//! band plans (§4.5 step 2 picks the sub-GHz radio whenever
//! `usingIsm2400` is false).

use embedded_hal::{
    blocking::delay::DelayMs,
    blocking::spi::{Transfer, Write},
    digital::v2::{InputPin, OutputPin},
};

use crate::radio::traits::{ModulationParams, RxConfig, Transceiver, TxConfig};

mod opcodes {
    pub const SET_SLEEP: u8 = 0x84;
    pub const SET_STANDBY: u8 = 0x80;
    pub const SET_REGULATOR_MODE: u8 = 0x96;
    pub const CALIBRATE: u8 = 0x89;
    pub const SET_PKT_TYPE: u8 = 0x8A;
    pub const SET_DIO2_AS_RF_SWITCH_CTRL: u8 = 0x9D;
    pub const WRITE_REGISTER: u8 = 0x0D;
    pub const READ_REGISTER: u8 = 0x1D;
    pub const WRITE_BUFFER: u8 = 0x0E;
    pub const READ_BUFFER: u8 = 0x1E;
    pub const GET_IRQ_STATUS: u8 = 0x12;
    pub const CLR_IRQ_STATUS: u8 = 0x02;
    pub const GET_DEVICE_ERRORS: u8 = 0x17;
    pub const CLR_DEVICE_ERRORS: u8 = 0x07;
    pub const SET_RF_FREQUENCY: u8 = 0x86;
    pub const SET_TX_PARAMS: u8 = 0x8E;
    pub const SET_MODULATION_PARAMS: u8 = 0x8B;
    pub const SET_TX: u8 = 0x83;
    pub const SET_RX: u8 = 0x82;
}

/// Pack `modulation` into the chip's 4-byte `SetModulationParams` body
/// (spreading factor, bandwidth code, coding rate, low-data-rate
/// optimization left off).
fn pack_modulation_params(modulation: ModulationParams) -> [u8; 4] {
    let sf = modulation.spreading_factor.clamp(5, 12);
    let bw = match modulation.bandwidth {
        b if b <= 10_400 => 0x00,
        b if b <= 15_600 => 0x01,
        b if b <= 20_800 => 0x02,
        b if b <= 31_250 => 0x03,
        b if b <= 41_700 => 0x04,
        b if b <= 62_500 => 0x05,
        b if b <= 125_000 => 0x06,
        b if b <= 250_000 => 0x07,
        _ => 0x08,
    };
    let cr = modulation.coding_rate.clamp(5, 8) - 4;
    [sf, bw, cr, 0x00]
}

mod registers {
    pub const LORA_SYNC_WORD_MSB: u16 = 0x0740;
    pub const LORA_SYNC_WORD_LSB: u16 = 0x0741;
}

/// SPI/GPIO transport error for [`SubGhzTransceiver`].
#[derive(Debug)]
pub enum SubGhzError {
    /// SPI transfer error
    Spi,
    /// GPIO error
    Gpio,
    /// Busy pin never cleared within the polling budget
    Timeout,
}

/// SX126x-class sub-GHz transceiver.
pub struct SubGhzTransceiver<SPI, CS, RESET, BUSY, DIO1>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
{
    spi: SPI,
    cs: CS,
    reset: RESET,
    busy: BUSY,
    dio1: DIO1,
}

impl<SPI, CS, RESET, BUSY, DIO1> SubGhzTransceiver<SPI, CS, RESET, BUSY, DIO1>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
{
    /// Wrap the SPI bus and control pins for a sub-GHz transceiver.
    pub fn new(spi: SPI, cs: CS, reset: RESET, busy: BUSY, dio1: DIO1) -> Self {
        Self {
            spi,
            cs,
            reset,
            busy,
            dio1,
        }
    }

    fn wait_busy(&mut self) -> Result<(), SubGhzError> {
        for _ in 0..100_000 {
            if self.busy.is_low().map_err(|_| SubGhzError::Gpio)? {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(SubGhzError::Timeout)
    }
}

impl<SPI, CS, RESET, BUSY, DIO1> Transceiver for SubGhzTransceiver<SPI, CS, RESET, BUSY, DIO1>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
{
    type Error = SubGhzError;
    type BusyPin = BUSY;
    type Dio1Pin = DIO1;

    fn init(&mut self, delay: &mut impl DelayMs<u32>) -> Result<(), Self::Error> {
        self.reset(delay)?;
        self.write_command(opcodes::SET_STANDBY, &[0x00])?;
        self.write_command(opcodes::SET_PKT_TYPE, &[0x01])?;
        self.write_command(opcodes::SET_DIO2_AS_RF_SWITCH_CTRL, &[0x01])?;
        self.write_register(registers::LORA_SYNC_WORD_MSB, &[0x34, 0x44])?;
        self.write_command(opcodes::SET_REGULATOR_MODE, &[0x01])?;
        self.write_command(opcodes::CALIBRATE, &[0x7F])
    }

    fn reset(&mut self, delay: &mut impl DelayMs<u32>) -> Result<(), Self::Error> {
        self.reset.set_high().map_err(|_| SubGhzError::Gpio)?;
        delay.delay_ms(2);
        self.reset.set_low().map_err(|_| SubGhzError::Gpio)?;
        delay.delay_ms(10);
        self.wait_busy()
    }

    fn write_command(&mut self, opcode: u8, params: &[u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| SubGhzError::Gpio)?;
        self.spi.write(&[opcode]).map_err(|_| SubGhzError::Spi)?;
        if !params.is_empty() {
            self.spi.write(params).map_err(|_| SubGhzError::Spi)?;
        }
        self.cs.set_high().map_err(|_| SubGhzError::Gpio)?;
        self.wait_busy()
    }

    fn read_command(&mut self, opcode: u8, response: &mut [u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| SubGhzError::Gpio)?;
        self.spi.write(&[opcode]).map_err(|_| SubGhzError::Spi)?;
        self.spi.write(&[0]).map_err(|_| SubGhzError::Spi)?;
        if !response.is_empty() {
            self.spi.transfer(response).map_err(|_| SubGhzError::Spi)?;
        }
        self.cs.set_high().map_err(|_| SubGhzError::Gpio)?;
        self.wait_busy()
    }

    fn write_register(&mut self, addr: u16, value: &[u8]) -> Result<(), Self::Error> {
        let addr_bytes = [(addr >> 8) as u8, addr as u8];
        self.cs.set_low().map_err(|_| SubGhzError::Gpio)?;
        self.spi
            .write(&[opcodes::WRITE_REGISTER])
            .map_err(|_| SubGhzError::Spi)?;
        self.spi.write(&addr_bytes).map_err(|_| SubGhzError::Spi)?;
        self.spi.write(value).map_err(|_| SubGhzError::Spi)?;
        self.cs.set_high().map_err(|_| SubGhzError::Gpio)?;
        self.wait_busy()
    }

    fn read_register(&mut self, addr: u16, value: &mut [u8]) -> Result<(), Self::Error> {
        let addr_bytes = [(addr >> 8) as u8, addr as u8];
        self.cs.set_low().map_err(|_| SubGhzError::Gpio)?;
        self.spi
            .write(&[opcodes::READ_REGISTER])
            .map_err(|_| SubGhzError::Spi)?;
        self.spi.write(&addr_bytes).map_err(|_| SubGhzError::Spi)?;
        self.spi.write(&[0]).map_err(|_| SubGhzError::Spi)?;
        self.spi.transfer(value).map_err(|_| SubGhzError::Spi)?;
        self.cs.set_high().map_err(|_| SubGhzError::Gpio)?;
        self.wait_busy()
    }

    fn write_buffer(&mut self, offset: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| SubGhzError::Gpio)?;
        self.spi
            .write(&[opcodes::WRITE_BUFFER, offset])
            .map_err(|_| SubGhzError::Spi)?;
        self.spi.write(data).map_err(|_| SubGhzError::Spi)?;
        self.cs.set_high().map_err(|_| SubGhzError::Gpio)?;
        self.wait_busy()
    }

    fn read_buffer(&mut self, offset: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| SubGhzError::Gpio)?;
        self.spi
            .write(&[opcodes::READ_BUFFER, offset])
            .map_err(|_| SubGhzError::Spi)?;
        self.spi.write(&[0]).map_err(|_| SubGhzError::Spi)?;
        self.spi.transfer(data).map_err(|_| SubGhzError::Spi)?;
        self.cs.set_high().map_err(|_| SubGhzError::Gpio)?;
        self.wait_busy()
    }

    fn busy_pin(&mut self) -> &mut Self::BusyPin {
        &mut self.busy
    }

    fn dio1_pin(&mut self) -> &mut Self::Dio1Pin {
        &mut self.dio1
    }

    fn is_error(&mut self) -> Result<bool, Self::Error> {
        let mut errors = [0u8; 2];
        self.read_command(opcodes::GET_DEVICE_ERRORS, &mut errors)?;
        let any_error = errors[0] != 0 || errors[1] != 0;
        if any_error {
            self.write_command(opcodes::CLR_DEVICE_ERRORS, &[0x00, 0x00])?;
        }
        Ok(any_error)
    }

    fn set_standby(&mut self) -> Result<(), Self::Error> {
        self.write_command(opcodes::SET_STANDBY, &[0x00])
    }

    fn set_sleep(&mut self) -> Result<(), Self::Error> {
        self.write_command(opcodes::SET_SLEEP, &[0x04])
    }

    fn irq_status(&mut self) -> Result<u16, Self::Error> {
        let mut status = [0u8; 2];
        self.read_command(opcodes::GET_IRQ_STATUS, &mut status)?;
        Ok(u16::from_be_bytes(status))
    }

    fn clear_irq(&mut self) -> Result<(), Self::Error> {
        self.write_command(opcodes::CLR_IRQ_STATUS, &[0xFF, 0xFF])
    }

    fn configure_tx(&mut self, config: TxConfig) -> Result<(), Self::Error> {
        let freq_steps = ((config.frequency as u64) << 25) / 32_000_000;
        let freq_bytes = (freq_steps as u32).to_be_bytes();
        self.write_command(opcodes::SET_RF_FREQUENCY, &freq_bytes)?;
        let power = config.power.clamp(2, 22) as u8;
        self.write_command(opcodes::SET_TX_PARAMS, &[power, 0x04])?;
        self.write_command(
            opcodes::SET_MODULATION_PARAMS,
            &pack_modulation_params(config.modulation),
        )?;
        self.write_command(opcodes::SET_TX, &[0x00, 0x00, 0x00])
    }

    fn configure_rx(&mut self, config: RxConfig) -> Result<(), Self::Error> {
        let freq_steps = ((config.frequency as u64) << 25) / 32_000_000;
        let freq_bytes = (freq_steps as u32).to_be_bytes();
        self.write_command(opcodes::SET_RF_FREQUENCY, &freq_bytes)?;
        self.write_command(
            opcodes::SET_MODULATION_PARAMS,
            &pack_modulation_params(config.modulation),
        )?;
        let timeout_steps = config.timeout_ms.saturating_mul(64);
        let timeout_bytes = timeout_steps.to_be_bytes();
        self.write_command(opcodes::SET_RX, &timeout_bytes[1..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct StubPin(bool);
    impl InputPin for StubPin {
        type Error = Infallible;
        fn is_high(&self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }
        fn is_low(&self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }
    impl OutputPin for StubPin {
        type Error = Infallible;
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0 = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0 = true;
            Ok(())
        }
    }

    struct StubSpi;
    impl Write<u8> for StubSpi {
        type Error = Infallible;
        fn write(&mut self, _words: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }
    }
    impl Transfer<u8> for StubSpi {
        type Error = Infallible;
        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
            words.fill(0);
            Ok(words)
        }
    }
    struct StubDelay;
    impl embedded_hal::blocking::delay::DelayMs<u32> for StubDelay {
        fn delay_ms(&mut self, _ms: u32) {}
    }

    fn radio() -> SubGhzTransceiver<StubSpi, StubPin, StubPin, StubPin, StubPin> {
        SubGhzTransceiver::new(
            StubSpi,
            StubPin::default(),
            StubPin::default(),
            StubPin(false), // busy pin reads low: ready immediately
            StubPin::default(),
        )
    }

    #[test]
    fn pack_modulation_params_clamps_and_maps_bandwidth() {
        let bytes = pack_modulation_params(ModulationParams {
            spreading_factor: 12,
            bandwidth: 125_000,
            coding_rate: 5,
        });
        assert_eq!(bytes, [12, 0x06, 1, 0x00]);
    }

    #[test]
    fn configure_tx_drives_frequency_power_and_tx_opcodes() {
        let mut radio = radio();
        radio
            .configure_tx(TxConfig {
                frequency: 868_100_000,
                power: 14,
                modulation: ModulationParams {
                    spreading_factor: 7,
                    bandwidth: 125_000,
                    coding_rate: 5,
                },
            })
            .unwrap();
    }

    #[test]
    fn init_resets_then_configures_packet_type_and_sync_word() {
        let mut radio = radio();
        let mut delay = StubDelay;
        radio.init(&mut delay).unwrap();
    }

    #[test]
    fn configure_rx_drives_frequency_and_rx_opcode() {
        let mut radio = radio();
        radio
            .configure_rx(RxConfig {
                frequency: 868_100_000,
                timeout_ms: 3_000,
                modulation: ModulationParams {
                    spreading_factor: 7,
                    bandwidth: 125_000,
                    coding_rate: 5,
                },
            })
            .unwrap();
    }
}
