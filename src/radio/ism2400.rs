//! 2.4 GHz ISM transceiver driver (SX1280-class part)
//!
//! Implements [`Transceiver`] over an SX1280-class part's register/opcode
//! map. The 2.4 GHz ISM band plan is global (no regional sub-bands), so
//! this driver is selected whenever `usingIsm2400` is true (§4.5 step 2)
//! regardless of the sub-GHz region configured for the other radio.
//!
//! Opcode names follow the SX128x datasheet convention (DS.SX1280-1.W.APP),
//! distinct from the SX126x command set the sub-GHz driver uses even where
//! the operation is conceptually the same.

use embedded_hal::{
    blocking::delay::DelayMs,
    blocking::spi::{Transfer, Write},
    digital::v2::{InputPin, OutputPin},
};

use crate::radio::traits::{ModulationParams, RxConfig, Transceiver, TxConfig};

mod opcodes {
    pub const SET_SLEEP: u8 = 0x84;
    pub const SET_STANDBY: u8 = 0x80;
    pub const SET_PACKET_TYPE: u8 = 0x8A;
    pub const SET_REGULATOR_MODE: u8 = 0x96;
    pub const CALIBRATE: u8 = 0x89;
    pub const WRITE_REGISTER: u8 = 0x18;
    pub const READ_REGISTER: u8 = 0x19;
    pub const WRITE_BUFFER: u8 = 0x1A;
    pub const READ_BUFFER: u8 = 0x1B;
    pub const GET_IRQ_STATUS: u8 = 0x15;
    pub const CLR_IRQ_STATUS: u8 = 0x97;
    pub const GET_STATUS: u8 = 0xC0;
    pub const SET_RF_FREQUENCY: u8 = 0x86;
    pub const SET_TX_PARAMS: u8 = 0x8E;
    pub const SET_MODULATION_PARAMS: u8 = 0x8B;
    pub const SET_TX: u8 = 0x83;
    pub const SET_RX: u8 = 0x82;
}

/// Pack `modulation` into the chip's 3-byte `SetModulationParams` body.
/// The SX1280 family reverses the spreading-factor encoding relative to
/// the sub-GHz part (high nibble rather than the raw SF number) per its
/// datasheet's mod-param-1 table.
fn pack_modulation_params(modulation: ModulationParams) -> [u8; 3] {
    let sf = modulation.spreading_factor.clamp(5, 12);
    let sf_code = sf << 4;
    let bw = match modulation.bandwidth {
        b if b <= 203_125 => 0x34,
        b if b <= 406_250 => 0x26,
        b if b <= 812_500 => 0x18,
        _ => 0x0A,
    };
    let cr = modulation.coding_rate.clamp(5, 8) - 4;
    [sf_code, bw, cr]
}

/// SPI/GPIO transport error for [`Ism2400Transceiver`].
#[derive(Debug)]
pub enum Ism2400Error {
    /// SPI transfer error
    Spi,
    /// GPIO error
    Gpio,
    /// Busy pin never cleared within the polling budget
    Timeout,
}

/// SX1280-class 2.4 GHz ISM transceiver.
pub struct Ism2400Transceiver<SPI, CS, RESET, BUSY, DIO1>
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

impl<SPI, CS, RESET, BUSY, DIO1> Ism2400Transceiver<SPI, CS, RESET, BUSY, DIO1>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
{
    /// Wrap the SPI bus and control pins for a 2.4 GHz ISM transceiver.
    pub fn new(spi: SPI, cs: CS, reset: RESET, busy: BUSY, dio1: DIO1) -> Self {
        Self {
            spi,
            cs,
            reset,
            busy,
            dio1,
        }
    }

    fn wait_busy(&mut self) -> Result<(), Ism2400Error> {
        for _ in 0..100_000 {
            if self.busy.is_low().map_err(|_| Ism2400Error::Gpio)? {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(Ism2400Error::Timeout)
    }
}

impl<SPI, CS, RESET, BUSY, DIO1> Transceiver for Ism2400Transceiver<SPI, CS, RESET, BUSY, DIO1>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
{
    type Error = Ism2400Error;
    type BusyPin = BUSY;
    type Dio1Pin = DIO1;

    fn init(&mut self, delay: &mut impl DelayMs<u32>) -> Result<(), Self::Error> {
        self.reset(delay)?;
        self.write_command(opcodes::SET_STANDBY, &[0x00])?;
        self.write_command(opcodes::SET_PACKET_TYPE, &[0x01])?;
        self.write_command(opcodes::SET_REGULATOR_MODE, &[0x01])?;
        self.write_command(opcodes::CALIBRATE, &[0x7F])
    }

    fn reset(&mut self, delay: &mut impl DelayMs<u32>) -> Result<(), Self::Error> {
        self.reset.set_high().map_err(|_| Ism2400Error::Gpio)?;
        delay.delay_ms(2);
        self.reset.set_low().map_err(|_| Ism2400Error::Gpio)?;
        delay.delay_ms(10);
        self.wait_busy()
    }

    fn write_command(&mut self, opcode: u8, params: &[u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| Ism2400Error::Gpio)?;
        self.spi.write(&[opcode]).map_err(|_| Ism2400Error::Spi)?;
        if !params.is_empty() {
            self.spi.write(params).map_err(|_| Ism2400Error::Spi)?;
        }
        self.cs.set_high().map_err(|_| Ism2400Error::Gpio)?;
        self.wait_busy()
    }

    fn read_command(&mut self, opcode: u8, response: &mut [u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| Ism2400Error::Gpio)?;
        self.spi.write(&[opcode]).map_err(|_| Ism2400Error::Spi)?;
        self.spi.write(&[0]).map_err(|_| Ism2400Error::Spi)?;
        if !response.is_empty() {
            self.spi
                .transfer(response)
                .map_err(|_| Ism2400Error::Spi)?;
        }
        self.cs.set_high().map_err(|_| Ism2400Error::Gpio)?;
        self.wait_busy()
    }

    fn write_register(&mut self, addr: u16, value: &[u8]) -> Result<(), Self::Error> {
        let addr_bytes = [(addr >> 8) as u8, addr as u8];
        self.cs.set_low().map_err(|_| Ism2400Error::Gpio)?;
        self.spi
            .write(&[opcodes::WRITE_REGISTER])
            .map_err(|_| Ism2400Error::Spi)?;
        self.spi.write(&addr_bytes).map_err(|_| Ism2400Error::Spi)?;
        self.spi.write(value).map_err(|_| Ism2400Error::Spi)?;
        self.cs.set_high().map_err(|_| Ism2400Error::Gpio)?;
        self.wait_busy()
    }

    fn read_register(&mut self, addr: u16, value: &mut [u8]) -> Result<(), Self::Error> {
        let addr_bytes = [(addr >> 8) as u8, addr as u8];
        self.cs.set_low().map_err(|_| Ism2400Error::Gpio)?;
        self.spi
            .write(&[opcodes::READ_REGISTER])
            .map_err(|_| Ism2400Error::Spi)?;
        self.spi.write(&addr_bytes).map_err(|_| Ism2400Error::Spi)?;
        self.spi.write(&[0]).map_err(|_| Ism2400Error::Spi)?;
        self.spi.transfer(value).map_err(|_| Ism2400Error::Spi)?;
        self.cs.set_high().map_err(|_| Ism2400Error::Gpio)?;
        self.wait_busy()
    }

    fn write_buffer(&mut self, offset: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| Ism2400Error::Gpio)?;
        self.spi
            .write(&[opcodes::WRITE_BUFFER, offset])
            .map_err(|_| Ism2400Error::Spi)?;
        self.spi.write(data).map_err(|_| Ism2400Error::Spi)?;
        self.cs.set_high().map_err(|_| Ism2400Error::Gpio)?;
        self.wait_busy()
    }

    fn read_buffer(&mut self, offset: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| Ism2400Error::Gpio)?;
        self.spi
            .write(&[opcodes::READ_BUFFER, offset])
            .map_err(|_| Ism2400Error::Spi)?;
        self.spi.write(&[0]).map_err(|_| Ism2400Error::Spi)?;
        self.spi.transfer(data).map_err(|_| Ism2400Error::Spi)?;
        self.cs.set_high().map_err(|_| Ism2400Error::Gpio)?;
        self.wait_busy()
    }

    fn busy_pin(&mut self) -> &mut Self::BusyPin {
        &mut self.busy
    }

    fn dio1_pin(&mut self) -> &mut Self::Dio1Pin {
        &mut self.dio1
    }

    fn is_error(&mut self) -> Result<bool, Self::Error> {
        let mut status = [0u8];
        self.read_command(opcodes::GET_STATUS, &mut status)?;
        let chip_mode = (status[0] >> 5) & 0x07;
        Ok(chip_mode == 0)
    }

    fn set_standby(&mut self) -> Result<(), Self::Error> {
        self.write_command(opcodes::SET_STANDBY, &[0x00])
    }

    fn set_sleep(&mut self) -> Result<(), Self::Error> {
        self.write_command(opcodes::SET_SLEEP, &[0x01])
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
        let freq_steps = ((config.frequency as u64) << 18) / 52_000_000;
        let freq_bytes = (freq_steps as u32).to_be_bytes();
        self.write_command(opcodes::SET_RF_FREQUENCY, &freq_bytes[1..4])?;
        let power = config.power.clamp(-18, 13) as u8;
        self.write_command(opcodes::SET_TX_PARAMS, &[power, 0xE0])?;
        self.write_command(
            opcodes::SET_MODULATION_PARAMS,
            &pack_modulation_params(config.modulation),
        )?;
        self.write_command(opcodes::SET_TX, &[0x00, 0x00, 0x00])
    }

    fn configure_rx(&mut self, config: RxConfig) -> Result<(), Self::Error> {
        let freq_steps = ((config.frequency as u64) << 18) / 52_000_000;
        let freq_bytes = (freq_steps as u32).to_be_bytes();
        self.write_command(opcodes::SET_RF_FREQUENCY, &freq_bytes[1..4])?;
        self.write_command(
            opcodes::SET_MODULATION_PARAMS,
            &pack_modulation_params(config.modulation),
        )?;
        let timeout_steps = (config.timeout_ms.saturating_mul(1000) / 15) as u32;
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

    fn radio() -> Ism2400Transceiver<StubSpi, StubPin, StubPin, StubPin, StubPin> {
        Ism2400Transceiver::new(
            StubSpi,
            StubPin::default(),
            StubPin::default(),
            StubPin(false),
            StubPin::default(),
        )
    }

    #[test]
    fn pack_modulation_params_reverses_spreading_factor_nibble() {
        let bytes = pack_modulation_params(ModulationParams {
            spreading_factor: 7,
            bandwidth: 203_125,
            coding_rate: 5,
        });
        assert_eq!(bytes, [0x70, 0x34, 1]);
    }

    #[test]
    fn configure_tx_drives_frequency_power_and_tx_opcodes() {
        let mut radio = radio();
        radio
            .configure_tx(TxConfig {
                frequency: 2_400_000_000,
                power: 10,
                modulation: ModulationParams {
                    spreading_factor: 7,
                    bandwidth: 203_125,
                    coding_rate: 5,
                },
            })
            .unwrap();
    }

    #[test]
    fn configure_rx_drives_frequency_and_rx_opcode() {
        let mut radio = radio();
        radio
            .configure_rx(RxConfig {
                frequency: 2_400_000_000,
                timeout_ms: 1_000,
                modulation: ModulationParams {
                    spreading_factor: 7,
                    bandwidth: 203_125,
                    coding_rate: 5,
                },
            })
            .unwrap();
    }

    #[test]
    fn init_resets_then_configures_packet_type() {
        let mut radio = radio();
        let mut delay = StubDelay;
        radio.init(&mut delay).unwrap();
    }
}
