//! Climate module on the I2C bus.
//!
//! Four sensors share I2C1:
//!
//! | Chip | Address | Quantity |
//! |---|---|---|
//! | TMP112 | 0x48 | temperature |
//! | SHT20 | 0x40 | relative humidity |
//! | OPT3001 | 0x44 | illuminance |
//! | MPL3115A2 | 0x60 | barometric pressure |
//!
//! Humidity, illuminance and pressure run one-shot conversions so the chips
//! sleep between updates. One update triggers all three, waits for the
//! slowest, then reads every result. The TMP112 converts continuously and is
//! read directly.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use meteo_node::climate::Climate;

const TMP112_ADDR: u8 = 0x48;
const TMP112_TEMPERATURE: u8 = 0x00;

const SHT20_ADDR: u8 = 0x40;
/// Trigger humidity measurement, no hold master.
const SHT20_MEASURE_RH: u8 = 0xF5;

const OPT3001_ADDR: u8 = 0x44;
const OPT3001_RESULT: u8 = 0x00;
const OPT3001_CONFIG: u8 = 0x01;
/// Automatic full scale, 100 ms conversion, single shot.
const OPT3001_SINGLE_SHOT: [u8; 2] = [0xC2, 0x10];

const MPL3115A2_ADDR: u8 = 0x60;
const MPL3115A2_OUT_P_MSB: u8 = 0x01;
const MPL3115A2_CTRL_REG1: u8 = 0x26;
/// Barometer mode, 16x oversampling, one-shot trigger.
const MPL3115A2_ONE_SHOT: u8 = 0x22;

/// Longest conversion of the triggered sensors (OPT3001, 100 ms) plus margin.
const CONVERSION_MS: u32 = 110;

/// Climate sensors of the node, last good value per quantity.
pub struct ClimateModule<I, D> {
    i2c: I,
    delay: D,
    temperature: Option<f32>,
    humidity: Option<f32>,
    illuminance: Option<f32>,
    pressure: Option<f32>,
}

impl<I, D, E> ClimateModule<I, D>
where
    I: Read<Error = E> + Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    /// Creates the driver. No bus traffic happens until the first update.
    ///
    /// # Arguments
    ///
    /// * `i2c` - Bus the climate module is attached to
    /// * `delay` - Blocking delay used while conversions run
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            temperature: None,
            humidity: None,
            illuminance: None,
            pressure: None,
        }
    }

    fn trigger(&mut self) -> Result<(), E> {
        self.i2c.write(SHT20_ADDR, &[SHT20_MEASURE_RH])?;
        self.i2c.write(
            OPT3001_ADDR,
            &[OPT3001_CONFIG, OPT3001_SINGLE_SHOT[0], OPT3001_SINGLE_SHOT[1]],
        )?;
        self.i2c
            .write(MPL3115A2_ADDR, &[MPL3115A2_CTRL_REG1, MPL3115A2_ONE_SHOT])
    }

    fn read_temperature(&mut self) -> Result<f32, E> {
        let mut raw = [0; 2];
        self.i2c
            .write_read(TMP112_ADDR, &[TMP112_TEMPERATURE], &mut raw)?;
        // 12-bit two's complement, left aligned, 0.0625 degC per LSB.
        Ok(f32::from(i16::from_be_bytes(raw) >> 4) * 0.0625)
    }

    fn read_humidity(&mut self) -> Result<f32, E> {
        let mut raw = [0; 3];
        self.i2c.read(SHT20_ADDR, &mut raw)?;
        // Two status bits in the LSB, CRC in the third byte.
        let ticks = u16::from_be_bytes([raw[0], raw[1]]) & !0x0003;
        Ok(-6.0 + 125.0 * f32::from(ticks) / 65536.0)
    }

    fn read_illuminance(&mut self) -> Result<f32, E> {
        let mut raw = [0; 2];
        self.i2c
            .write_read(OPT3001_ADDR, &[OPT3001_RESULT], &mut raw)?;
        let raw = u16::from_be_bytes(raw);
        let exponent = raw >> 12;
        let mantissa = raw & 0x0FFF;
        Ok(0.01 * f32::from(1u16 << exponent) * f32::from(mantissa))
    }

    fn read_pressure(&mut self) -> Result<f32, E> {
        let mut raw = [0; 3];
        self.i2c
            .write_read(MPL3115A2_ADDR, &[MPL3115A2_OUT_P_MSB], &mut raw)?;
        // Unsigned Q18.2 Pascal, left aligned in 20 bits.
        let quarter_pa = (u32::from(raw[0]) << 12) | (u32::from(raw[1]) << 4) | (u32::from(raw[2]) >> 4);
        Ok(quarter_pa as f32 / 4.0)
    }
}

impl<I, D, E> Climate for ClimateModule<I, D>
where
    I: Read<Error = E> + Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
{
    fn update(&mut self) -> bool {
        if self.trigger().is_err() {
            #[cfg(feature = "debug-mode")]
            defmt::warn!("climate: trigger failed");
            return false;
        }
        self.delay.delay_ms(CONVERSION_MS);

        let temperature = self.read_temperature().ok();
        let humidity = self.read_humidity().ok();
        let illuminance = self.read_illuminance().ok();
        let pressure = self.read_pressure().ok();

        let complete =
            temperature.is_some() && humidity.is_some() && illuminance.is_some() && pressure.is_some();

        self.temperature = temperature.or(self.temperature);
        self.humidity = humidity.or(self.humidity);
        self.illuminance = illuminance.or(self.illuminance);
        self.pressure = pressure.or(self.pressure);

        complete
    }

    fn temperature_celsius(&self) -> Option<f32> {
        self.temperature
    }

    fn humidity_percentage(&self) -> Option<f32> {
        self.humidity
    }

    fn illuminance_lux(&self) -> Option<f32> {
        self.illuminance
    }

    fn pressure_pascal(&self) -> Option<f32> {
        self.pressure
    }
}
