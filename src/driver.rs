use crate::register::{Field, Register};
use crate::types::{
    Calibration, CalibrationStatus, Channel, Gain, Ldo, NAU7802InitConfig, SampleRate,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};

const POLL_INTERVAL_MS: u32 = 1;
const RESET_HOLD_MS: u32 = 1;
const POWER_UP_TIMEOUT_MS: u32 = 100;
const AVERAGE_TIMEOUT_MS: u32 = 1000;
/// Calibration typically takes 344ms.
pub const DEFAULT_CALIBRATION_TIMEOUT_MS: u32 = 1000;
/// Turns the ADC clock chopper off, part of the datasheet power-on sequence.
const ADC_CLK_CHP_OFF: u8 = 0x30;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NAU7802Error<I2C> {
    Connect,
    I2c(I2C),
    PowerUpTimeout,
    CalibrationTimeout,
    CalibrationFailed,
    AverageTimeout,
    InvalidSampleCount,
    ZeroCalibrationFactor,
    ZeroKnownWeight,
}

pub struct NAU7802Driver<I2C, Delay> {
    i2c: I2C,
    delay: Delay,
    address: u8,
    calibration: Calibration,
    elapsed_us: u64,
}

impl<I2C, Delay> NAU7802Driver<I2C, Delay>
where
    I2C: I2c,
    Delay: DelayNs,
{
    ///
    ///
    /// # Arguments
    ///
    /// * `i2c`: The i2c bus.
    /// * `delay`: Used for the 1ms polling interval and the reset hold.
    /// * `address`: The 7-bit device address, normally [`crate::DEFAULT_ADDRESS`].
    /// * `init_config`: An optional config that resets, powers up, configures and calibrates the
    /// NAU7802. If this is not provided, only the connection is checked and all initialization
    /// will need to be done manually.
    ///
    /// returns: Result<NAU7802Driver<I2C, Delay>, NAU7802Error<<I2C as ErrorType>::Error>>
    pub fn new(
        i2c: I2C,
        delay: Delay,
        address: u8,
        init_config: Option<NAU7802InitConfig>,
    ) -> Result<Self, NAU7802Error<I2C::Error>> {
        let mut driver = Self {
            i2c,
            delay,
            address,
            calibration: Calibration::default(),
            elapsed_us: 0,
        };

        driver.connect()?;

        if let Some(config) = init_config {
            driver.reset()?;
            driver.power_up()?;
            driver.set_ldo(config.ldo)?;
            driver.set_gain(config.gain)?;
            driver.set_sample_rate(config.sample_rate)?;
            driver.write(Register::Adc, ADC_CLK_CHP_OFF)?;
            // 330pF decoupling cap on channel 2
            driver.set_bit(Field::PGA_CAP_ENABLE)?;
            driver.calibrate_afe()?;
            debug!("NAU7802 at {:#04x} initialized", address);
        }

        Ok(driver)
    }

    /// Checks that the device acks, trying a second time before giving up. A busy NAU7802 can
    /// occasionally miss one.
    pub fn connect(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        if self.is_connected() {
            return Ok(());
        }

        warn!("NAU7802 at {:#04x} did not ack, retrying", self.address);
        if self.is_connected() {
            Ok(())
        } else {
            Err(NAU7802Error::Connect)
        }
    }

    pub fn is_connected(&mut self) -> bool {
        self.read(Register::DeviceRev).is_ok()
    }

    /// Returns every register to its power-on default.
    pub fn reset(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        self.set_bit(Field::RESET)?;
        self.sleep_ms(RESET_HOLD_MS);
        self.clear_bit(Field::RESET)
    }

    /// Powers up the digital and analog sections and waits up to 100ms for the power-up ready
    /// bit.
    pub fn power_up(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        // Both enables are always attempted
        let digital = self.set_bit(Field::POWER_UP_DIGITAL);
        let analog = self.set_bit(Field::POWER_UP_ANALOG);
        digital.and(analog)?;

        let ready = self.poll_until(Some(POWER_UP_TIMEOUT_MS), |driver| {
            Ok(driver.get_bit(Field::POWER_UP_READY)?.then_some(()))
        })?;

        ready.ok_or_else(|| {
            warn!("NAU7802 power up timed out after {}ms", POWER_UP_TIMEOUT_MS);
            NAU7802Error::PowerUpTimeout
        })
    }

    /// Puts the NAU7802 into its low-power state. The analog clear is issued even if the
    /// digital one fails; the first error is reported.
    pub fn power_down(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        let digital = self.clear_bit(Field::POWER_UP_DIGITAL);
        let analog = self.clear_bit(Field::POWER_UP_ANALOG);
        digital.and(analog)
    }

    /// Sets the LDO voltage and switches AVDD over to the internal LDO.
    pub fn set_ldo(&mut self, ldo: Ldo) -> Result<(), NAU7802Error<I2C::Error>> {
        self.write_field(Field::LDO_VOLTAGE, ldo as u8)?;
        self.set_bit(Field::AVDD_SOURCE)
    }

    pub fn set_gain(&mut self, gain: Gain) -> Result<(), NAU7802Error<I2C::Error>> {
        self.write_field(Field::GAIN, gain as u8)
    }

    pub fn set_sample_rate(&mut self, rate: SampleRate) -> Result<(), NAU7802Error<I2C::Error>> {
        self.write_field(Field::SAMPLE_RATE, rate as u8)
    }

    pub fn set_channel(&mut self, channel: Channel) -> Result<(), NAU7802Error<I2C::Error>> {
        match channel {
            Channel::Channel1 => self.clear_bit(Field::CHANNEL),
            Channel::Channel2 => self.set_bit(Field::CHANNEL),
        }
    }

    /// DRDY pin is high while a sample is ready (power-on default).
    pub fn set_int_polarity_high(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        self.clear_bit(Field::READY_POLARITY)
    }

    /// DRDY pin is low while a sample is ready.
    pub fn set_int_polarity_low(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        self.set_bit(Field::READY_POLARITY)
    }

    pub fn revision_code(&mut self) -> Result<u8, NAU7802Error<I2C::Error>> {
        self.read_field(Field::REVISION_ID)
    }

    /// Calibrates the analog front end and waits for it to finish. Should be repeated whenever
    /// the gain, sample rate or channel changes.
    pub fn calibrate_afe(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        self.begin_calibrate_afe()?;
        self.wait_for_calibrate_afe(DEFAULT_CALIBRATION_TIMEOUT_MS)
    }

    /// Starts an AFE calibration without waiting. Follow up with [`Self::cal_afe_status`] or
    /// [`Self::wait_for_calibrate_afe`].
    pub fn begin_calibrate_afe(&mut self) -> Result<(), NAU7802Error<I2C::Error>> {
        self.set_bit(Field::CAL_START)
    }

    pub fn cal_afe_status(&mut self) -> Result<CalibrationStatus, NAU7802Error<I2C::Error>> {
        let ctrl2 = self.read(Register::Ctrl2)?;

        // CALS stays set until the chip is done, so it wins over a stale CAL_ERR
        Ok(if Field::CAL_START.extract(ctrl2) != 0 {
            CalibrationStatus::InProgress
        } else if Field::CAL_ERROR.extract(ctrl2) != 0 {
            CalibrationStatus::Failure
        } else {
            CalibrationStatus::Success
        })
    }

    /// Polls the calibration status every millisecond. A `timeout_ms` of 0 waits forever.
    pub fn wait_for_calibrate_afe(
        &mut self,
        timeout_ms: u32,
    ) -> Result<(), NAU7802Error<I2C::Error>> {
        let timeout = (timeout_ms > 0).then_some(timeout_ms);
        let status = self.poll_until(timeout, |driver| {
            Ok(match driver.cal_afe_status()? {
                CalibrationStatus::InProgress => None,
                done => Some(done),
            })
        })?;

        match status {
            Some(CalibrationStatus::Success) => {
                debug!("NAU7802 AFE calibration done");
                Ok(())
            }
            Some(_) => {
                warn!("NAU7802 AFE calibration reported an error");
                Err(NAU7802Error::CalibrationFailed)
            }
            None => {
                warn!("NAU7802 AFE calibration timed out after {}ms", timeout_ms);
                Err(NAU7802Error::CalibrationTimeout)
            }
        }
    }

    /// True once per finished conversion.
    pub fn available(&mut self) -> Result<bool, NAU7802Error<I2C::Error>> {
        self.get_bit(Field::CYCLE_READY)
    }

    /// Reads the latest 24-bit conversion. Check [`Self::available`] first.
    pub fn get_reading(&mut self) -> Result<i32, NAU7802Error<I2C::Error>> {
        let mut read_buffer = [0u8; 3];
        self.i2c
            .write_read(self.address, &[Register::AdcoB2 as u8], &mut read_buffer)
            .map_err(NAU7802Error::I2c)?;

        // Bit 23 lands on the i32 sign bit, the arithmetic shift back sign-extends it
        let [msb, mid, lsb] = read_buffer;
        let result = i32::from_be_bytes([msb, mid, lsb, 0]) >> 8;
        trace!("NAU7802 reading {}", result);

        Ok(result)
    }

    /// Averages `samples` readings. Gives up after 1000 polls' worth of 1ms sleeps whatever the
    /// sample rate, so keep `samples` within what the configured rate can deliver in that time.
    /// Bus time is not counted, so the wall-clock bound is somewhat longer.
    pub fn get_average(&mut self, samples: u8) -> Result<i32, NAU7802Error<I2C::Error>> {
        if samples == 0 {
            return Err(NAU7802Error::InvalidSampleCount);
        }

        let mut total: i64 = 0;
        let mut acquired: u8 = 0;
        let average = self.poll_until(Some(AVERAGE_TIMEOUT_MS), |driver| {
            if driver.available()? {
                total += i64::from(driver.get_reading()?);
                acquired += 1;
                if acquired == samples {
                    return Ok(Some(total / i64::from(samples)));
                }
            }
            Ok(None)
        })?;

        match average {
            Some(average) => Ok(average as i32),
            None => {
                warn!(
                    "NAU7802 averaging timed out with {}/{} samples",
                    acquired, samples
                );
                Err(NAU7802Error::AverageTimeout)
            }
        }
    }

    ///
    ///
    /// # Arguments
    ///
    /// * `allow_negative`: If false, readings below the zero offset report 0 instead of a small
    /// negative weight.
    /// * `samples`: Number of readings to average.
    ///
    /// returns: (average - zero offset) / calibration factor
    pub fn get_weight(
        &mut self,
        allow_negative: bool,
        samples: u8,
    ) -> Result<f32, NAU7802Error<I2C::Error>> {
        let Calibration {
            zero_offset,
            calibration_factor,
        } = self.calibration;
        if calibration_factor == 0.0 {
            return Err(NAU7802Error::ZeroCalibrationFactor);
        }

        let mut on_scale = self.get_average(samples)?;
        if !allow_negative && on_scale < zero_offset {
            on_scale = zero_offset;
        }

        Ok((i64::from(on_scale) - i64::from(zero_offset)) as f32 / calibration_factor)
    }

    /// Call with the scale level, warmed up and empty.
    pub fn tare(&mut self, samples: u8) -> Result<(), NAU7802Error<I2C::Error>> {
        let zero_offset = self.get_average(samples)?;
        self.calibration.zero_offset = zero_offset;
        debug!("NAU7802 zero offset {}", zero_offset);
        Ok(())
    }

    /// Call after [`Self::tare`] with `known_weight` sitting on the scale. Units are up to the
    /// caller; weights come back in the same unit.
    pub fn calibrate_with_known_weight(
        &mut self,
        known_weight: f32,
        samples: u8,
    ) -> Result<(), NAU7802Error<I2C::Error>> {
        if known_weight == 0.0 {
            return Err(NAU7802Error::ZeroKnownWeight);
        }

        let on_scale = self.get_average(samples)?;
        let calibration_factor =
            (i64::from(on_scale) - i64::from(self.calibration.zero_offset)) as f32 / known_weight;
        self.calibration.calibration_factor = calibration_factor;
        debug!("NAU7802 calibration factor {}", calibration_factor);
        Ok(())
    }

    pub fn get_zero_offset(&self) -> i32 {
        self.calibration.zero_offset
    }

    pub fn set_zero_offset(&mut self, zero_offset: i32) {
        self.calibration.zero_offset = zero_offset;
    }

    pub fn get_calibration_factor(&self) -> f32 {
        self.calibration.calibration_factor
    }

    pub fn set_calibration_factor(&mut self, calibration_factor: f32) {
        self.calibration.calibration_factor = calibration_factor;
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Restores values saved from [`Self::calibration`].
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// Time slept by the driver since it was created.
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_us / 1000
    }

    /// Gives back the bus and delay.
    pub fn release(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }

    pub fn read(&mut self, register: Register) -> Result<u8, NAU7802Error<I2C::Error>> {
        let mut read_buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register as u8], &mut read_buffer)
            .map_err(NAU7802Error::I2c)?;

        Ok(read_buffer[0])
    }

    pub fn write(&mut self, register: Register, data: u8) -> Result<(), NAU7802Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[register as u8, data])
            .map_err(NAU7802Error::I2c)
    }

    pub fn read_field(&mut self, field: Field) -> Result<u8, NAU7802Error<I2C::Error>> {
        Ok(field.extract(self.read(field.register)?))
    }

    /// Read-modify-write of one field. `value` saturates at the field's maximum.
    pub fn write_field(&mut self, field: Field, value: u8) -> Result<(), NAU7802Error<I2C::Error>> {
        let current = self.read(field.register)?;
        self.write(field.register, field.insert(current, value))
    }

    pub fn get_bit(&mut self, field: Field) -> Result<bool, NAU7802Error<I2C::Error>> {
        Ok(self.read_field(field)? != 0)
    }

    pub fn set_bit(&mut self, field: Field) -> Result<(), NAU7802Error<I2C::Error>> {
        self.write_field(field, field.max())
    }

    pub fn clear_bit(&mut self, field: Field) -> Result<(), NAU7802Error<I2C::Error>> {
        self.write_field(field, 0)
    }

    /// Runs `check` every [`POLL_INTERVAL_MS`] until it yields a value. Returns `None` once more
    /// than `timeout_ms` has passed, never when `timeout_ms` is `None`.
    fn poll_until<T>(
        &mut self,
        timeout_ms: Option<u32>,
        mut check: impl FnMut(&mut Self) -> Result<Option<T>, NAU7802Error<I2C::Error>>,
    ) -> Result<Option<T>, NAU7802Error<I2C::Error>> {
        let start_us = self.elapsed_us;
        loop {
            if let Some(value) = check(self)? {
                return Ok(Some(value));
            }

            if let Some(timeout_ms) = timeout_ms {
                if self.elapsed_us - start_us > u64::from(timeout_ms) * 1000 {
                    return Ok(None);
                }
            }

            self.sleep_ms(POLL_INTERVAL_MS);
        }
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
        self.elapsed_us += u64::from(ms) * 1000;
    }
}

#[cfg(feature = "std")]
impl<I2C> std::fmt::Display for NAU7802Error<I2C>
where
    I2C: std::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NAU7802Error::Connect => write!(f, "Unable to connect to NAU7802"),
            NAU7802Error::I2c(i2c) => write!(f, "I2C Error: {i2c:?}"),
            NAU7802Error::PowerUpTimeout => write!(f, "NAU7802 did not power up in time"),
            NAU7802Error::CalibrationTimeout => write!(f, "AFE calibration timed out"),
            NAU7802Error::CalibrationFailed => write!(f, "AFE calibration failed"),
            NAU7802Error::AverageTimeout => write!(f, "Timed out waiting for samples"),
            NAU7802Error::InvalidSampleCount => write!(f, "Sample count must be at least 1"),
            NAU7802Error::ZeroCalibrationFactor => write!(f, "Calibration factor is zero"),
            NAU7802Error::ZeroKnownWeight => write!(f, "Known weight must not be zero"),
        }
    }
}

#[cfg(feature = "std")]
impl<I2C> std::error::Error for NAU7802Error<I2C>
where
    I2C: std::fmt::Debug,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
