/// Programmable gain amplifier setting, CTRL1 bits 0-2.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Gain {
    Gain1X = 0b000,
    Gain2X = 0b001,
    Gain4X = 0b010,
    Gain8X = 0b011,
    Gain16X = 0b100,
    Gain32X = 0b101,
    Gain64X = 0b110,
    Gain128X = 0b111,
}

/// Internal LDO output voltage, CTRL1 bits 3-5.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Ldo {
    L4V5 = 0b000,
    L4V2 = 0b001,
    L3V9 = 0b010,
    L3V6 = 0b011,
    L3V3 = 0b100,
    L3V0 = 0b101,
    L2V7 = 0b110,
    L2V4 = 0b111,
}

/// Conversion rate, CTRL2 bits 4-6.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleRate {
    Sps10 = 0b000,
    Sps20 = 0b001,
    Sps40 = 0b010,
    Sps80 = 0b011,
    Sps320 = 0b111,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Channel {
    Channel1,
    Channel2,
}

/// Progress of an analog front end calibration, derived from CTRL2 on every poll.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CalibrationStatus {
    InProgress,
    Success,
    Failure,
}

/// The two numbers that turn raw counts into weight. Persisting them is up to the caller.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Calibration {
    /// Raw reading of the unloaded scale
    pub zero_offset: i32,
    /// Raw counts per unit of weight
    pub calibration_factor: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            zero_offset: 0,
            calibration_factor: 1.0,
        }
    }
}

pub struct NAU7802InitConfig {
    /// The internal LDO voltage
    pub ldo: Ldo,
    /// The PGA gain, 1X to 128X
    pub gain: Gain,
    /// Samples per second
    pub sample_rate: SampleRate,
}

impl Default for NAU7802InitConfig {
    fn default() -> Self {
        Self {
            ldo: Ldo::L3V3,
            gain: Gain::Gain128X,
            sample_rate: SampleRate::Sps80,
        }
    }
}
