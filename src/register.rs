/// Default 7-bit I2C address, fixed in silicon.
pub const DEFAULT_ADDRESS: u8 = 0x2A;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Register {
    PuCtrl = 0x00,
    Ctrl1 = 0x01,
    Ctrl2 = 0x02,
    AdcoB2 = 0x12,
    AdcoB1 = 0x13,
    AdcoB0 = 0x14,
    Adc = 0x15,
    PgaPwr = 0x1C,
    DeviceRev = 0x1F,
}

/// A bit-field inside one register: `width` bits starting at bit `offset` (0 is the LSB).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Field {
    pub register: Register,
    pub offset: u8,
    pub width: u8,
}

impl Field {
    // PU_CTRL
    pub const RESET: Field = Field::bit(Register::PuCtrl, 0);
    pub const POWER_UP_DIGITAL: Field = Field::bit(Register::PuCtrl, 1);
    pub const POWER_UP_ANALOG: Field = Field::bit(Register::PuCtrl, 2);
    pub const POWER_UP_READY: Field = Field::bit(Register::PuCtrl, 3);
    pub const CYCLE_START: Field = Field::bit(Register::PuCtrl, 4);
    pub const CYCLE_READY: Field = Field::bit(Register::PuCtrl, 5);
    pub const OSCILLATOR_SELECT: Field = Field::bit(Register::PuCtrl, 6);
    /// Set to run AVDD from the internal LDO.
    pub const AVDD_SOURCE: Field = Field::bit(Register::PuCtrl, 7);

    // CTRL1
    pub const GAIN: Field = Field::new(Register::Ctrl1, 0, 3);
    pub const LDO_VOLTAGE: Field = Field::new(Register::Ctrl1, 3, 3);
    pub const DATA_READY_SELECT: Field = Field::bit(Register::Ctrl1, 6);
    /// Clear for an active-high DRDY pin, set for active-low.
    pub const READY_POLARITY: Field = Field::bit(Register::Ctrl1, 7);

    // CTRL2
    pub const CAL_MODE: Field = Field::new(Register::Ctrl2, 0, 2);
    /// Written 1 to start an AFE calibration, cleared by the chip once it finishes.
    pub const CAL_START: Field = Field::bit(Register::Ctrl2, 2);
    pub const CAL_ERROR: Field = Field::bit(Register::Ctrl2, 3);
    pub const SAMPLE_RATE: Field = Field::new(Register::Ctrl2, 4, 3);
    pub const CHANNEL: Field = Field::bit(Register::Ctrl2, 7);

    // PGA_PWR
    pub const PGA_CAP_ENABLE: Field = Field::bit(Register::PgaPwr, 7);

    // DEVICE_REV
    pub const REVISION_ID: Field = Field::new(Register::DeviceRev, 0, 4);

    pub const fn new(register: Register, offset: u8, width: u8) -> Self {
        Self {
            register,
            offset,
            width,
        }
    }

    pub const fn bit(register: Register, offset: u8) -> Self {
        Self::new(register, offset, 1)
    }

    /// Largest value the field can hold.
    pub const fn max(&self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    /// The field's bits in register position.
    pub const fn mask(&self) -> u8 {
        self.max() << self.offset
    }

    pub const fn extract(&self, register_value: u8) -> u8 {
        (register_value & self.mask()) >> self.offset
    }

    /// Returns `register_value` with the field replaced by `value`. Values wider than the field
    /// saturate at [`Field::max`]; bits outside the field are kept.
    pub const fn insert(&self, register_value: u8, value: u8) -> u8 {
        let value = if value > self.max() { self.max() } else { value };
        (register_value & !self.mask()) | (value << self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_BIT_FIELDS: [Field; 3] = [Field::GAIN, Field::LDO_VOLTAGE, Field::SAMPLE_RATE];

    #[test]
    fn masks_match_register_map() {
        assert_eq!(Field::GAIN.mask(), 0b0000_0111);
        assert_eq!(Field::LDO_VOLTAGE.mask(), 0b0011_1000);
        assert_eq!(Field::SAMPLE_RATE.mask(), 0b0111_0000);
        assert_eq!(Field::CAL_MODE.mask(), 0b0000_0011);
        assert_eq!(Field::REVISION_ID.mask(), 0b0000_1111);
        assert_eq!(Field::AVDD_SOURCE.mask(), 0b1000_0000);
        assert_eq!(Field::CHANNEL.max(), 1);
    }

    #[test]
    fn insert_saturates_and_keeps_other_bits() {
        for field in THREE_BIT_FIELDS {
            for register_value in [0x00u8, 0xFF, 0b1010_0101, 0b0101_1010] {
                for value in 0..=u8::MAX {
                    let updated = field.insert(register_value, value);
                    assert_eq!(field.extract(updated), value.min(7));
                    assert_eq!(updated & !field.mask(), register_value & !field.mask());
                }
            }
        }
    }

    #[test]
    fn extract_reads_only_the_field() {
        assert_eq!(Field::SAMPLE_RATE.extract(0b1011_0100), 0b011);
        assert_eq!(Field::CAL_START.extract(0b0000_0100), 1);
        assert_eq!(Field::CAL_ERROR.extract(0b0000_0100), 0);
        assert_eq!(Field::REVISION_ID.extract(0xAF), 0x0F);
    }
}
