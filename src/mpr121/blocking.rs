use super::{
    check_channel, Mpr121Config, Mpr121Error, Register, CONFIG1_DEFAULT, CONFIG2_DEFAULT,
    CONFIG2_RESET_VALUE, ECR_RUN_ALL, FILTERED_DATA_MASK, FILTER_DEFAULTS, MPR121_ADDRESS,
    SOFT_RESET_MAGIC, TOUCH_STATUS_MASK,
};
use crate::touchpad::{blocking::TouchSensor, TouchMask, CHANNELS};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

#[derive(Debug)]
pub struct Mpr121<I2C, DELAY> {
    i2c: I2C,
    delay: DELAY,
    address: u8,
    config: Mpr121Config,
}

impl<I2C, DELAY> Mpr121<I2C, DELAY>
where
    I2C: I2c,
    DELAY: DelayNs,
{
    /// Create a new MPR121 instance. Nothing is sent until [`Self::begin`].
    pub fn new(i2c: I2C, delay: DELAY) -> Self {
        Self::with_config(i2c, delay, Mpr121Config::default())
    }

    pub fn with_config(i2c: I2C, delay: DELAY, config: Mpr121Config) -> Self {
        Self {
            i2c,
            delay,
            address: MPR121_ADDRESS,
            config,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Reset the chip at `address` and start sensing on all 12 electrodes.
    pub fn begin(&mut self, address: u8) -> Result<(), Mpr121Error> {
        self.address = address;

        self.write_register(Register::SoftReset, SOFT_RESET_MAGIC)?;
        self.delay.delay_ms(1);
        self.write_register(Register::Ecr, 0x00)?;

        let config2 = self.read_register(Register::Config2)?;
        if config2 != CONFIG2_RESET_VALUE {
            return Err(Mpr121Error::NotFound(config2));
        }

        self.write_thresholds(self.config.touch_threshold, self.config.release_threshold)?;
        for &(register, value) in FILTER_DEFAULTS {
            self.write_register(register, value)?;
        }
        self.write_register(Register::Config1, CONFIG1_DEFAULT)?;
        self.write_register(Register::Config2, CONFIG2_DEFAULT)?;
        self.write_register(Register::Ecr, ECR_RUN_ALL)?;
        Ok(())
    }

    /// Touch state of all electrodes
    pub fn touched(&mut self) -> Result<TouchMask, Mpr121Error> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[Register::TouchStatusL.addr()], &mut buffer)?;
        let status = u16::from_le_bytes(buffer) & TOUCH_STATUS_MASK;
        Ok(TouchMask::from_bits_truncate(status))
    }

    /// 10-bit filtered electrode data
    pub fn filtered_data(&mut self, channel: u8) -> Result<u16, Mpr121Error> {
        check_channel(channel)?;
        let mut buffer = [0u8; 2];
        self.i2c.write_read(
            self.address,
            &[Register::FiltData0L.channel(channel, 2)],
            &mut buffer,
        )?;
        Ok(u16::from_le_bytes(buffer) & FILTERED_DATA_MASK)
    }

    /// Electrode baseline, scaled to the range of [`Self::filtered_data`]
    pub fn baseline_data(&mut self, channel: u8) -> Result<u16, Mpr121Error> {
        check_channel(channel)?;
        let mut buffer = [0u8; 1];
        self.i2c.write_read(
            self.address,
            &[Register::Baseline0.channel(channel, 1)],
            &mut buffer,
        )?;
        Ok(u16::from(buffer[0]) << 2)
    }

    /// Set touch and release thresholds of all electrodes.
    ///
    /// The chip only accepts these writes in stop mode, so a running chip is
    /// stopped and restarted around them.
    pub fn set_thresholds(&mut self, touch: u8, release: u8) -> Result<(), Mpr121Error> {
        let ecr = self.read_register(Register::Ecr)?;
        if ecr != 0 {
            self.write_register(Register::Ecr, 0x00)?;
        }
        self.write_thresholds(touch, release)?;
        if ecr != 0 {
            self.write_register(Register::Ecr, ecr)?;
        }
        self.config.touch_threshold = touch;
        self.config.release_threshold = release;
        Ok(())
    }

    /// Give back the bus and the delay
    pub fn release(self) -> (I2C, DELAY) {
        (self.i2c, self.delay)
    }

    fn write_thresholds(&mut self, touch: u8, release: u8) -> Result<(), Mpr121Error> {
        for channel in 0..CHANNELS as u8 {
            self.i2c
                .write(self.address, &[Register::TouchTh0.channel(channel, 2), touch])?;
            self.i2c.write(
                self.address,
                &[Register::ReleaseTh0.channel(channel, 2), release],
            )?;
        }
        Ok(())
    }

    fn write_register(&mut self, register: Register, value: u8) -> Result<(), Mpr121Error> {
        self.i2c.write(self.address, &[register.addr(), value])?;
        Ok(())
    }

    fn read_register(&mut self, register: Register) -> Result<u8, Mpr121Error> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register.addr()], &mut buffer)?;
        Ok(buffer[0])
    }
}

impl<I2C, DELAY> TouchSensor for Mpr121<I2C, DELAY>
where
    I2C: I2c,
    DELAY: DelayNs,
{
    type Error = Mpr121Error;

    fn begin(&mut self, address: u8) -> Result<(), Mpr121Error> {
        Mpr121::begin(self, address)
    }

    fn touched(&mut self) -> Result<TouchMask, Mpr121Error> {
        Mpr121::touched(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpr121::MPR121_ADDRESS_VDD;
    use crate::test_support::{FakeDelay, FakeI2c};
    use crate::touchpad::blocking::Touchpad;
    use crate::touchpad::{Axis, TouchpadError};

    fn chip(address: u8) -> FakeI2c {
        let mut i2c = FakeI2c::new(address);
        i2c.registers[usize::from(Register::Config2.addr())] = CONFIG2_RESET_VALUE;
        i2c
    }

    #[test]
    fn test_begin_configures_chip() {
        let mut mpr = Mpr121::new(chip(MPR121_ADDRESS), FakeDelay::default());
        mpr.begin(MPR121_ADDRESS).unwrap();

        let (i2c, delay) = mpr.release();
        assert_eq!(i2c.writes.first(), Some(&(0x80, SOFT_RESET_MAGIC)));
        assert_eq!(i2c.written(0x41), Some(12));
        assert_eq!(i2c.written(0x42), Some(6));
        assert_eq!(i2c.written(0x57), Some(12));
        assert_eq!(i2c.written(0x58), Some(6));
        assert_eq!(i2c.written(0x2D), Some(0x0E));
        assert_eq!(i2c.written(0x5C), Some(CONFIG1_DEFAULT));
        assert_eq!(i2c.written(0x5D), Some(CONFIG2_DEFAULT));
        assert_eq!(i2c.writes.last(), Some(&(0x5E, ECR_RUN_ALL)));
        assert_eq!(delay.total_ms(), 1);
    }

    #[test]
    fn test_begin_rejects_unexpected_config() {
        let mut mpr = Mpr121::new(FakeI2c::new(MPR121_ADDRESS), FakeDelay::default());
        assert_eq!(mpr.begin(MPR121_ADDRESS), Err(Mpr121Error::NotFound(0x00)));
        let (i2c, _) = mpr.release();
        // nothing past the probe is written
        assert_eq!(i2c.written(0x41), None);
    }

    #[test]
    fn test_begin_without_ack() {
        let mut mpr = Mpr121::new(chip(MPR121_ADDRESS), FakeDelay::default());
        assert_eq!(mpr.begin(MPR121_ADDRESS_VDD), Err(Mpr121Error::I2CError));
        assert_eq!(mpr.address(), MPR121_ADDRESS_VDD);
    }

    #[test]
    fn test_touched_masks_status() {
        let mut i2c = chip(MPR121_ADDRESS);
        // over-current flag in bit 15 and proximity bit 12 are dropped
        i2c.registers[0x00] = 0x21;
        i2c.registers[0x01] = 0x98;
        let mut mpr = Mpr121::new(i2c, FakeDelay::default());
        let mask = mpr.touched().unwrap();
        assert_eq!(mask.bits(), 0x0821);
        assert!(mask.is_touched(0) && mask.is_touched(5) && mask.is_touched(11));
    }

    #[test]
    fn test_electrode_data() {
        let mut i2c = chip(MPR121_ADDRESS);
        // channel 3 filtered data at 0x0A/0x0B, baseline at 0x21
        i2c.registers[0x0A] = 0xCD;
        i2c.registers[0x0B] = 0xFE;
        i2c.registers[0x21] = 0x40;
        let mut mpr = Mpr121::new(i2c, FakeDelay::default());
        assert_eq!(mpr.filtered_data(3), Ok(0x02CD));
        assert_eq!(mpr.baseline_data(3), Ok(0x100));
        assert_eq!(mpr.filtered_data(12), Err(Mpr121Error::InvalidChannel(12)));
        assert_eq!(mpr.baseline_data(200), Err(Mpr121Error::InvalidChannel(200)));
    }

    #[test]
    fn test_set_thresholds_restores_run_mode() {
        let mut mpr = Mpr121::new(chip(MPR121_ADDRESS), FakeDelay::default());
        mpr.begin(MPR121_ADDRESS).unwrap();
        mpr.set_thresholds(20, 10).unwrap();

        let (i2c, _) = mpr.release();
        let tail = &i2c.writes[i2c.writes.len() - 26..];
        assert_eq!(tail[0], (0x5E, 0x00));
        assert_eq!(tail[1], (0x41, 20));
        assert_eq!(tail[2], (0x42, 10));
        assert_eq!(tail[25], (0x5E, ECR_RUN_ALL));
    }

    #[test]
    fn test_touchpad_over_mpr121() {
        let mut first = chip(MPR121_ADDRESS);
        first.registers[0x00] = 1 << 3; // left-bottom dot (3, 163)
        let mut second = chip(MPR121_ADDRESS_VDD);
        second.registers[0x00] = 1 << 6; // right-bottom dot (250, 163)

        let mut pad = Touchpad::new(
            Mpr121::new(first, FakeDelay::default()),
            Mpr121::new(second, FakeDelay::default()),
            FakeDelay::default(),
        );
        pad.initialize(MPR121_ADDRESS, MPR121_ADDRESS_VDD).unwrap();
        assert_eq!(pad.get_position(Axis::X), Ok(126));
        assert_eq!(pad.get_position(Axis::Y), Ok(163));
    }

    #[test]
    fn test_touchpad_with_swapped_addresses() {
        let mut pad = Touchpad::new(
            Mpr121::new(chip(MPR121_ADDRESS), FakeDelay::default()),
            Mpr121::new(chip(MPR121_ADDRESS_VDD), FakeDelay::default()),
            FakeDelay::default(),
        );
        assert!(matches!(
            pad.initialize(MPR121_ADDRESS_VDD, MPR121_ADDRESS),
            Err(TouchpadError::NotFound {
                address: MPR121_ADDRESS_VDD,
                ..
            })
        ));
    }
}
