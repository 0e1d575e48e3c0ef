use super::{
    check_channel, Mpr121Config, Mpr121Error, Register, CONFIG1_DEFAULT, CONFIG2_DEFAULT,
    CONFIG2_RESET_VALUE, ECR_RUN_ALL, FILTERED_DATA_MASK, FILTER_DEFAULTS, MPR121_ADDRESS,
    SOFT_RESET_MAGIC, TOUCH_STATUS_MASK,
};
use crate::touchpad::{asynch::TouchSensor, TouchMask, CHANNELS};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

#[derive(Debug)]
pub struct Mpr121Async<I2C, DELAY> {
    i2c: I2C,
    delay: DELAY,
    address: u8,
    config: Mpr121Config,
}

impl<I2C, DELAY> Mpr121Async<I2C, DELAY>
where
    I2C: I2c,
    DELAY: DelayNs,
{
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

    pub async fn begin(&mut self, address: u8) -> Result<(), Mpr121Error> {
        self.address = address;

        self.write_register(Register::SoftReset, SOFT_RESET_MAGIC)
            .await?;
        self.delay.delay_ms(1).await;
        self.write_register(Register::Ecr, 0x00).await?;

        let config2 = self.read_register(Register::Config2).await?;
        if config2 != CONFIG2_RESET_VALUE {
            return Err(Mpr121Error::NotFound(config2));
        }

        self.write_thresholds(self.config.touch_threshold, self.config.release_threshold)
            .await?;
        for &(register, value) in FILTER_DEFAULTS {
            self.write_register(register, value).await?;
        }
        self.write_register(Register::Config1, CONFIG1_DEFAULT)
            .await?;
        self.write_register(Register::Config2, CONFIG2_DEFAULT)
            .await?;
        self.write_register(Register::Ecr, ECR_RUN_ALL).await?;
        Ok(())
    }

    pub async fn touched(&mut self) -> Result<TouchMask, Mpr121Error> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[Register::TouchStatusL.addr()], &mut buffer)
            .await?;
        let status = u16::from_le_bytes(buffer) & TOUCH_STATUS_MASK;
        Ok(TouchMask::from_bits_truncate(status))
    }

    pub async fn filtered_data(&mut self, channel: u8) -> Result<u16, Mpr121Error> {
        check_channel(channel)?;
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(
                self.address,
                &[Register::FiltData0L.channel(channel, 2)],
                &mut buffer,
            )
            .await?;
        Ok(u16::from_le_bytes(buffer) & FILTERED_DATA_MASK)
    }

    pub async fn baseline_data(&mut self, channel: u8) -> Result<u16, Mpr121Error> {
        check_channel(channel)?;
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(
                self.address,
                &[Register::Baseline0.channel(channel, 1)],
                &mut buffer,
            )
            .await?;
        Ok(u16::from(buffer[0]) << 2)
    }

    pub async fn set_thresholds(&mut self, touch: u8, release: u8) -> Result<(), Mpr121Error> {
        let ecr = self.read_register(Register::Ecr).await?;
        if ecr != 0 {
            self.write_register(Register::Ecr, 0x00).await?;
        }
        self.write_thresholds(touch, release).await?;
        if ecr != 0 {
            self.write_register(Register::Ecr, ecr).await?;
        }
        self.config.touch_threshold = touch;
        self.config.release_threshold = release;
        Ok(())
    }

    pub fn release(self) -> (I2C, DELAY) {
        (self.i2c, self.delay)
    }

    async fn write_thresholds(&mut self, touch: u8, release: u8) -> Result<(), Mpr121Error> {
        for channel in 0..CHANNELS as u8 {
            self.i2c
                .write(self.address, &[Register::TouchTh0.channel(channel, 2), touch])
                .await?;
            self.i2c
                .write(
                    self.address,
                    &[Register::ReleaseTh0.channel(channel, 2), release],
                )
                .await?;
        }
        Ok(())
    }

    async fn write_register(&mut self, register: Register, value: u8) -> Result<(), Mpr121Error> {
        self.i2c
            .write(self.address, &[register.addr(), value])
            .await?;
        Ok(())
    }

    async fn read_register(&mut self, register: Register) -> Result<u8, Mpr121Error> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register.addr()], &mut buffer)
            .await?;
        Ok(buffer[0])
    }
}

impl<I2C, DELAY> TouchSensor for Mpr121Async<I2C, DELAY>
where
    I2C: I2c,
    DELAY: DelayNs,
{
    type Error = Mpr121Error;

    async fn begin(&mut self, address: u8) -> Result<(), Mpr121Error> {
        Mpr121Async::begin(self, address).await
    }

    async fn touched(&mut self) -> Result<TouchMask, Mpr121Error> {
        Mpr121Async::touched(self).await
    }
}
