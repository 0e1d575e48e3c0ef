use core::fmt::Debug;

use super::{
    average, build_tables, gesture_held, is_reset_gesture, parse_axis, Axis, Coordinate,
    CoordinateTables, Module, PassThrough, Ready, TouchBuffer, TouchMask, TouchpadConfig,
    TouchpadError, MODULES,
};
use embedded_hal::delay::DelayNs;

/// A capacitive sensor module as seen by the touchpad.
pub trait TouchSensor {
    type Error: Debug;

    /// Bring the module online at `address`.
    fn begin(&mut self, address: u8) -> Result<(), Self::Error>;

    /// Currently touched channels.
    fn touched(&mut self) -> Result<TouchMask, Self::Error>;
}

/// Reduces the touch pattern of two sensor modules to one cursor position.
#[derive(Debug)]
pub struct Touchpad<S, DELAY, B = PassThrough> {
    sensors: [S; MODULES],
    delay: DELAY,
    buffer: B,
    config: TouchpadConfig,
    ready: Option<Ready>,
}

impl<S, DELAY> Touchpad<S, DELAY>
where
    S: TouchSensor,
    DELAY: DelayNs,
{
    pub fn new(sensor1: S, sensor2: S, delay: DELAY) -> Self {
        Self::with_config(sensor1, sensor2, delay, TouchpadConfig::default())
    }

    pub fn with_config(sensor1: S, sensor2: S, delay: DELAY, config: TouchpadConfig) -> Self {
        Self {
            sensors: [sensor1, sensor2],
            delay,
            buffer: PassThrough,
            config,
            ready: None,
        }
    }
}

impl<S, DELAY, B> Touchpad<S, DELAY, B>
where
    S: TouchSensor,
    DELAY: DelayNs,
    B: TouchBuffer,
{
    /// Replace the touch buffer applied before averaging
    pub fn with_buffer<B2: TouchBuffer>(self, buffer: B2) -> Touchpad<S, DELAY, B2> {
        Touchpad {
            sensors: self.sensors,
            delay: self.delay,
            buffer,
            config: self.config,
            ready: self.ready,
        }
    }

    /// Bring both modules online and build the coordinate tables.
    ///
    /// Fails closed: if either module is missing the touchpad stays
    /// uninitialized and every position query is refused until a later
    /// `initialize` succeeds.
    pub fn initialize(
        &mut self,
        address1: u8,
        address2: u8,
    ) -> Result<(), TouchpadError<S::Error>> {
        let addresses = [address1, address2];
        self.begin_sensors(addresses)?;

        self.ready = Some(Ready {
            addresses,
            tables: build_tables(self.config.layout),
        });

        #[cfg(feature = "defmt")]
        defmt::info!("Touchpad ready at 0x{:02X}/0x{:02X}", address1, address2);
        #[cfg(feature = "log-04")]
        log::info!("Touchpad ready at 0x{address1:02X}/0x{address2:02X}");
        Ok(())
    }

    /// Average position of all touched channels along `axis`.
    ///
    /// When the soft reset gesture is held this blocks until it is released
    /// and both modules have been re-initialized.
    pub fn get_position(&mut self, axis: Axis) -> Result<u8, TouchpadError<S::Error>> {
        self.poll(|tables, masks| average(tables, masks, axis))
    }

    /// Same as [`Self::get_position`] with the axis given as `b'x'` or `b'y'`.
    pub fn get_position_raw(&mut self, axis: u8) -> Result<u8, TouchpadError<S::Error>> {
        let axis = parse_axis(axis)?;
        self.get_position(axis)
    }

    /// Both axes from a single read of the sensors.
    pub fn position(&mut self) -> Result<Coordinate, TouchpadError<S::Error>> {
        self.poll(|tables, masks| {
            Coordinate::new(
                average(tables, masks, Axis::X),
                average(tables, masks, Axis::Y),
            )
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_some()
    }

    pub fn tables(&self) -> Option<&CoordinateTables> {
        self.ready.as_ref().map(|ready| &ready.tables)
    }

    pub fn addresses(&self) -> Option<[u8; MODULES]> {
        self.ready.map(|ready| ready.addresses)
    }

    pub fn config(&self) -> &TouchpadConfig {
        &self.config
    }

    /// Give back the sensors and the delay
    pub fn release(self) -> (S, S, DELAY) {
        let [sensor1, sensor2] = self.sensors;
        (sensor1, sensor2, self.delay)
    }

    fn poll<T>(
        &mut self,
        reduce: impl FnOnce(&CoordinateTables, &[TouchMask; MODULES]) -> T,
    ) -> Result<T, TouchpadError<S::Error>> {
        let ready = self.ready.ok_or(TouchpadError::Uninitialized)?;

        let masks = self.read_masks()?;
        let mut buffered = masks;
        self.buffer.buffer(&mut buffered);
        let result = reduce(&ready.tables, &buffered);

        if is_reset_gesture(&masks, &self.config.reset_gesture) {
            self.soft_reset(ready.addresses)?;
        }

        Ok(result)
    }

    fn read_masks(&mut self) -> Result<[TouchMask; MODULES], TouchpadError<S::Error>> {
        let [first, second] = &mut self.sensors;
        Ok([
            first.touched().map_err(TouchpadError::Sensor)?,
            second.touched().map_err(TouchpadError::Sensor)?,
        ])
    }

    fn begin_sensors(&mut self, addresses: [u8; MODULES]) -> Result<(), TouchpadError<S::Error>> {
        for ((module, sensor), address) in Module::ALL
            .into_iter()
            .zip(self.sensors.iter_mut())
            .zip(addresses)
        {
            sensor.begin(address).map_err(|_err| {
                #[cfg(feature = "defmt")]
                defmt::error!("MPR121 {} not found at 0x{:02X}", module, address);
                #[cfg(feature = "log-04")]
                log::error!("MPR121 {module} not found at 0x{address:02X}: {_err:?}");
                TouchpadError::NotFound { module, address }
            })?;
        }
        Ok(())
    }

    /// Wait for the reset gesture to be released, then re-initialize both
    /// modules. The coordinate tables are left as they are.
    fn soft_reset(&mut self, addresses: [u8; MODULES]) -> Result<(), TouchpadError<S::Error>> {
        #[cfg(feature = "defmt")]
        defmt::info!("Soft reset gesture held, waiting for release");
        #[cfg(feature = "log-04")]
        log::info!("Soft reset gesture held, waiting for release");

        self.wait_for_release()?;
        self.delay.delay_ms(self.config.reset_settle_ms);
        self.begin_sensors(addresses)?;

        #[cfg(feature = "defmt")]
        defmt::info!("Touch sensors re-initialized");
        #[cfg(feature = "log-04")]
        log::info!("Touch sensors re-initialized");
        Ok(())
    }

    fn wait_for_release(&mut self) -> Result<(), TouchpadError<S::Error>> {
        let gesture = self.config.reset_gesture;
        let step = self.config.release_poll_ms.max(1);
        let mut waited: u32 = 0;

        loop {
            let masks = self.read_masks()?;
            if !gesture_held(&masks, &gesture) {
                return Ok(());
            }
            if let Some(timeout) = self.config.release_timeout_ms {
                if waited >= timeout {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Reset gesture still held after {} ms", waited);
                    #[cfg(feature = "log-04")]
                    log::warn!("Reset gesture still held after {waited} ms");
                    return Err(TouchpadError::ReleaseTimeout);
                }
            }
            self.delay.delay_ms(step);
            waited = waited.saturating_add(step);
        }
    }
}
